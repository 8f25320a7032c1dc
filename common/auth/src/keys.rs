//! RSA public key reconstruction from JWK records.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::DecodingKey;

use crate::error::KeyError;
use crate::jwk::Jwk;

/// Modulus and public exponent of an RSA key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaPublicKey {
    modulus: Vec<u8>,
    exponent: u32,
}

impl RsaPublicKey {
    /// Big-endian modulus without leading zero bytes.
    pub fn modulus(&self) -> &[u8] {
        &self.modulus
    }

    pub fn exponent(&self) -> u32 {
        self.exponent
    }

    pub fn decoding_key(&self) -> DecodingKey {
        let exponent = self.exponent.to_be_bytes();
        DecodingKey::from_rsa_raw_components(&self.modulus, strip_leading_zeros(&exponent))
    }
}

/// Builds the RSA public key described by `jwk`'s `n` and `e` members.
pub fn extract_public_key(jwk: &Jwk) -> Result<RsaPublicKey, KeyError> {
    if let Some(kty) = jwk.kty.as_deref() {
        if kty != "RSA" {
            return Err(KeyError::UnsupportedKeyType(kty.to_string()));
        }
    }

    let n = required(jwk.n.as_deref(), "n")?;
    let e = required(jwk.e.as_deref(), "e")?;

    let modulus = decode_component(n, "n")?;
    let exponent = decode_component(e, "e")?;

    let exponent = strip_leading_zeros(&exponent);
    if exponent.len() > 4 {
        return Err(KeyError::ExponentTooLarge(exponent.len()));
    }
    let exponent = exponent
        .iter()
        .fold(0u32, |acc, byte| (acc << 8) | u32::from(*byte));

    Ok(RsaPublicKey {
        modulus: strip_leading_zeros(&modulus).to_vec(),
        exponent,
    })
}

fn required<'a>(value: Option<&'a str>, field: &'static str) -> Result<&'a str, KeyError> {
    match value {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(KeyError::MissingField(field)),
    }
}

fn decode_component(value: &str, field: &'static str) -> Result<Vec<u8>, KeyError> {
    URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|source| KeyError::Decode { field, source })
}

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}
