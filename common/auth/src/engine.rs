//! Adapter over `jsonwebtoken` exposing a parse-with-key-resolver contract.
//!
//! The engine owns token framing, header decoding, signature verification and
//! the registered time claims. Choosing the verification key is delegated to a
//! [`KeyResolver`], which only ever sees the unverified header.

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{decode, decode_header, DecodingKey, Header, Validation};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::claims::DecodedToken;
use crate::error::{AuthError, AuthResult};

#[async_trait]
pub trait KeyResolver: Send + Sync {
    /// Picks the key that must verify a token carrying `header`.
    async fn resolve_key(&self, header: &Header) -> AuthResult<DecodingKey>;
}

/// Parses and verifies `token`.
///
/// `validation` supplies the claim policy; its algorithm list is narrowed to
/// the header's algorithm, which the resolver is responsible for vetting.
pub async fn parse<R>(token: &str, validation: &Validation, resolver: &R) -> AuthResult<DecodedToken>
where
    R: KeyResolver + ?Sized,
{
    let header = decode_header(token).map_err(|err| classify_header_error(token, err))?;
    let key = resolver.resolve_key(&header).await?;

    let mut validation = validation.clone();
    validation.algorithms = vec![header.alg];

    let data = decode::<Map<String, Value>>(token, &key, &validation)?;
    Ok(DecodedToken::from(data.claims))
}

#[derive(Deserialize)]
struct RawHeader {
    alg: Option<String>,
}

/// A header `jsonwebtoken` rejects may still name an algorithm, e.g. `none`;
/// that is an algorithm failure, not a framing one.
fn classify_header_error(token: &str, err: jsonwebtoken::errors::Error) -> AuthError {
    let declared = token
        .split('.')
        .next()
        .and_then(|segment| URL_SAFE_NO_PAD.decode(segment).ok())
        .and_then(|bytes| serde_json::from_slice::<RawHeader>(&bytes).ok())
        .and_then(|header| header.alg);

    match declared {
        Some(alg) if alg.parse::<jsonwebtoken::Algorithm>().is_err() => AuthError::Algorithm(alg),
        _ => AuthError::InvalidHeader(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, Algorithm, EncodingKey};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct SecretResolver {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl KeyResolver for SecretResolver {
        async fn resolve_key(&self, _header: &Header) -> AuthResult<DecodingKey> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(DecodingKey::from_secret(b"secret"))
        }
    }

    fn segment(json: &str) -> String {
        URL_SAFE_NO_PAD.encode(json)
    }

    fn permissive() -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_aud = false;
        validation
    }

    #[tokio::test]
    async fn resolver_key_verifies_token() {
        let token = encode(
            &Header::new(Algorithm::HS256),
            &serde_json::json!({"sub": "auth|1"}),
            &EncodingKey::from_secret(b"secret"),
        )
        .expect("sign");
        let resolver = SecretResolver { calls: AtomicUsize::new(0) };

        let claims = parse(&token, &permissive(), &resolver).await.expect("valid");
        assert_eq!(claims.subject(), Some("auth|1"));
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unrepresentable_algorithm_is_an_algorithm_error() {
        let token = format!(
            "{}.{}.",
            segment(r#"{"alg":"none","typ":"JWT"}"#),
            segment(r#"{"sub":"auth|1"}"#)
        );
        let resolver = SecretResolver { calls: AtomicUsize::new(0) };

        let err = parse(&token, &permissive(), &resolver).await.expect_err("none refused");
        assert!(matches!(err, AuthError::Algorithm(alg) if alg == "none"));
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn garbage_is_an_invalid_header() {
        let resolver = SecretResolver { calls: AtomicUsize::new(0) };
        let err = parse("not-a-token", &permissive(), &resolver)
            .await
            .expect_err("garbage");
        assert!(matches!(err, AuthError::InvalidHeader(_)));
    }
}
