#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use jwks_auth::{AuthError, AuthResult, JwksClient, JwksHttpResponse};
use reqwest::StatusCode;
use rsa::pkcs1::{EncodeRsaPrivateKey, LineEnding};
use rsa::rand_core::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use serde::Serialize;
use serde_json::{json, Value};

pub const DOMAIN: &str = "example.test";
pub const JWKS_URL: &str = "https://example.test/.well-known/jwks.json";

pub struct KeyMaterial {
    pub encoding: EncodingKey,
    pub modulus: String,
    pub exponent: String,
}

/// One 2048-bit key per test binary; generation dominates test time otherwise.
pub fn key_material() -> &'static KeyMaterial {
    static MATERIAL: OnceLock<KeyMaterial> = OnceLock::new();
    MATERIAL.get_or_init(|| {
        let mut rng = OsRng;
        let private_key = RsaPrivateKey::new(&mut rng, 2048).expect("key generation");
        let public_key = private_key.to_public_key();
        let private_pem = private_key
            .to_pkcs1_pem(LineEnding::LF)
            .expect("private pem");

        KeyMaterial {
            encoding: EncodingKey::from_rsa_pem(private_pem.as_bytes()).expect("encoding key"),
            modulus: URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be()),
            exponent: URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be()),
        }
    })
}

pub fn jwks_body(kids: &[&str]) -> String {
    let material = key_material();
    let keys: Vec<Value> = kids
        .iter()
        .map(|kid| {
            json!({
                "kty": "RSA",
                "kid": kid,
                "alg": "RS256",
                "use": "sig",
                "n": material.modulus,
                "e": material.exponent
            })
        })
        .collect();
    json!({ "keys": keys }).to_string()
}

pub fn sign<T: Serialize>(alg: Algorithm, kid: Option<&str>, claims: &T) -> String {
    let mut header = Header::new(alg);
    header.kid = kid.map(str::to_string);
    encode(&header, claims, &key_material().encoding).expect("sign token")
}

pub fn sign_hs256(kid: &str, claims: &Value) -> String {
    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(kid.to_string());
    encode(&header, claims, &EncodingKey::from_secret(b"shared-secret")).expect("sign token")
}

/// Token whose header is taken verbatim and whose signature is junk.
pub fn with_raw_header(header: &Value, claims: &Value) -> String {
    format!(
        "{}.{}.{}",
        URL_SAFE_NO_PAD.encode(header.to_string()),
        URL_SAFE_NO_PAD.encode(claims.to_string()),
        URL_SAFE_NO_PAD.encode(b"not-a-signature"),
    )
}

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// In-process stand-in for the JWKS endpoint.
pub struct MockJwksClient {
    response: Mutex<AuthResult<JwksHttpResponse>>,
    urls: Mutex<Vec<String>>,
    calls: AtomicUsize,
    delay: Duration,
}

impl MockJwksClient {
    pub fn serving(body: impl Into<String>) -> Self {
        Self::with_response(Ok(JwksHttpResponse::new(
            StatusCode::OK,
            body.into().into_bytes(),
        )))
    }

    pub fn failing(message: &str) -> Self {
        Self::with_response(Err(AuthError::JwksFetch(message.to_string())))
    }

    pub fn with_response(response: AuthResult<JwksHttpResponse>) -> Self {
        Self {
            response: Mutex::new(response),
            urls: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_response(&self, response: AuthResult<JwksHttpResponse>) {
        *self.response.lock().unwrap() = response;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl JwksClient for MockJwksClient {
    async fn get(&self, url: &str) -> AuthResult<JwksHttpResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(url.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.response.lock().unwrap().clone()
    }
}
