pub mod cache;
pub mod claims;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod jwk;
pub mod keys;
pub mod service;

pub use cache::JwksCache;
pub use claims::DecodedToken;
pub use client::{JwksClient, JwksHttpResponse, ReqwestJwksClient};
pub use config::{AuthConfig, MAX_LEEWAY_SECONDS};
pub use engine::KeyResolver;
pub use error::{AuthError, AuthResult, KeyError};
pub use jwk::{Jwk, JwkSet};
pub use jwks_observability::JwksMetrics;
pub use keys::{extract_public_key, RsaPublicKey};
pub use service::{TokenService, TokenServiceBuilder};
