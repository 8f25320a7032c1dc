use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::error::{AuthError, AuthResult};

/// Default per-request timeout for JWKS downloads.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Status and body of a JWKS download.
#[derive(Debug, Clone)]
pub struct JwksHttpResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl JwksHttpResponse {
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// The only HTTP capability the cache relies on.
#[async_trait]
pub trait JwksClient: Send + Sync {
    /// Issues a GET request. Transport failures are reported as `AuthError::JwksFetch`.
    async fn get(&self, url: &str) -> AuthResult<JwksHttpResponse>;
}

#[async_trait]
impl<T> JwksClient for Arc<T>
where
    T: JwksClient + ?Sized,
{
    async fn get(&self, url: &str) -> AuthResult<JwksHttpResponse> {
        (**self).get(url).await
    }
}

#[derive(Clone)]
pub struct ReqwestJwksClient {
    client: Client,
}

impl ReqwestJwksClient {
    pub fn new() -> AuthResult<Self> {
        Self::with_timeout(DEFAULT_FETCH_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> AuthResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AuthError::Config(format!("failed to build HTTP client: {err}")))?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl JwksClient for ReqwestJwksClient {
    async fn get(&self, url: &str) -> AuthResult<JwksHttpResponse> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| AuthError::JwksFetch(err.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| AuthError::JwksFetch(err.to_string()))?;

        Ok(JwksHttpResponse::new(status, body.to_vec()))
    }
}
