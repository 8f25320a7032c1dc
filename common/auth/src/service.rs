use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{DecodingKey, Header, Validation};
use jwks_observability::{JwksMetrics, OUTCOME_OK};
use tracing::debug;

use crate::cache::JwksCache;
use crate::claims::DecodedToken;
use crate::client::{JwksClient, ReqwestJwksClient};
use crate::config::{AuthConfig, MAX_LEEWAY_SECONDS, RSA_ALGORITHMS};
use crate::engine::{self, KeyResolver};
use crate::error::{AuthError, AuthResult};
use crate::keys::extract_public_key;

/// Default interval between JWKS downloads.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(600);

/// Validates tokens against the authority's published key set.
pub struct TokenService<C = ReqwestJwksClient> {
    config: AuthConfig,
    cache: JwksCache<C>,
    validation: Validation,
    metrics: JwksMetrics,
}

impl TokenService<ReqwestJwksClient> {
    /// Service backed by a `reqwest` client with the default timeout.
    pub fn from_config(config: AuthConfig, refresh_interval: Duration) -> AuthResult<Self> {
        let client = ReqwestJwksClient::new()?;
        Ok(Self::builder(config)
            .with_refresh_interval(refresh_interval)
            .build(client))
    }

    pub fn builder(config: AuthConfig) -> TokenServiceBuilder {
        TokenServiceBuilder::new(config)
    }
}

impl<C> TokenService<C>
where
    C: JwksClient,
{
    pub fn new(config: AuthConfig, client: C, refresh_interval_secs: u64) -> Self {
        TokenServiceBuilder::new(config)
            .with_refresh_interval(Duration::from_secs(refresh_interval_secs))
            .build(client)
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn cache(&self) -> &JwksCache<C> {
        &self.cache
    }

    pub fn metrics(&self) -> &JwksMetrics {
        &self.metrics
    }

    /// Validates `token` and returns its claims.
    ///
    /// # Errors
    ///
    /// Any failure along the pipeline: algorithm policy, JWKS refresh, key
    /// lookup, key extraction, signature or claim validation. No claims are
    /// returned when an error is.
    #[tracing::instrument(skip_all)]
    pub async fn decode_token(&self, token: &str) -> AuthResult<DecodedToken> {
        let outcome = engine::parse(token, &self.validation, self).await;
        match &outcome {
            Ok(_) => self.metrics.record_decode(OUTCOME_OK),
            Err(err) => {
                debug!(code = err.code(), error = %err, "token rejected");
                self.metrics.record_decode(err.code());
            }
        }
        outcome
    }
}

#[async_trait]
impl<C> KeyResolver for TokenService<C>
where
    C: JwksClient,
{
    async fn resolve_key(&self, header: &Header) -> AuthResult<DecodingKey> {
        if !RSA_ALGORITHMS.contains(&header.alg) || !self.config.allows(header.alg) {
            return Err(AuthError::Algorithm(format!("{:?}", header.alg)));
        }

        self.cache.refresh_if_stale().await?;

        let kid = header.kid.as_deref().ok_or(AuthError::MissingKeyId)?;
        let jwk = self
            .cache
            .get_by_kid(kid)
            .await
            .ok_or_else(|| AuthError::UnknownKeyId(kid.to_string()))?;

        let key = extract_public_key(&jwk).map_err(|source| AuthError::KeyExtraction {
            kid: kid.to_string(),
            source,
        })?;
        debug!(kid, "resolved verification key from JWKS");
        Ok(key.decoding_key())
    }
}

pub struct TokenServiceBuilder {
    config: AuthConfig,
    refresh_interval: Duration,
    metrics: Option<JwksMetrics>,
}

impl TokenServiceBuilder {
    fn new(config: AuthConfig) -> Self {
        Self {
            config,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            metrics: None,
        }
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn with_metrics(mut self, metrics: JwksMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build<C>(self, client: C) -> TokenService<C>
    where
        C: JwksClient,
    {
        let metrics = self.metrics.unwrap_or_default();
        let cache = JwksCache::with_metrics(
            client,
            self.config.jwks_url(),
            self.refresh_interval,
            metrics.clone(),
        );
        let validation = validation_for(&self.config);

        TokenService {
            config: self.config,
            cache,
            validation,
            metrics,
        }
    }
}

/// Claim policy derived from the configuration.
///
/// `exp` is enforced when present but not required; `aud` and `iss` are
/// required only when configured.
fn validation_for(config: &AuthConfig) -> Validation {
    let mut validation = Validation::new(jsonwebtoken::Algorithm::RS256);
    validation.required_spec_claims.clear();
    validation.leeway = config.leeway_seconds.min(MAX_LEEWAY_SECONDS);
    validation.validate_exp = true;
    validation.validate_nbf = true;

    if config.audience.is_empty() {
        validation.validate_aud = false;
    } else {
        validation.set_audience(&[config.audience.as_str()]);
        validation.required_spec_claims.insert("aud".to_string());
    }

    if let Some(issuer) = &config.issuer {
        validation.set_issuer(&[issuer.as_str()]);
        validation.required_spec_claims.insert("iss".to_string());
    }

    validation
}
