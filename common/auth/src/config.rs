use std::env;
use std::str::FromStr;

use jsonwebtoken::Algorithm;

use crate::error::{AuthError, AuthResult};

/// Default allowed clock skew for `exp`/`nbf`, matching `jsonwebtoken`.
pub const DEFAULT_LEEWAY_SECONDS: u64 = 60;

/// Largest accepted clock skew. `jsonwebtoken` subtracts the leeway from the
/// current Unix time, so it must stay well below it.
pub const MAX_LEEWAY_SECONDS: u64 = 24 * 60 * 60;

/// Algorithms the key-resolution gate accepts: RSA PKCS#1 v1.5 signatures.
pub const RSA_ALGORITHMS: &[Algorithm] = &[Algorithm::RS256, Algorithm::RS384, Algorithm::RS512];

/// Runtime configuration for validating tokens issued by one authority.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Authority hostname; the JWKS is served from `https://{domain}/.well-known/jwks.json`.
    pub domain: String,
    /// Expected audience claim (aud). Empty disables the check.
    pub audience: String,
    /// Allowed signing algorithms. Empty allows every RSA algorithm.
    pub algorithms: Vec<Algorithm>,
    /// Allowable clock skew in seconds when validating exp/nbf.
    pub leeway_seconds: u64,
    /// Expected issuer claim (iss), if any.
    pub issuer: Option<String>,
}

impl AuthConfig {
    pub fn new(domain: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            audience: audience.into(),
            algorithms: Vec::new(),
            leeway_seconds: DEFAULT_LEEWAY_SECONDS,
            issuer: None,
        }
    }

    pub fn with_algorithms(mut self, algorithms: impl IntoIterator<Item = Algorithm>) -> Self {
        self.algorithms = algorithms.into_iter().collect();
        self
    }

    /// Sets the clock skew, capped at [`MAX_LEEWAY_SECONDS`].
    pub fn with_leeway(mut self, seconds: u64) -> Self {
        self.leeway_seconds = seconds.min(MAX_LEEWAY_SECONDS);
        self
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn jwks_url(&self) -> String {
        format!("https://{}/.well-known/jwks.json", self.domain)
    }

    /// Whether the configured list permits `alg`. An empty list permits everything.
    pub fn allows(&self, alg: Algorithm) -> bool {
        self.algorithms.is_empty() || self.algorithms.contains(&alg)
    }

    /// Loads configuration from `AUTH_DOMAIN`, `AUTH_AUDIENCE`, `AUTH_ALGORITHMS`,
    /// `AUTH_LEEWAY_SECONDS` and `AUTH_ISSUER`.
    pub fn from_env() -> AuthResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> AuthResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let domain = lookup("AUTH_DOMAIN")
            .and_then(|value| normalize_optional(&value))
            .ok_or_else(|| AuthError::Config("AUTH_DOMAIN must be set".to_string()))?;

        let audience = lookup("AUTH_AUDIENCE")
            .map(|value| value.trim().to_string())
            .unwrap_or_default();

        let algorithms = lookup("AUTH_ALGORITHMS")
            .map(|value| parse_algorithms(&value))
            .transpose()?
            .unwrap_or_default();

        let leeway_seconds = match lookup("AUTH_LEEWAY_SECONDS").and_then(|v| normalize_optional(&v)) {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                AuthError::Config(format!("AUTH_LEEWAY_SECONDS is not a number: '{raw}'"))
            })?,
            None => DEFAULT_LEEWAY_SECONDS,
        };
        if leeway_seconds > MAX_LEEWAY_SECONDS {
            return Err(AuthError::Config(format!(
                "AUTH_LEEWAY_SECONDS must be at most {MAX_LEEWAY_SECONDS}, got {leeway_seconds}"
            )));
        }

        let issuer = lookup("AUTH_ISSUER").and_then(|value| normalize_optional(&value));

        Ok(Self {
            domain,
            audience,
            algorithms,
            leeway_seconds,
            issuer,
        })
    }
}

/// Parses a comma separated algorithm list, ignoring blank entries.
pub fn parse_algorithms(raw: &str) -> AuthResult<Vec<Algorithm>> {
    let mut algorithms = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|name| !name.is_empty()) {
        let alg = Algorithm::from_str(name)
            .map_err(|_| AuthError::Config(format!("unknown algorithm '{name}'")))?;
        if !RSA_ALGORITHMS.contains(&alg) {
            return Err(AuthError::Config(format!(
                "algorithm '{name}' is not an RSA signature algorithm"
            )));
        }
        if !algorithms.contains(&alg) {
            algorithms.push(alg);
        }
    }
    Ok(algorithms)
}

fn normalize_optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
