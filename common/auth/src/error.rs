use jsonwebtoken::errors::ErrorKind;
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

/// Failure turning a JWK record into an RSA public key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("JWK is missing required member '{0}'")]
    MissingField(&'static str),
    #[error("JWK member '{field}' is not valid unpadded base64url: {source}")]
    Decode {
        field: &'static str,
        #[source]
        source: base64::DecodeError,
    },
    #[error("JWK exponent does not fit in 32 bits ({0} significant bytes)")]
    ExponentTooLarge(usize),
    #[error("JWK key type '{0}' is not supported")]
    UnsupportedKeyType(String),
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("token missing kid header")]
    MissingKeyId,
    #[error("no JWKS entry for kid '{0}'")]
    UnknownKeyId(String),
    #[error("failed to decode token header: {0}")]
    InvalidHeader(String),
    #[error("token signed with disallowed algorithm '{0}'")]
    Algorithm(String),
    #[error("malformed token: {0}")]
    MalformedToken(String),
    #[error("token signature is invalid")]
    Signature,
    #[error("token has expired")]
    Expired,
    #[error("token is not valid yet")]
    NotYetValid,
    #[error("invalid claim '{0}': {1}")]
    InvalidClaim(&'static str, String),
    #[error("token verification failed: {0}")]
    Verification(String),
    #[error("failed to build key for kid '{kid}': {source}")]
    KeyExtraction {
        kid: String,
        #[source]
        source: KeyError,
    },
    #[error("failed to fetch JWKS: {0}")]
    JwksFetch(String),
    #[error("failed to parse JWKS response: {0}")]
    JwksDecode(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl AuthError {
    /// Stable short identifier, used as a metrics label and in CLI output.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingKeyId | AuthError::UnknownKeyId(_) => "AUTH_KEY",
            AuthError::Algorithm(_) => "AUTH_ALG",
            AuthError::InvalidHeader(_) | AuthError::MalformedToken(_) => "AUTH_TOKEN",
            AuthError::Signature => "AUTH_SIGNATURE",
            AuthError::Expired | AuthError::NotYetValid => "AUTH_EXPIRED",
            AuthError::InvalidClaim(_, _) => "AUTH_CLAIMS",
            AuthError::Verification(_) => "AUTH_VERIFY",
            AuthError::KeyExtraction { .. } => "AUTH_KEY_EXTRACT",
            AuthError::JwksFetch(_) | AuthError::JwksDecode(_) => "AUTH_JWKS",
            AuthError::Config(_) => "AUTH_CONFIG",
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(value: jsonwebtoken::errors::Error) -> Self {
        match value.kind() {
            ErrorKind::InvalidSignature => Self::Signature,
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::ImmatureSignature => Self::NotYetValid,
            ErrorKind::InvalidAudience => {
                Self::InvalidClaim("aud", "audience does not match".to_string())
            }
            ErrorKind::InvalidIssuer => {
                Self::InvalidClaim("iss", "issuer does not match".to_string())
            }
            ErrorKind::MissingRequiredClaim(claim) => match claim.as_str() {
                "aud" => Self::InvalidClaim("aud", "claim is missing".to_string()),
                "iss" => Self::InvalidClaim("iss", "claim is missing".to_string()),
                "exp" => Self::InvalidClaim("exp", "claim is missing".to_string()),
                other => Self::Verification(format!("missing required claim '{other}'")),
            },
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                Self::Algorithm(value.to_string())
            }
            ErrorKind::InvalidToken
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_) => Self::MalformedToken(value.to_string()),
            _ => Self::Verification(value.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_errors_map_to_taxonomy() {
        let expired: AuthError = jsonwebtoken::errors::Error::from(ErrorKind::ExpiredSignature).into();
        assert!(matches!(expired, AuthError::Expired));

        let signature: AuthError =
            jsonwebtoken::errors::Error::from(ErrorKind::InvalidSignature).into();
        assert!(matches!(signature, AuthError::Signature));

        let audience: AuthError =
            jsonwebtoken::errors::Error::from(ErrorKind::InvalidAudience).into();
        assert!(matches!(audience, AuthError::InvalidClaim("aud", _)));

        let malformed: AuthError = jsonwebtoken::errors::Error::from(ErrorKind::InvalidToken).into();
        assert!(matches!(malformed, AuthError::MalformedToken(_)));
    }

    #[test]
    fn codes_group_related_failures() {
        assert_eq!(AuthError::MissingKeyId.code(), AuthError::UnknownKeyId("k".into()).code());
        assert_eq!(AuthError::Expired.code(), "AUTH_EXPIRED");
        assert_eq!(AuthError::JwksDecode("bad".into()).code(), "AUTH_JWKS");
        let extraction = AuthError::KeyExtraction {
            kid: "k1".into(),
            source: KeyError::MissingField("n"),
        };
        assert_eq!(extraction.code(), "AUTH_KEY_EXTRACT");
        assert!(extraction.to_string().contains("'n'"));
    }
}
