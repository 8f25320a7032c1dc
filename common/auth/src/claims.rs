use std::ops::Deref;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Verified token claims, exactly as carried in the payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecodedToken(Map<String, Value>);

impl DecodedToken {
    pub fn get(&self, claim: &str) -> Option<&Value> {
        self.0.get(claim)
    }

    pub fn subject(&self) -> Option<&str> {
        self.string_claim("sub")
    }

    pub fn issuer(&self) -> Option<&str> {
        self.string_claim("iss")
    }

    /// `aud` as a list, whether the token carried a single string or an array.
    pub fn audience(&self) -> Vec<String> {
        match self.0.get("aud") {
            Some(Value::String(item)) => vec![item.clone()],
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp_claim("exp")
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp_claim("iat")
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    fn string_claim(&self, claim: &str) -> Option<&str> {
        self.0.get(claim).and_then(Value::as_str)
    }

    fn timestamp_claim(&self, claim: &str) -> Option<DateTime<Utc>> {
        let seconds = self.0.get(claim).and_then(Value::as_i64)?;
        Utc.timestamp_opt(seconds, 0).single()
    }
}

impl From<Map<String, Value>> for DecodedToken {
    fn from(value: Map<String, Value>) -> Self {
        Self(value)
    }
}

impl Deref for DecodedToken {
    type Target = Map<String, Value>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn token(value: Value) -> DecodedToken {
        match value {
            Value::Object(map) => DecodedToken::from(map),
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn typed_accessors_read_registered_claims() {
        let claims = token(json!({
            "sub": "auth|1",
            "iss": "https://example.test/",
            "aud": ["api", "other"],
            "exp": 1_700_000_600,
            "iat": 1_700_000_000,
            "scope": "read:all"
        }));

        assert_eq!(claims.subject(), Some("auth|1"));
        assert_eq!(claims.issuer(), Some("https://example.test/"));
        assert_eq!(claims.audience(), vec!["api".to_string(), "other".to_string()]);
        assert_eq!(claims.expires_at().map(|t| t.timestamp()), Some(1_700_000_600));
        assert_eq!(claims.issued_at().map(|t| t.timestamp()), Some(1_700_000_000));
        assert_eq!(claims.get("scope"), Some(&json!("read:all")));
        assert_eq!(claims.len(), 6);
    }

    #[test]
    fn single_audience_and_missing_claims() {
        let claims = token(json!({"aud": "api"}));
        assert_eq!(claims.audience(), vec!["api".to_string()]);
        assert!(claims.subject().is_none());
        assert!(claims.expires_at().is_none());
    }

    #[test]
    fn serializes_as_plain_object() {
        let claims = token(json!({"sub": "auth|1"}));
        assert_eq!(
            serde_json::to_value(&claims).expect("serialize"),
            json!({"sub": "auth|1"})
        );
    }
}
