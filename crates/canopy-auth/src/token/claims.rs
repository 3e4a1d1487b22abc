//! The decoded claim set of a verified token.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// All claims of a verified token, kept as a JSON object.
///
/// Providers add arbitrary claims, so nothing beyond the registered ones is
/// typed; callers read what they need through [`Claims::get`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(Map<String, Value>);

impl Claims {
    /// Wraps a claim object.
    #[must_use]
    pub fn new(claims: Map<String, Value>) -> Self {
        Self(claims)
    }

    /// Subject (`sub`).
    #[must_use]
    pub fn sub(&self) -> Option<&str> {
        self.get_str("sub")
    }

    /// Issuer (`iss`).
    #[must_use]
    pub fn iss(&self) -> Option<&str> {
        self.get_str("iss")
    }

    /// Expiration time (`exp`) in seconds since the epoch.
    #[must_use]
    pub fn exp(&self) -> Option<i64> {
        self.0.get("exp").and_then(Value::as_i64)
    }

    /// Raw claim by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// String claim by name.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }
}

impl From<Map<String, Value>> for Claims {
    fn from(claims: Map<String, Value>) -> Self {
        Self(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_accessors() {
        let claims: Claims = serde_json::from_value(json!({
            "sub": "user-1",
            "iss": "https://auth.example.com",
            "exp": 1_700_000_000,
            "custom": { "nested": true }
        }))
        .unwrap();

        assert_eq!(claims.sub(), Some("user-1"));
        assert_eq!(claims.iss(), Some("https://auth.example.com"));
        assert_eq!(claims.exp(), Some(1_700_000_000));
        assert_eq!(claims.get("custom"), Some(&json!({ "nested": true })));
        assert_eq!(claims.get_str("custom"), None);
    }

    #[test]
    fn test_serializes_transparently() {
        let claims = Claims::new(json!({ "sub": "a" }).as_object().unwrap().clone());
        assert_eq!(serde_json::to_value(&claims).unwrap(), json!({ "sub": "a" }));
    }
}
