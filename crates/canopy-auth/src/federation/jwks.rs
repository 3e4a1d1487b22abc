//! Provider JWKS fetching.
//!
//! The key set is fetched once from the `jwks_uri` advertised by discovery and
//! kept for the process lifetime. Individual keys that cannot be used for
//! signature verification are skipped with a warning rather than failing the
//! whole set:
//!
//! - keys that do not parse as a JWK or cannot become a decoding key
//! - keys without a `kid` (tokens are matched by `kid` only)
//! - encryption keys (`use: "enc"`)
//! - symmetric (`oct`) keys
//!
//! An empty result is an error.

use std::fmt;

use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, KeyAlgorithm, PublicKeyUse};
use jsonwebtoken::{Algorithm, DecodingKey};
use serde::Deserialize;
use url::Url;

use super::{FetchOptions, ReadError, read_limited};

/// Errors that can occur while fetching the provider key set.
#[derive(Debug, thiserror::Error)]
pub enum KeySetFetchError {
    /// A network error occurred while fetching the JWKS.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The HTTP request returned a non-success status code.
    #[error("HTTP error: status {0}")]
    HttpError(u16),

    /// The JWKS response could not be parsed as JSON.
    #[error("Failed to parse JWKS: {0}")]
    ParseError(String),

    /// No usable signing keys were found in the JWKS.
    #[error("No signing keys found in JWKS")]
    NoSigningKeys,

    /// The JWKS URI scheme is not allowed (must be HTTPS in production).
    #[error("Invalid URL scheme: {0} (only HTTPS is allowed)")]
    InvalidScheme(String),

    /// The response exceeded the maximum allowed size.
    #[error("Response exceeds maximum size of {max_size} bytes")]
    ResponseTooLarge {
        /// The maximum allowed size.
        max_size: usize,
    },
}

/// A provider public key usable for signature verification.
#[derive(Clone)]
pub struct SigningKey {
    /// Key identifier matched against the token header `kid`.
    pub kid: String,

    /// Algorithm the key is declared for, if the JWK carries `alg`.
    pub algorithm: Option<Algorithm>,

    /// Key material.
    pub decoding_key: DecodingKey,
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl SigningKey {
    /// Converts a JWK into a signing key.
    ///
    /// Returns `None` (after logging why) when the key is not usable for
    /// verifying provider tokens.
    pub fn from_jwk(jwk: &Jwk) -> Option<Self> {
        let Some(kid) = jwk.common.key_id.clone().filter(|kid| !kid.is_empty()) else {
            tracing::warn!("Skipping JWK without kid");
            return None;
        };

        if matches!(jwk.common.public_key_use, Some(PublicKeyUse::Encryption)) {
            tracing::warn!(kid = %kid, "Skipping encryption key in JWKS");
            return None;
        }

        if matches!(jwk.algorithm, AlgorithmParameters::OctetKey(_)) {
            tracing::warn!(kid = %kid, "Skipping symmetric key in JWKS");
            return None;
        }

        match DecodingKey::from_jwk(jwk) {
            Ok(decoding_key) => Some(Self {
                kid,
                algorithm: jwk_algorithm(jwk),
                decoding_key,
            }),
            Err(e) => {
                tracing::warn!(kid = %kid, error = %e, "Skipping unusable JWK");
                None
            }
        }
    }
}

/// The provider's signing keys, in document order.
#[derive(Debug, Clone, Default)]
pub struct KeySet {
    keys: Vec<SigningKey>,
}

#[derive(Deserialize)]
struct RawKeySet {
    keys: Vec<serde_json::Value>,
}

impl KeySet {
    /// Creates a key set from already-converted keys.
    #[must_use]
    pub fn new(keys: Vec<SigningKey>) -> Self {
        Self { keys }
    }

    /// Parses a JWKS document, skipping unusable keys.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the document is not a JSON object with a
    /// `keys` array, and `NoSigningKeys` if no key survives.
    pub fn from_json(body: &[u8]) -> Result<Self, KeySetFetchError> {
        let raw: RawKeySet =
            serde_json::from_slice(body).map_err(|e| KeySetFetchError::ParseError(e.to_string()))?;

        let keys: Vec<SigningKey> = raw
            .keys
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<Jwk>(value) {
                Ok(jwk) => SigningKey::from_jwk(&jwk),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping JWK that failed to parse");
                    None
                }
            })
            .collect();

        if keys.is_empty() {
            return Err(KeySetFetchError::NoSigningKeys);
        }

        Ok(Self { keys })
    }

    /// Finds a key by `kid`.
    #[must_use]
    pub fn find(&self, kid: &str) -> Option<&SigningKey> {
        self.keys.iter().find(|key| key.kid == kid)
    }

    /// Iterates over the keys in document order.
    pub fn iter(&self) -> impl Iterator<Item = &SigningKey> {
        self.keys.iter()
    }

    /// Returns the number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` if the set holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Fetches key sets from provider `jwks_uri` endpoints.
pub struct JwksClient {
    http_client: reqwest::Client,
    options: FetchOptions,
}

impl JwksClient {
    /// Creates a JWKS client sharing an existing HTTP client.
    #[must_use]
    pub fn new(http_client: reqwest::Client, options: FetchOptions) -> Self {
        Self {
            http_client,
            options,
        }
    }

    /// Fetches and parses the key set at `jwks_uri`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The URI scheme is not HTTPS (unless `allow_http` is configured)
    /// - The HTTP request fails or returns a non-success status
    /// - The body is too large, is not a JWKS, or holds no usable keys
    pub async fn fetch(&self, jwks_uri: &Url) -> Result<KeySet, KeySetFetchError> {
        if !self.options.scheme_allowed(jwks_uri) {
            return Err(KeySetFetchError::InvalidScheme(
                jwks_uri.scheme().to_string(),
            ));
        }

        tracing::debug!("Fetching JWKS from {}", jwks_uri);

        let response = self
            .http_client
            .get(jwks_uri.as_str())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Failed to fetch JWKS from {}: {}", jwks_uri, e);
                KeySetFetchError::NetworkError(e.to_string())
            })?;

        if !response.status().is_success() {
            return Err(KeySetFetchError::HttpError(response.status().as_u16()));
        }

        let body = read_limited(response, self.options.max_response_size)
            .await
            .map_err(|e| match e {
                ReadError::Network(e) => KeySetFetchError::NetworkError(e.to_string()),
                ReadError::TooLarge => KeySetFetchError::ResponseTooLarge {
                    max_size: self.options.max_response_size,
                },
            })?;

        let keys = KeySet::from_json(&body).inspect_err(|e| {
            tracing::warn!("Failed to load JWKS from {}: {}", jwks_uri, e);
        })?;

        tracing::debug!("Loaded {} signing keys from {}", keys.len(), jwks_uri);

        Ok(keys)
    }
}

/// Extracts the algorithm from a JWK.
fn jwk_algorithm(jwk: &Jwk) -> Option<Algorithm> {
    jwk.common.key_algorithm.as_ref().and_then(|alg| match alg {
        KeyAlgorithm::RS256 => Some(Algorithm::RS256),
        KeyAlgorithm::RS384 => Some(Algorithm::RS384),
        KeyAlgorithm::RS512 => Some(Algorithm::RS512),
        KeyAlgorithm::ES256 => Some(Algorithm::ES256),
        KeyAlgorithm::ES384 => Some(Algorithm::ES384),
        KeyAlgorithm::PS256 => Some(Algorithm::PS256),
        KeyAlgorithm::PS384 => Some(Algorithm::PS384),
        KeyAlgorithm::PS512 => Some(Algorithm::PS512),
        KeyAlgorithm::EdDSA => Some(Algorithm::EdDSA),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const JWKS: &str = include_str!("../../tests/fixtures/jwks.json");
    const OTHER_JWK: &str = include_str!("../../tests/fixtures/signing-key-2.jwk.json");

    fn other_key() -> serde_json::Value {
        serde_json::from_str(OTHER_JWK).unwrap()
    }

    #[test]
    fn test_parse_fixture_jwks() {
        let keys = KeySet::from_json(JWKS.as_bytes()).unwrap();

        assert_eq!(keys.len(), 1);
        let key = keys.find("signing-key-1").unwrap();
        assert_eq!(key.algorithm, Some(Algorithm::RS256));
        assert!(keys.find("signing-key-2").is_none());
    }

    #[test]
    fn test_keys_keep_document_order() {
        let mut doc: serde_json::Value = serde_json::from_str(JWKS).unwrap();
        doc["keys"].as_array_mut().unwrap().push(other_key());

        let keys = KeySet::from_json(doc.to_string().as_bytes()).unwrap();
        let kids: Vec<_> = keys.iter().map(|k| k.kid.as_str()).collect();
        assert_eq!(kids, vec!["signing-key-1", "signing-key-2"]);
    }

    #[test]
    fn test_skips_encryption_and_kidless_keys() {
        let mut enc = other_key();
        enc["use"] = json!("enc");
        enc["kid"] = json!("enc-key");

        let mut kidless = other_key();
        kidless.as_object_mut().unwrap().remove("kid");

        let mut doc: serde_json::Value = serde_json::from_str(JWKS).unwrap();
        let keys = doc["keys"].as_array_mut().unwrap();
        keys.push(enc);
        keys.push(kidless);
        keys.push(json!({ "kty": "unknown", "kid": "garbage" }));

        let keys = KeySet::from_json(doc.to_string().as_bytes()).unwrap();
        assert_eq!(keys.len(), 1);
        assert!(keys.find("enc-key").is_none());
    }

    #[test]
    fn test_skips_symmetric_keys() {
        let doc = json!({
            "keys": [{ "kty": "oct", "kid": "hmac", "k": "c2VjcmV0" }]
        });

        let err = KeySet::from_json(doc.to_string().as_bytes()).unwrap_err();
        assert!(matches!(err, KeySetFetchError::NoSigningKeys));
    }

    #[test]
    fn test_key_without_alg() {
        let mut key = other_key();
        key.as_object_mut().unwrap().remove("alg");
        let doc = json!({ "keys": [key] });

        let keys = KeySet::from_json(doc.to_string().as_bytes()).unwrap();
        assert_eq!(keys.find("signing-key-2").unwrap().algorithm, None);
    }

    #[test]
    fn test_empty_and_invalid_documents() {
        let err = KeySet::from_json(br#"{"keys": []}"#).unwrap_err();
        assert!(matches!(err, KeySetFetchError::NoSigningKeys));

        let err = KeySet::from_json(b"not json").unwrap_err();
        assert!(matches!(err, KeySetFetchError::ParseError(_)));

        let err = KeySet::from_json(br#"{"other": 1}"#).unwrap_err();
        assert!(matches!(err, KeySetFetchError::ParseError(_)));
    }

    #[test]
    fn test_debug_omits_key_material() {
        let keys = KeySet::from_json(JWKS.as_bytes()).unwrap();
        let debug = format!("{:?}", keys.find("signing-key-1").unwrap());
        assert!(debug.contains("signing-key-1"));
        assert!(!debug.contains("decoding_key"));
    }

    #[tokio::test]
    async fn test_fetch_rejects_http_by_default() {
        let client = JwksClient::new(reqwest::Client::new(), FetchOptions::default());
        let uri = Url::parse("http://auth.example.com/certs").unwrap();

        let err = client.fetch(&uri).await.unwrap_err();
        assert!(matches!(err, KeySetFetchError::InvalidScheme(_)));
    }
}
