//! OpenID Connect discovery.
//!
//! Fetches the provider metadata document from
//! `{issuer}/.well-known/openid-configuration` and extracts the two values the
//! gateway needs: where the signing keys live (`jwks_uri`) and which `iss`
//! value tokens will carry.
//!
//! # Security Considerations
//!
//! - Only HTTPS URIs are allowed (unless `allow_http` is configured)
//! - HTTP timeouts prevent hanging on slow endpoints
//! - Response size is limited
//!
//! # References
//!
//! - [OpenID Connect Discovery 1.0](https://openid.net/specs/openid-connect-discovery-1_0.html)

use serde::{Deserialize, Serialize};
use url::Url;

use super::{FetchOptions, ReadError, read_limited};

/// Errors that can occur during OIDC discovery.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// A network error occurred while fetching the discovery document.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The HTTP request returned a non-success status code.
    #[error("HTTP error: status {0}")]
    HttpError(u16),

    /// The discovery document could not be parsed as JSON.
    #[error("Failed to parse discovery document: {0}")]
    ParseError(String),

    /// A required field is missing from the discovery document.
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// A URL in the configuration or the document could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The URL scheme is not allowed (must be HTTPS in production).
    #[error("Invalid URL scheme: {0} (only HTTPS is allowed)")]
    InvalidScheme(String),

    /// The response exceeded the maximum allowed size.
    #[error("Response exceeds maximum size of {max_size} bytes")]
    ResponseTooLarge {
        /// The maximum allowed size.
        max_size: usize,
    },
}

/// The subset of the provider metadata document the gateway reads.
///
/// Everything else is kept in `additional` untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderMetadata {
    /// URL that the provider asserts as its Issuer Identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,

    /// URL of the provider's JSON Web Key Set document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwks_uri: Option<String>,

    /// All other metadata fields.
    #[serde(flatten)]
    pub additional: serde_json::Map<String, serde_json::Value>,
}

/// Resolved provider configuration, fixed for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfiguration {
    /// The configured issuer URL.
    pub issuer_url: Url,

    /// The discovery document URL derived from the issuer.
    pub discovery_url: Url,

    /// The key-set URL taken from the discovery document.
    pub jwks_uri: Url,

    /// The `iss` value tokens must carry.
    pub issuer: String,
}

impl ProviderConfiguration {
    /// Resolves the configuration from a fetched metadata document.
    ///
    /// The effective issuer is the document's `issuer`, falling back to the
    /// configured issuer URL without its trailing slash.
    ///
    /// # Errors
    ///
    /// Returns `MissingField` if `jwks_uri` is absent and `InvalidUrl` if it
    /// cannot be parsed.
    pub fn from_metadata(
        issuer_url: &Url,
        discovery_url: Url,
        metadata: &ProviderMetadata,
    ) -> Result<Self, DiscoveryError> {
        let jwks_uri = metadata
            .jwks_uri
            .as_deref()
            .filter(|uri| !uri.is_empty())
            .ok_or_else(|| DiscoveryError::MissingField("jwks_uri".to_string()))?;
        let jwks_uri = Url::parse(jwks_uri)
            .map_err(|e| DiscoveryError::InvalidUrl(format!("jwks_uri '{}': {}", jwks_uri, e)))?;

        let issuer = metadata
            .issuer
            .clone()
            .filter(|iss| !iss.is_empty())
            .unwrap_or_else(|| issuer_url.as_str().trim_end_matches('/').to_string());

        Ok(Self {
            issuer_url: issuer_url.clone(),
            discovery_url,
            jwks_uri,
            issuer,
        })
    }
}

/// Client for fetching OIDC discovery documents.
pub struct OidcDiscoveryClient {
    http_client: reqwest::Client,
    options: FetchOptions,
}

impl OidcDiscoveryClient {
    /// Creates a discovery client sharing an existing HTTP client.
    #[must_use]
    pub fn new(http_client: reqwest::Client, options: FetchOptions) -> Self {
        Self {
            http_client,
            options,
        }
    }

    /// Discovers the provider configuration for an issuer URL.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The issuer URL is not HTTPS (unless `allow_http` is true)
    /// - The discovery document cannot be fetched or is too large
    /// - The discovery document cannot be parsed or lacks `jwks_uri`
    pub async fn discover(&self, issuer: &Url) -> Result<ProviderConfiguration, DiscoveryError> {
        if !self.options.scheme_allowed(issuer) {
            return Err(DiscoveryError::InvalidScheme(issuer.scheme().to_string()));
        }

        let discovery_url = build_discovery_url(issuer);

        let response = self
            .http_client
            .get(discovery_url.as_str())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Failed to fetch OIDC discovery from {}: {}", discovery_url, e);
                DiscoveryError::NetworkError(e.to_string())
            })?;

        if !response.status().is_success() {
            return Err(DiscoveryError::HttpError(response.status().as_u16()));
        }

        let body = read_limited(response, self.options.max_response_size)
            .await
            .map_err(|e| match e {
                ReadError::Network(e) => DiscoveryError::NetworkError(e.to_string()),
                ReadError::TooLarge => DiscoveryError::ResponseTooLarge {
                    max_size: self.options.max_response_size,
                },
            })?;

        let metadata: ProviderMetadata = serde_json::from_slice(&body).map_err(|e| {
            tracing::warn!(
                "Failed to parse OIDC discovery document from {}: {}",
                discovery_url,
                e
            );
            DiscoveryError::ParseError(e.to_string())
        })?;

        let config = ProviderConfiguration::from_metadata(issuer, discovery_url, &metadata)?;

        if config.issuer != issuer.as_str().trim_end_matches('/') {
            tracing::warn!(
                configured = %issuer,
                advertised = %config.issuer,
                "Discovery document advertises a different issuer; tokens must carry the advertised one"
            );
        }

        tracing::debug!(
            issuer = %config.issuer,
            jwks_uri = %config.jwks_uri,
            "Discovered OIDC configuration"
        );

        Ok(config)
    }
}

/// Builds the discovery URL from an issuer URL.
///
/// The discovery document is located at
/// `{issuer}/.well-known/openid-configuration`.
pub(crate) fn build_discovery_url(issuer: &Url) -> Url {
    let mut discovery_url = issuer.clone();

    let path = issuer.path().trim_end_matches('/');
    discovery_url.set_path(&format!("{}/.well-known/openid-configuration", path));
    discovery_url.set_query(None);
    discovery_url.set_fragment(None);

    discovery_url
}
