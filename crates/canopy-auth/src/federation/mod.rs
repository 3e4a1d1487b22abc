//! Identity provider federation.
//!
//! This module resolves the trusted identity provider once at startup:
//!
//! - [`discovery`] - OpenID Connect discovery of the provider metadata
//! - [`jwks`] - JSON Web Key Set fetching and key lookup
//! - [`key_store`] - The immutable [`KeyStore`] combining both
//!
//! The key store is never refreshed; a provider key rotation requires a
//! process restart.

pub mod discovery;
pub mod jwks;
pub mod key_store;

pub use discovery::{DiscoveryError, OidcDiscoveryClient, ProviderConfiguration, ProviderMetadata};
pub use jwks::{JwksClient, KeySet, KeySetFetchError, SigningKey};
pub use key_store::{KeyStore, KeyStoreError};

use std::time::Duration;

use crate::config::AuthConfig;

/// Limits applied to every request made to the identity provider.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// HTTP request timeout (default: 10 seconds).
    pub request_timeout: Duration,

    /// Maximum response size in bytes (default: 1 MB).
    pub max_response_size: usize,

    /// Whether to allow HTTP (non-HTTPS) URLs.
    /// This should only be enabled for testing.
    pub allow_http: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            max_response_size: 1024 * 1024,
            allow_http: false,
        }
    }
}

impl FetchOptions {
    /// Allows HTTP (non-HTTPS) URLs.
    #[must_use]
    pub fn with_allow_http(mut self, allow: bool) -> Self {
        self.allow_http = allow;
        self
    }

    /// Sets the maximum response size.
    #[must_use]
    pub fn with_max_response_size(mut self, size: usize) -> Self {
        self.max_response_size = size;
        self
    }

    /// Returns `true` if the URL scheme may be fetched under these options.
    pub(crate) fn scheme_allowed(&self, url: &url::Url) -> bool {
        match url.scheme() {
            "https" => true,
            "http" => self.allow_http,
            _ => false,
        }
    }

    /// Builds the shared HTTP client honoring the request timeout.
    pub(crate) fn http_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder()
            .timeout(self.request_timeout)
            .build()
    }
}

impl From<&AuthConfig> for FetchOptions {
    fn from(config: &AuthConfig) -> Self {
        Self {
            request_timeout: config.request_timeout,
            max_response_size: config.max_response_size,
            allow_http: config.allow_http,
        }
    }
}

/// Failure while reading a size-limited response body.
pub(crate) enum ReadError {
    Network(reqwest::Error),
    TooLarge,
}

/// Reads a response body, enforcing the size limit both on the advertised
/// `Content-Length` and on the bytes actually received.
///
/// Chunked bodies are read incrementally and abandoned as soon as they pass
/// `max_size`.
pub(crate) async fn read_limited(
    mut response: reqwest::Response,
    max_size: usize,
) -> Result<Vec<u8>, ReadError> {
    if let Some(len) = response.content_length()
        && len as usize > max_size
    {
        return Err(ReadError::TooLarge);
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(ReadError::Network)? {
        if body.len() + chunk.len() > max_size {
            return Err(ReadError::TooLarge);
        }
        body.extend_from_slice(&chunk);
    }

    Ok(body)
}
