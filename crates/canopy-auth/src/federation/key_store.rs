//! The provider key store.
//!
//! Built once at startup by [`KeyStore::initialize`], then shared read-only
//! across requests. Nothing in here performs I/O after initialization.

use crate::config::{AuthConfig, ConfigError};

use super::discovery::{DiscoveryError, OidcDiscoveryClient, ProviderConfiguration};
use super::jwks::{JwksClient, KeySet, KeySetFetchError, SigningKey};
use super::FetchOptions;

/// Errors raised while building the key store. All of them are fatal at
/// startup.
#[derive(Debug, thiserror::Error)]
pub enum KeyStoreError {
    /// The auth configuration is unusable.
    #[error("Invalid auth configuration: {0}")]
    Config(#[from] ConfigError),

    /// The HTTP client could not be constructed.
    #[error("Failed to create HTTP client: {0}")]
    HttpClient(String),

    /// Discovery of the provider metadata failed.
    #[error("OIDC discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),

    /// Fetching the provider key set failed.
    #[error("Key set fetch failed: {0}")]
    KeySetFetch(#[from] KeySetFetchError),
}

/// Resolved provider configuration plus its signing keys.
#[derive(Debug, Clone)]
pub struct KeyStore {
    provider: ProviderConfiguration,
    keys: KeySet,
}

impl KeyStore {
    /// Performs discovery against the configured issuer and fetches the key set.
    ///
    /// # Errors
    ///
    /// Returns `Discovery` when the metadata document cannot be fetched or
    /// lacks `jwks_uri`, and `KeySetFetch` when the key set cannot be fetched
    /// or holds no usable keys.
    pub async fn initialize(config: &AuthConfig) -> Result<Self, KeyStoreError> {
        let issuer_url = config.issuer_url()?;
        let options = FetchOptions::from(config);
        let http_client = options
            .http_client()
            .map_err(|e| KeyStoreError::HttpClient(e.to_string()))?;

        let provider = OidcDiscoveryClient::new(http_client.clone(), options.clone())
            .discover(&issuer_url)
            .await?;

        let keys = JwksClient::new(http_client, options)
            .fetch(&provider.jwks_uri)
            .await?;

        tracing::info!(
            issuer = %provider.issuer,
            jwks_uri = %provider.jwks_uri,
            keys = keys.len(),
            "Key store initialized"
        );

        Ok(Self::from_parts(provider, keys))
    }

    /// Builds a store from already-resolved parts without network access.
    #[must_use]
    pub fn from_parts(provider: ProviderConfiguration, keys: KeySet) -> Self {
        Self { provider, keys }
    }

    /// Looks up a signing key by `kid`.
    #[must_use]
    pub fn lookup_key(&self, kid: &str) -> Option<&SigningKey> {
        self.keys.find(kid)
    }

    /// The `iss` value tokens must carry.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.provider.issuer
    }

    /// The resolved provider configuration.
    #[must_use]
    pub fn provider(&self) -> &ProviderConfiguration {
        &self.provider
    }

    /// The provider's signing keys.
    #[must_use]
    pub fn keys(&self) -> &KeySet {
        &self.keys
    }
}
