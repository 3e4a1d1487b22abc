//! Authentication configuration.
//!
//! Describes which identity provider to trust, how to reach it, and which
//! roles each protected route requires.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Root authentication configuration.
///
/// # Example (TOML)
///
/// ```toml
/// [auth]
/// issuer = "https://auth.example.com/realms/canopy"
/// client_id = "canopy-web"
/// request_timeout = "10s"
///
/// [auth.roles]
/// layers = ["viewer"]
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Identity provider issuer URL. Discovery is performed against
    /// `{issuer}/.well-known/openid-configuration`.
    pub issuer: String,

    /// OAuth client identifier of this deployment.
    ///
    /// When set, tokens must carry it in `aud` and
    /// `resource_access.<client_id>.roles` contributes to the role set.
    pub client_id: Option<String>,

    /// Whether plain `http` discovery and JWKS URLs are accepted.
    /// Only meant for local development and tests.
    pub allow_http: bool,

    /// Timeout for discovery and JWKS requests.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Maximum accepted size of a discovery or JWKS response, in bytes.
    pub max_response_size: usize,

    /// Clock skew tolerated when checking `exp` and `nbf`.
    #[serde(with = "humantime_serde")]
    pub leeway: Duration,

    /// Per-route role requirements.
    pub roles: RouteRoles,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: String::new(),
            client_id: None,
            allow_http: false,
            request_timeout: Duration::from_secs(10),
            max_response_size: 1024 * 1024, // 1 MB
            leeway: Duration::ZERO,
            roles: RouteRoles::default(),
        }
    }
}

/// Roles required by each protected route. Empty means any valid token.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RouteRoles {
    /// Roles required for `GET /meta`.
    pub meta: Vec<String>,
    /// Roles required for `GET /layers`.
    pub layers: Vec<String>,
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),
}

impl AuthConfig {
    /// Creates a configuration for the given issuer with default settings.
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            ..Self::default()
        }
    }

    /// Sets the client identifier used for audience and role checks.
    #[must_use]
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Allows HTTP (non-HTTPS) provider URLs.
    #[must_use]
    pub fn with_allow_http(mut self, allow: bool) -> Self {
        self.allow_http = allow;
        self
    }

    /// Returns the client identifier, ignoring an empty string.
    #[must_use]
    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref().filter(|id| !id.is_empty())
    }

    /// Parses the issuer as a URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` when the issuer is empty and
    /// `ConfigError::InvalidValue` when it is not an absolute URL.
    pub fn issuer_url(&self) -> Result<Url, ConfigError> {
        if self.issuer.trim().is_empty() {
            return Err(ConfigError::Missing("auth.issuer".to_string()));
        }
        Url::parse(self.issuer.trim())
            .map_err(|e| ConfigError::InvalidValue(format!("auth.issuer '{}': {}", self.issuer, e)))
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the issuer is missing or malformed, uses a scheme
    /// other than HTTPS without `allow_http`, or a size/timeout limit is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let issuer = self.issuer_url()?;

        match issuer.scheme() {
            "https" => {}
            "http" if self.allow_http => {}
            other => {
                return Err(ConfigError::InvalidValue(format!(
                    "auth.issuer scheme '{}' is not allowed (set allow_http for plain http)",
                    other
                )));
            }
        }

        if self.request_timeout.is_zero() {
            return Err(ConfigError::InvalidValue(
                "auth.request_timeout must be > 0".to_string(),
            ));
        }

        if self.max_response_size == 0 {
            return Err(ConfigError::InvalidValue(
                "auth.max_response_size must be > 0".to_string(),
            ));
        }

        for role in self.roles.meta.iter().chain(&self.roles.layers) {
            if role.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "auth.roles entries cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}
