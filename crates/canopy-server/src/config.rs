use canopy_auth::config::AuthConfig;
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    /// Identity provider and per-route role requirements
    #[serde(default)]
    pub auth: AuthConfig,
    /// Layer cache refresh and upstream source
    #[serde(default)]
    pub layers: LayersConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        // Server validations
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        if self.server.request_timeout.is_zero() {
            return Err("server.request_timeout must be > 0".into());
        }
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        // Layers validation
        if self.layers.refresh_interval.is_zero() {
            return Err("layers.refresh_interval must be > 0".into());
        }
        if self.layers.retry_attempts == 0 {
            return Err("layers.retry_attempts must be >= 1".into());
        }
        if self.layers.date_property.trim().is_empty() {
            return Err("layers.date_property must not be empty".into());
        }
        if self.layers.source.is_none() {
            return Err("layers.source config is required".into());
        }
        // Auth validation
        self.auth
            .validate()
            .map_err(|e| format!("auth config error: {e}"))?;
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Upper bound on handling a single request.
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Directory of the web client. Unknown paths serve files from here,
    /// falling back to `index.html`.
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    4000
}
fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout: default_request_timeout(),
            static_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayersConfig {
    /// Period between scheduled refreshes. The first refresh runs at startup.
    #[serde(default = "default_refresh_interval", with = "humantime_serde")]
    pub refresh_interval: Duration,
    /// Attempts per scheduled refresh before waiting for the next tick.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    /// Pause between failed attempts of one refresh.
    #[serde(default = "default_retry_backoff", with = "humantime_serde")]
    pub retry_backoff: Duration,
    /// Feature property holding the observation date used by `?date=`.
    #[serde(default = "default_date_property")]
    pub date_property: String,
    #[serde(default)]
    pub source: Option<SourceConfig>,
}

fn default_refresh_interval() -> Duration {
    Duration::from_secs(86_400)
}
fn default_retry_attempts() -> u32 {
    3
}
fn default_retry_backoff() -> Duration {
    Duration::from_secs(30)
}
fn default_date_property() -> String {
    "date".into()
}

impl Default for LayersConfig {
    fn default() -> Self {
        Self {
            refresh_interval: default_refresh_interval(),
            retry_attempts: default_retry_attempts(),
            retry_backoff: default_retry_backoff(),
            date_property: default_date_property(),
            source: None,
        }
    }
}

/// Where the layer dataset and its metadata document come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceConfig {
    Http {
        layers_url: Url,
        meta_url: Url,
        #[serde(default = "default_source_timeout", with = "humantime_serde")]
        timeout: Duration,
    },
    File {
        layers_path: PathBuf,
        meta_path: PathBuf,
    },
}

fn default_source_timeout() -> Duration {
    Duration::from_secs(60)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    /// Legacy variables still honored when `auth.issuer` / `auth.client_id`
    /// are not configured otherwise.
    const AUTH_URL_VAR: &str = "AUTH_URL";
    const AUTH_CLIENT_ID_VAR: &str = "AUTH_CLIENT_ID";

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or("canopy.toml"));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // Environment variable overrides, e.g., CANOPY__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("CANOPY")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let mut merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        apply_legacy_auth_env(&mut merged);
        // Validate
        merged.validate()?;
        Ok(merged)
    }

    fn apply_legacy_auth_env(cfg: &mut AppConfig) {
        if cfg.auth.issuer.trim().is_empty()
            && let Ok(url) = std::env::var(AUTH_URL_VAR)
        {
            cfg.auth.issuer = url;
        }
        if cfg.auth.client_id().is_none()
            && let Ok(client_id) = std::env::var(AUTH_CLIENT_ID_VAR)
            && !client_id.is_empty()
        {
            cfg.auth.client_id = Some(client_id);
        }
    }
}
