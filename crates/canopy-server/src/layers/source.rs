//! Suppliers of the raw layer dataset.
//!
//! The gateway does not compute the dataset; it pulls two JSON documents from
//! a [`DatasetSource`]: the layers (name to GeoJSON `FeatureCollection`) and a
//! free-form metadata document.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::config::SourceConfig;

use super::snapshot::Layers;

/// Errors raised while pulling from a dataset source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("request to {url} failed: {message}")]
    Http { url: Url, message: String },

    #[error("{url} returned status {status}")]
    Status { url: Url, status: u16 },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {origin}: {message}")]
    Parse { origin: String, message: String },

    #[error("failed to create HTTP client: {0}")]
    Client(String),
}

/// Supplies the dataset on each refresh.
#[async_trait]
pub trait DatasetSource: Send + Sync {
    /// Fetches the layers document.
    async fn layers(&self) -> Result<Layers, SourceError>;

    /// Fetches the metadata document.
    async fn meta(&self) -> Result<Value, SourceError>;

    /// Short description for logs.
    fn describe(&self) -> String;
}

/// Builds the configured source.
pub fn from_config(config: &SourceConfig) -> Result<Arc<dyn DatasetSource>, SourceError> {
    Ok(match config {
        SourceConfig::Http {
            layers_url,
            meta_url,
            timeout,
        } => Arc::new(HttpSource::new(
            layers_url.clone(),
            meta_url.clone(),
            *timeout,
        )?),
        SourceConfig::File {
            layers_path,
            meta_path,
        } => Arc::new(FileSource::new(layers_path.clone(), meta_path.clone())),
    })
}

/// Pulls both documents over HTTP with GET.
pub struct HttpSource {
    client: reqwest::Client,
    layers_url: Url,
    meta_url: Url,
}

impl HttpSource {
    pub fn new(layers_url: Url, meta_url: Url, timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Client(e.to_string()))?;
        Ok(Self {
            client,
            layers_url,
            meta_url,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T, SourceError> {
        let response = self
            .client
            .get(url.as_str())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| SourceError::Http {
                url: url.clone(),
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(SourceError::Status {
                url: url.clone(),
                status: response.status().as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| SourceError::Http {
            url: url.clone(),
            message: e.to_string(),
        })?;

        serde_json::from_slice(&body).map_err(|e| SourceError::Parse {
            origin: url.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl DatasetSource for HttpSource {
    async fn layers(&self) -> Result<Layers, SourceError> {
        self.get_json(&self.layers_url).await
    }

    async fn meta(&self) -> Result<Value, SourceError> {
        self.get_json(&self.meta_url).await
    }

    fn describe(&self) -> String {
        format!("http {}", self.layers_url)
    }
}

/// Reads both documents from local files on every refresh.
pub struct FileSource {
    layers_path: PathBuf,
    meta_path: PathBuf,
}

impl FileSource {
    pub fn new(layers_path: PathBuf, meta_path: PathBuf) -> Self {
        Self {
            layers_path,
            meta_path,
        }
    }

    async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, SourceError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|e| SourceError::Parse {
            origin: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl DatasetSource for FileSource {
    async fn layers(&self) -> Result<Layers, SourceError> {
        Self::read_json(&self.layers_path).await
    }

    async fn meta(&self) -> Result<Value, SourceError> {
        Self::read_json(&self.meta_path).await
    }

    fn describe(&self) -> String {
        format!("file {}", self.layers_path.display())
    }
}
