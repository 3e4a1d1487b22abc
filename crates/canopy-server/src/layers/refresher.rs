//! Background task keeping the layer cache up to date.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval, sleep};
use tracing::{error, info, warn};

use crate::config::LayersConfig;

use super::cache::{LayerCache, RefreshError};
use super::snapshot::LayerSnapshot;
use super::source::DatasetSource;

/// Periodically refreshes a [`LayerCache`] from a [`DatasetSource`].
///
/// The first tick fires immediately. Each tick makes up to `retry_attempts`
/// attempts spaced by `retry_backoff`; when all of them fail the previous
/// snapshot stays published and the next tick tries again.
pub struct Refresher {
    cache: Arc<LayerCache>,
    source: Arc<dyn DatasetSource>,
    interval: Duration,
    retry_attempts: u32,
    retry_backoff: Duration,
}

impl Refresher {
    pub fn new(cache: Arc<LayerCache>, source: Arc<dyn DatasetSource>, config: &LayersConfig) -> Self {
        Self {
            cache,
            source,
            interval: config.refresh_interval,
            retry_attempts: config.retry_attempts.max(1),
            retry_backoff: config.retry_backoff,
        }
    }

    /// Runs the loop on the tokio runtime. Abort the handle to stop it.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    /// Refresh loop. Never returns.
    pub async fn run(&self) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            source = %self.source.describe(),
            interval = ?self.interval,
            "Layer refresher started"
        );

        loop {
            ticker.tick().await;

            if let Err(e) = self.refresh_with_retry().await {
                error!(
                    error = %e,
                    attempts = self.retry_attempts,
                    "Layer refresh failed, serving previous snapshot"
                );
            }
        }
    }

    /// One scheduled refresh with bounded retries. Returns the last error
    /// when every attempt failed.
    pub async fn refresh_with_retry(&self) -> Result<Arc<LayerSnapshot>, RefreshError> {
        let mut attempt = 1;
        loop {
            match self.cache.refresh(self.source.as_ref()).await {
                Ok(snapshot) => return Ok(snapshot),
                Err(e) if attempt < self.retry_attempts => {
                    warn!(
                        attempt,
                        max_attempts = self.retry_attempts,
                        error = %e,
                        "Layer refresh attempt failed"
                    );
                    attempt += 1;
                    sleep(self.retry_backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
