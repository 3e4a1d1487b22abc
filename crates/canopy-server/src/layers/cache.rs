use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::info;

use super::snapshot::LayerSnapshot;
use super::source::{DatasetSource, SourceError};

/// A refresh that could not produce a new snapshot. The published one is kept.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error("failed to fetch layers: {0}")]
    Layers(#[source] SourceError),

    #[error("failed to fetch metadata: {0}")]
    Meta(#[source] SourceError),
}

/// Holds the published [`LayerSnapshot`] behind an `ArcSwap`.
///
/// Reads are a single atomic load and never block. A refresh builds the next
/// snapshot off to the side and publishes it with one store; readers holding
/// the previous `Arc` keep seeing the previous state.
pub struct LayerCache {
    inner: ArcSwap<LayerSnapshot>,
}

impl LayerCache {
    /// Starts out serving [`LayerSnapshot::empty`].
    pub fn new() -> Self {
        Self::with_snapshot(LayerSnapshot::empty())
    }

    pub fn with_snapshot(snapshot: LayerSnapshot) -> Self {
        Self {
            inner: ArcSwap::from_pointee(snapshot),
        }
    }

    /// The snapshot currently published.
    pub fn current(&self) -> Arc<LayerSnapshot> {
        self.inner.load_full()
    }

    pub fn publish(&self, snapshot: LayerSnapshot) -> Arc<LayerSnapshot> {
        let snapshot = Arc::new(snapshot);
        self.inner.store(Arc::clone(&snapshot));
        snapshot
    }

    /// Pulls layers and metadata from `source` and publishes them together.
    ///
    /// Nothing is published unless both documents were fetched.
    pub async fn refresh(
        &self,
        source: &dyn DatasetSource,
    ) -> Result<Arc<LayerSnapshot>, RefreshError> {
        let layers = source.layers().await.map_err(RefreshError::Layers)?;
        let meta = source.meta().await.map_err(RefreshError::Meta)?;

        let snapshot = self.publish(LayerSnapshot::new(layers, meta));
        info!(
            layers = snapshot.layers.len(),
            features = snapshot.feature_count(),
            computed_at = %snapshot.computed_at,
            "Layer cache refreshed"
        );
        Ok(snapshot)
    }
}

impl Default for LayerCache {
    fn default() -> Self {
        Self::new()
    }
}
