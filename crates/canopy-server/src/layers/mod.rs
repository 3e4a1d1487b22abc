//! Layer dataset: sources, the published snapshot and its background refresh.

pub mod cache;
pub mod refresher;
pub mod snapshot;
pub mod source;

pub use cache::{LayerCache, RefreshError};
pub use refresher::Refresher;
pub use snapshot::{
    DateFilter, DateParseError, Feature, FeatureCollection, LayerSnapshot, Layers,
    parse_request_date,
};
pub use source::{DatasetSource, FileSource, HttpSource, SourceError};
