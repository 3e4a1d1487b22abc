pub mod conditional;
pub mod config;
pub mod error;
pub mod handlers;
pub mod layers;
pub mod observability;
pub mod server;

pub use conditional::{Conditional, evaluate, fingerprint};
pub use config::{AppConfig, LayersConfig, LoggingConfig, ServerConfig, SourceConfig};
pub use error::ApiError;
pub use layers::{DatasetSource, LayerCache, LayerSnapshot, Refresher};
pub use observability::init_tracing;
pub use server::{AppState, CanopyServer, ServerBuilder, build_app};
