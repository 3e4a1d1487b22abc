use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    extract::FromRef,
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::get,
};
use canopy_auth::{AuthState, KeyStore, RoleGuard, TokenVerifier, require_roles};
use tokio::task::JoinHandle;
use tower::Layer;
use tower_http::{
    compression::CompressionLayer,
    services::{ServeDir, ServeFile},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::{
    config::AppConfig,
    handlers,
    layers::{DatasetSource, LayerCache, Refresher, source},
};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthState,
    pub cache: Arc<LayerCache>,
    /// Feature property read by the `date` filter.
    pub date_property: Arc<str>,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

pub fn build_app(state: AppState, cfg: &AppConfig) -> Router {
    let meta_guard = RoleGuard::new(state.auth.clone(), cfg.auth.roles.meta.clone());
    let layers_guard = RoleGuard::new(state.auth.clone(), cfg.auth.roles.layers.clone());

    // HEAD /meta is registered after the guard so it stays public.
    let api: Router<AppState> = Router::new()
        .route(
            "/meta",
            get(handlers::get_meta)
                .route_layer(from_fn_with_state(meta_guard, require_roles))
                .head(handlers::head_meta),
        )
        // No compression on /meta; its strong ETag names the identity body.
        .route(
            "/layers",
            get(handlers::get_layers)
                .route_layer(from_fn_with_state(layers_guard, require_roles))
                .layer(CompressionLayer::new()),
        );

    let mut app = Router::new().merge(api.clone()).nest("/api", api);

    // Single-page client: unknown paths fall back to index.html
    if let Some(dir) = &cfg.server.static_dir {
        let files = ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html")));
        app = app.fallback_service(CompressionLayer::new().layer(files));
    }

    let trace = TraceLayer::new_for_http()
        .make_span_with(|req: &axum::http::Request<axum::body::Body>| {
            use tracing::field::Empty;
            tracing::info_span!(
                "http.request",
                http.method = %req.method(),
                http.target = %req.uri(),
                http.status_code = Empty
            )
        })
        .on_response(
            |res: &axum::http::Response<_>, latency: std::time::Duration, span: &tracing::Span| {
                span.record("http.status_code", tracing::field::display(res.status().as_u16()));
                tracing::info!(
                    http.status = %res.status().as_u16(),
                    elapsed_ms = %latency.as_millis(),
                    "request handled"
                );
            },
        );

    app.layer(TimeoutLayer::with_status_code(
        StatusCode::REQUEST_TIMEOUT,
        cfg.server.request_timeout,
    ))
    .layer(trace)
    .with_state(state)
}

/// Assembles the server in order: key store, layer cache, refresher, router.
pub struct ServerBuilder {
    config: AppConfig,
    key_store: Option<Arc<KeyStore>>,
    source: Option<Arc<dyn DatasetSource>>,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            key_store: None,
            source: None,
        }
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.config = cfg;
        self
    }

    /// Skips discovery and uses an already initialized key store.
    pub fn with_key_store(mut self, key_store: Arc<KeyStore>) -> Self {
        self.key_store = Some(key_store);
        self
    }

    /// Uses `source` instead of the one named by `layers.source`.
    pub fn with_source(mut self, source: Arc<dyn DatasetSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Runs startup. Discovery or key set failures abort it; the server never
    /// starts without signing keys.
    pub async fn build(self) -> anyhow::Result<CanopyServer> {
        let key_store = match self.key_store {
            Some(store) => store,
            None => Arc::new(
                KeyStore::initialize(&self.config.auth)
                    .await
                    .context("key store initialization failed")?,
            ),
        };

        let source = match self.source {
            Some(source) => source,
            None => {
                let source_cfg = self
                    .config
                    .layers
                    .source
                    .as_ref()
                    .context("layers.source config is required")?;
                source::from_config(source_cfg).context("failed to create layer source")?
            }
        };

        let cache = Arc::new(LayerCache::new());
        let refresher = Refresher::new(cache.clone(), source, &self.config.layers).spawn();

        let verifier = Arc::new(TokenVerifier::new(key_store, &self.config.auth));
        let state = AppState {
            auth: AuthState::new(verifier),
            cache: cache.clone(),
            date_property: Arc::from(self.config.layers.date_property.as_str()),
        };
        let app = build_app(state, &self.config);

        Ok(CanopyServer {
            addr: self.config.addr(),
            app,
            cache,
            refresher,
        })
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct CanopyServer {
    addr: SocketAddr,
    app: Router,
    cache: Arc<LayerCache>,
    refresher: JoinHandle<()>,
}

impl CanopyServer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The assembled router, for driving the server in-process.
    pub fn router(&self) -> Router {
        self.app.clone()
    }

    pub fn cache(&self) -> &Arc<LayerCache> {
        &self.cache
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .with_context(|| format!("failed to bind {}", self.addr))?;
        tracing::info!("listening on {}", self.addr);

        let served = axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await;

        self.refresher.abort();
        served?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
