//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the facade handlers
//! - Wire up middleware (tracing, panic capture, timeout, interception,
//!   CORS, body limits)
//! - Bind the server to a listener, plain or TLS
//! - Apply runtime-swappable settings from config reloads
//!
//! # Design Decisions
//! - Layer order is load-bearing: catch-panic and timeout sit outside the
//!   interceptor so panics and timeout cancellations pass through it and
//!   get recorded; CORS and the body limit sit inside so their rejections
//!   are recorded like any other response
//! - CORS consults an arc-swapped allow-list through a predicate, so a
//!   reload changes policy without rebuilding the router

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, StatusCode};
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::{CollectorConfig, TlsConfig};
use crate::http::handlers;
use crate::http::interceptor;
use crate::telemetry::sink::EventSink;

/// Fatal server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to load TLS material: {0}")]
    Tls(std::io::Error),
}

/// Settings that may be swapped at runtime by a config reload.
#[derive(Debug)]
pub struct RuntimeOptions {
    /// Redirect target for successful contact submissions.
    pub redirect_url: String,
    allowed_origins: AllowedOrigins,
}

#[derive(Debug)]
enum AllowedOrigins {
    Any,
    List(Vec<String>),
}

impl RuntimeOptions {
    /// Extract the runtime-swappable subset of a validated config.
    pub fn from_config(config: &CollectorConfig) -> Self {
        let origins = &config.cors.allowed_origins;
        let allowed_origins = if origins.iter().any(|origin| origin == "*") {
            AllowedOrigins::Any
        } else {
            AllowedOrigins::List(origins.clone())
        };
        Self {
            redirect_url: config.contact.redirect_url.clone(),
            allowed_origins,
        }
    }

    /// Whether a request `Origin` header value passes the allow-list.
    pub fn origin_allowed(&self, origin: &HeaderValue) -> bool {
        match &self.allowed_origins {
            AllowedOrigins::Any => true,
            AllowedOrigins::List(list) => origin
                .to_str()
                .map(|origin| list.iter().any(|allowed| allowed == origin))
                .unwrap_or(false),
        }
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub sink: Arc<EventSink>,
    pub runtime: Arc<ArcSwap<RuntimeOptions>>,
    pub config: Arc<CollectorConfig>,
}

impl AppState {
    /// Build handler state around an injected sink.
    pub fn new(config: &CollectorConfig, sink: Arc<EventSink>) -> Self {
        Self {
            sink,
            runtime: Arc::new(ArcSwap::from_pointee(RuntimeOptions::from_config(config))),
            config: Arc::new(config.clone()),
        }
    }
}

/// HTTP server for the collector.
pub struct HttpServer {
    router: Router,
    config: CollectorConfig,
    runtime: Arc<ArcSwap<RuntimeOptions>>,
}

impl HttpServer {
    /// Create a new HTTP server around an injected append sink.
    pub fn new(config: CollectorConfig, sink: Arc<EventSink>) -> Self {
        let state = AppState::new(&config, sink);
        let runtime = state.runtime.clone();
        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            runtime,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &CollectorConfig, state: AppState) -> Router {
        facade_routes()
            .fallback(handlers::not_found)
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(CatchPanicLayer::new())
                    .layer(TimeoutLayer::with_status_code(
                        StatusCode::REQUEST_TIMEOUT,
                        Duration::from_secs(config.http.request_timeout_secs),
                    ))
                    .layer(middleware::from_fn_with_state(
                        state.clone(),
                        interceptor::track_performance,
                    ))
                    .layer(cors_layer(state.runtime.clone()))
                    .layer(DefaultBodyLimit::max(config.http.max_body_bytes)),
            )
            .with_state(state)
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// `config_updates` feeds hot reloads; only the runtime-swappable
    /// subset is applied, everything else is logged as restart-required.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<CollectorConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let Self {
            router,
            config,
            runtime,
        } = self;

        let addr = listener.local_addr().map_err(ServerError::Io)?;
        tracing::info!(
            address = %addr,
            tls = config.listener.tls.is_some(),
            "HTTP server starting"
        );

        spawn_reload_task(runtime, config.clone(), config_updates);

        let app = router.into_make_service_with_connect_info::<SocketAddr>();

        match &config.listener.tls {
            Some(tls) => {
                let rustls = load_tls_config(tls).await.map_err(ServerError::Tls)?;
                let handle = axum_server::Handle::new();
                let shutdown_handle = handle.clone();
                tokio::spawn(async move {
                    let _ = shutdown.recv().await;
                    shutdown_handle.graceful_shutdown(Some(Duration::from_secs(10)));
                });
                axum_server::from_tcp_rustls(listener.into_std()?, rustls)
                    .handle(handle)
                    .serve(app)
                    .await?;
            }
            None => {
                axum::serve(listener, app)
                    .with_graceful_shutdown(async move {
                        let _ = shutdown.recv().await;
                    })
                    .await?;
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }
}

/// Route table for the facade.
pub(crate) fn facade_routes() -> Router<AppState> {
    Router::new()
        .route("/apm/track_event/", post(handlers::track_event))
        .route("/health", get(handlers::health))
        .route("/contact", post(handlers::submit_contact))
}

/// CORS layer consulting the swappable allow-list on every request.
///
/// Allowed origins are mirrored back rather than answered with `*`, and
/// credentials stay off.
fn cors_layer(runtime: Arc<ArcSwap<RuntimeOptions>>) -> CorsLayer {
    CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .allow_origin(AllowOrigin::predicate(move |origin, _| {
            runtime.load().origin_allowed(origin)
        }))
}

/// Apply runtime-swappable settings from config reloads.
fn spawn_reload_task(
    runtime: Arc<ArcSwap<RuntimeOptions>>,
    mut current: CollectorConfig,
    mut updates: mpsc::UnboundedReceiver<CollectorConfig>,
) {
    tokio::spawn(async move {
        while let Some(next) = updates.recv().await {
            for section in restart_required_changes(&current, &next) {
                tracing::warn!(section, "Config change requires a restart to take effect");
            }
            runtime.store(Arc::new(RuntimeOptions::from_config(&next)));
            tracing::info!(
                redirect_url = %next.contact.redirect_url,
                allowed_origins = next.cors.allowed_origins.len(),
                "Runtime settings reloaded"
            );
            current = next;
        }
    });
}

/// Sections whose changes cannot be applied without a restart.
fn restart_required_changes(
    old: &CollectorConfig,
    new: &CollectorConfig,
) -> Vec<&'static str> {
    let mut sections = Vec::new();
    if old.listener != new.listener {
        sections.push("listener");
    }
    if old.http != new.http {
        sections.push("http");
    }
    if old.log != new.log {
        sections.push("log");
    }
    if old.observability != new.observability {
        sections.push("observability");
    }
    sections
}

/// Load TLS material for the listener (PEM certificate and key).
async fn load_tls_config(tls: &TlsConfig) -> Result<RustlsConfig, std::io::Error> {
    let cert = Path::new(&tls.cert_path);
    let key = Path::new(&tls.key_path);
    if !cert.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("certificate file not found: {}", cert.display()),
        ));
    }
    if !key.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("private key file not found: {}", key.display()),
        ));
    }
    RustlsConfig::from_pem_file(cert, key).await
}
