//! APM collector entry point.
//!
//! Wires the subsystems together in dependency order: configuration, then
//! logging, then the append sink, then the HTTP server. A bad config or an
//! unopenable log path fails here, before the port is bound.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::mpsc;

use apm_collector::config::{load_config, CollectorConfig, ConfigWatcher};
use apm_collector::http::HttpServer;
use apm_collector::lifecycle::Shutdown;
use apm_collector::observability;
use apm_collector::telemetry::sink::EventSink;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);

    // Run on built-in defaults when no config file is given.
    let config = match &config_path {
        Some(path) => load_config(path)?,
        None => CollectorConfig::default(),
    };

    observability::logging::init(&observability::logging::directive_for(
        &config.observability.log_level,
    ));

    tracing::info!("apm-collector v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        log_path = %config.log.path.display(),
        request_timeout_secs = config.http.request_timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            observability::metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    // Open the append log before binding so destination problems surface
    // while the old instance (if any) still owns the port.
    let sink = Arc::new(EventSink::open(&config.log)?);

    let shutdown = Shutdown::new();
    shutdown.spawn_signal_listener();

    // Hot reload only applies when a config file is in use. The watcher
    // handle must outlive the server or reloads stop.
    let (config_updates, _watcher) = match &config_path {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            let handle = watcher.run()?;
            (updates, Some(handle))
        }
        None => {
            let (_tx, updates) = mpsc::unbounded_channel();
            (updates, None)
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config, sink);
    server
        .run(listener, config_updates, shutdown.subscribe())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
