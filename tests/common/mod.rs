//! Shared utilities for integration and load testing.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::mpsc;

use apm_collector::config::CollectorConfig;
use apm_collector::http::HttpServer;
use apm_collector::lifecycle::Shutdown;
use apm_collector::telemetry::record::Record;
use apm_collector::telemetry::sink::EventSink;

/// A collector booted on an ephemeral port with a temp-dir append log.
pub struct TestCollector {
    pub addr: SocketAddr,
    pub sink: Arc<EventSink>,
    pub shutdown: Shutdown,
    #[allow(dead_code)]
    pub config_tx: mpsc::UnboundedSender<CollectorConfig>,
    // Held so the append log directory outlives the test body.
    _log_dir: tempfile::TempDir,
}

impl TestCollector {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn log_path(&self) -> PathBuf {
        self.sink.path().to_path_buf()
    }

    /// Parse every persisted line. Panics on a torn or malformed line, so
    /// any interleaving shows up as a test failure.
    pub fn records(&self) -> Vec<Record> {
        std::fs::read_to_string(self.log_path())
            .unwrap_or_default()
            .lines()
            .map(|line| serde_json::from_str(line).expect("malformed log line"))
            .collect()
    }
}

/// Boot a collector with the given config.
///
/// The listener is bound before the server task is spawned, so requests can
/// be sent immediately without a readiness sleep. The append log path is
/// redirected into a fresh temp dir.
pub async fn spawn_collector(mut config: CollectorConfig) -> TestCollector {
    let log_dir = tempfile::tempdir().expect("temp dir");
    config.log.path = log_dir.path().join("apm_metrics.json");

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    config.listener.bind_address = addr.to_string();

    let sink = Arc::new(EventSink::open(&config.log).expect("open sink"));
    let shutdown = Shutdown::new();
    let (config_tx, config_updates) = mpsc::unbounded_channel();

    let server = HttpServer::new(config, sink.clone());
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    TestCollector {
        addr,
        sink,
        shutdown,
        config_tx,
        _log_dir: log_dir,
    }
}
