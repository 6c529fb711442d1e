//! Append-only record sink.
//!
//! # Responsibilities
//! - Own the destination file handle for the lifetime of the process
//! - Serialize records to single JSON lines and append them atomically
//!   with respect to concurrent callers
//! - Stamp `logged_at` under the writer lock, immediately before the write
//! - Retry transient append failures with jittered backoff, then drop and
//!   count rather than fail the caller
//!
//! # Design Decisions
//! - One `write_all` per line while holding an async mutex: concurrent
//!   appends can never interleave, and a reader tailing the file only ever
//!   sees whole lines
//! - The file is opened once in append mode at startup, so open errors
//!   surface before the server binds rather than on the first request

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::AppendLogConfig;
use crate::observability::metrics;
use crate::telemetry::record::Record;

/// Errors raised by the append log writer.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Destination could not be opened or created.
    #[error("failed to open append log at {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Record could not be serialized.
    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
    /// Line could not be written or flushed.
    #[error("failed to write record: {0}")]
    Write(#[from] std::io::Error),
}

/// Concurrency-safe writer appending one serialized record per line.
pub struct EventSink {
    file: Mutex<File>,
    config: AppendLogConfig,
    appended: AtomicU64,
    dropped: AtomicU64,
}

impl EventSink {
    /// Open (or create) the destination file in append mode.
    ///
    /// Missing parent directories are created. Existing content is never
    /// truncated.
    pub fn open(config: &AppendLogConfig) -> Result<Self, SinkError> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| SinkError::Open {
                    path: config.path.clone(),
                    source,
                })?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.path)
            .map_err(|source| SinkError::Open {
                path: config.path.clone(),
                source,
            })?;
        tracing::info!(
            path = %config.path.display(),
            fsync = config.fsync,
            "Append log opened"
        );
        Ok(Self {
            file: Mutex::new(file),
            config: config.clone(),
            appended: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        })
    }

    /// Append a single record, stamping `logged_at` just before the write.
    ///
    /// The whole line goes out in one `write_all` under the sink lock.
    pub async fn append(&self, mut record: Record) -> Result<(), SinkError> {
        let kind = record.kind();
        let mut file = self.file.lock().await;
        record.set_logged_at(Utc::now());
        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');
        file.write_all(&line)?;
        if self.config.fsync {
            file.sync_data()?;
        }
        drop(file);
        self.appended.fetch_add(1, Ordering::Relaxed);
        metrics::record_ingested(kind.as_str());
        Ok(())
    }

    /// Append with the configured retry budget.
    ///
    /// On exhaustion the record is dropped and counted instead of failing
    /// the caller: losing one metric line must never fail the request that
    /// produced it.
    pub async fn submit(&self, record: Record) {
        let retry = &self.config.retry;
        let mut attempt: u32 = 0;
        loop {
            match self.append(record.clone()).await {
                Ok(()) => return,
                Err(error) if attempt < retry.max_retries => {
                    attempt += 1;
                    metrics::record_append_failure();
                    let delay = retry_delay(attempt, retry.base_delay_ms, retry.max_delay_ms);
                    tracing::warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Append failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(error) => {
                    let kind = record.kind().as_str();
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    metrics::record_append_failure();
                    metrics::record_append_drop(kind);
                    tracing::error!(
                        kind,
                        attempts = attempt + 1,
                        error = %error,
                        "Append failed after retries, dropping record"
                    );
                    return;
                }
            }
        }
    }

    /// Destination path this sink writes to.
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Number of records successfully appended since startup.
    pub fn appended_records(&self) -> u64 {
        self.appended.load(Ordering::Relaxed)
    }

    /// Number of records dropped after retry exhaustion since startup.
    pub fn dropped_records(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Jittered exponential backoff delay for append retry `attempt` (1-based).
fn retry_delay(attempt: u32, base_delay_ms: u64, max_delay_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }
    let exponential = 2u64.saturating_pow(attempt - 1);
    let capped = base_delay_ms.saturating_mul(exponential).min(max_delay_ms);
    let jitter_range = capped / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..=jitter_range)
    } else {
        0
    };
    Duration::from_millis(capped + jitter)
}
