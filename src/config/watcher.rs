//! Configuration file watcher for hot reload.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::CollectorConfig;

/// A watcher that monitors the configuration file for changes.
///
/// Reloaded configs are validated before they are forwarded; a file saved
/// in a broken state keeps the current configuration running. Editors that
/// rewrite the file in place can fire several events per save, so a reload
/// producing an unchanged config is swallowed.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<CollectorConfig>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver for configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<CollectorConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching the file in a background thread.
    ///
    /// The returned `RecommendedWatcher` must stay alive for watching to
    /// continue; dropping it stops the reloads.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();
        let mut last_sent: Option<CollectorConfig> = None;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        match load_config(&path) {
                            Ok(new_config) => {
                                if last_sent.as_ref() == Some(&new_config) {
                                    return;
                                }
                                tracing::info!(
                                    path = %path.display(),
                                    "Config file changed, applying reload"
                                );
                                last_sent = Some(new_config.clone());
                                let _ = tx.send(new_config);
                            }
                            Err(error) => {
                                tracing::error!(
                                    path = %path.display(),
                                    %error,
                                    "Failed to reload config, keeping current configuration"
                                );
                            }
                        }
                    }
                }
                Err(error) => tracing::error!(%error, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = %self.path.display(), "Config watcher started");
        Ok(watcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn test_rewrite_delivers_new_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("collector.toml");
        fs::write(&path, "[contact]\nredirect_url = \"/a\"\n").unwrap();

        let (watcher, mut updates) = ConfigWatcher::new(&path);
        let _handle = watcher.run().unwrap();

        fs::write(&path, "[contact]\nredirect_url = \"/b\"\n").unwrap();

        let received = tokio::time::timeout(Duration::from_secs(10), updates.recv())
            .await
            .expect("no reload within timeout")
            .expect("watcher channel closed");
        assert_eq!(received.contact.redirect_url, "/b");
    }

    #[tokio::test]
    async fn test_invalid_rewrite_is_not_delivered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("collector.toml");
        fs::write(&path, "[contact]\nredirect_url = \"/a\"\n").unwrap();

        let (watcher, mut updates) = ConfigWatcher::new(&path);
        let _handle = watcher.run().unwrap();

        fs::write(&path, "[listener]\nbind_address = \"bogus\"\n").unwrap();

        // Nothing should arrive for a config that fails validation.
        let outcome = tokio::time::timeout(Duration::from_secs(3), updates.recv()).await;
        assert!(outcome.is_err());
    }
}
