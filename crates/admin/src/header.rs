//! Header configuration store.
//!
//! One JSON document at a fixed local path, overwritten in place on every
//! save. Reads never fail: a missing or unparsable document falls back to
//! the hard-coded default (parse failures are logged and swallowed). Every
//! save is broadcast in-process so open editor views can refresh.

use std::path::PathBuf;

use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{instrument, warn};
use vitrina_core::HeaderConfig;

/// Errors from persisting the header document. The read path has none.
#[derive(Debug, Error)]
pub enum HeaderError {
    /// Filesystem write failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// File-backed store for the singleton header configuration.
pub struct HeaderStore {
    path: PathBuf,
    updates: broadcast::Sender<HeaderConfig>,
}

impl HeaderStore {
    /// Create a store over the given document path.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        let (updates, _) = broadcast::channel(16);
        Self { path, updates }
    }

    /// Read the current configuration.
    ///
    /// Falls back to [`HeaderConfig::default`] when the document is missing
    /// or unparsable; this path never errors.
    #[instrument(skip(self))]
    pub async fn load(&self) -> HeaderConfig {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return HeaderConfig::default();
            }
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "header document unreadable, using default");
                return HeaderConfig::default();
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "header document unparsable, using default");
                HeaderConfig::default()
            }
        }
    }

    /// Overwrite the stored configuration and notify subscribers.
    ///
    /// The write goes through a sibling temp file and a rename so readers
    /// never observe a half-written document.
    ///
    /// # Errors
    ///
    /// Returns [`HeaderError`] if serialization or the filesystem write
    /// fails; subscribers are only notified after a successful write.
    #[instrument(skip(self, config))]
    pub async fn save(&self, config: &HeaderConfig) -> Result<(), HeaderError> {
        let bytes = serde_json::to_vec_pretty(config)?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        // A send only fails when nobody is subscribed, which is fine.
        let _ = self.updates.send(config.clone());
        Ok(())
    }

    /// Subscribe to configuration changes.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<HeaderConfig> {
        self.updates.subscribe()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, HeaderStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = HeaderStore::new(dir.path().join("header.json"));
        (dir, store)
    }

    #[tokio::test]
    async fn test_missing_document_loads_default() {
        let (_dir, store) = store();
        assert_eq!(store.load().await, HeaderConfig::default());
    }

    #[tokio::test]
    async fn test_save_then_load_roundtrips() {
        let (_dir, store) = store();

        let mut config = HeaderConfig::default();
        config.title = "Tienda Nueva".to_string();
        config
            .social_links
            .insert("instagram".to_string(), "https://instagram.com/t".to_string());

        store.save(&config).await.unwrap();
        assert_eq!(store.load().await, config);
    }

    #[tokio::test]
    async fn test_save_overwrites_in_place() {
        let (_dir, store) = store();

        let mut first = HeaderConfig::default();
        first.title = "First".to_string();
        store.save(&first).await.unwrap();

        let mut second = HeaderConfig::default();
        second.title = "Second".to_string();
        store.save(&second).await.unwrap();

        assert_eq!(store.load().await.title, "Second");
    }

    #[tokio::test]
    async fn test_corrupt_document_loads_default() {
        let (dir, store) = store();
        tokio::fs::write(dir.path().join("header.json"), b"{not json")
            .await
            .unwrap();
        assert_eq!(store.load().await, HeaderConfig::default());
    }

    #[tokio::test]
    async fn test_save_notifies_subscribers() {
        let (_dir, store) = store();
        let mut updates = store.subscribe();

        let mut config = HeaderConfig::default();
        config.title = "Broadcast".to_string();
        store.save(&config).await.unwrap();

        let received = updates.recv().await.unwrap();
        assert_eq!(received.title, "Broadcast");
    }
}
