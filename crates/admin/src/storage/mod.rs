//! Blob storage port and adapters.
//!
//! Every persisted artifact (the canonical `products.json` document and the
//! uploaded images under `images/`) lives in an external object store behind
//! the [`BlobStore`] trait. The deployed backend is picked by configuration:
//! the hosted blob HTTP API, a local directory, or an in-process map.
//!
//! Objects are addressed by name on write and by URL on read; writing to an
//! existing name overwrites it (no versioning). Callers needing distinct
//! objects generate unique names via [`unique_image_name`].

mod local;
mod memory;
mod vercel;

pub use local::LocalBlobStore;
pub use memory::MemoryBlobStore;
pub use vercel::VercelBlobStore;

use std::sync::Arc;

use async_trait::async_trait;
use rand::distr::{Alphanumeric, SampleString};
use thiserror::Error;

use crate::config::{BlobBackend, BlobConfig};

/// Fixed name of the canonical product catalog document.
pub const CATALOG_BLOB_NAME: &str = "products.json";

/// Name prefix under which uploaded images are stored.
pub const IMAGES_PREFIX: &str = "images/";

/// Errors that can occur when talking to the object store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The deployment has no write credential; raised before any network
    /// call is attempted.
    #[error("blob storage write credential is not configured")]
    NotConfigured,

    /// HTTP transport failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The store rejected the request.
    #[error("blob API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Filesystem operation failed (local backend).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No blob exists at the given URL.
    #[error("blob not found: {0}")]
    NotFound(String),

    /// The URL does not belong to this store.
    #[error("invalid blob URL: {0}")]
    InvalidUrl(String),

    /// The blob name contains path traversal or other rejected components.
    #[error("invalid blob name: {0}")]
    InvalidName(String),
}

/// Options for [`BlobStore::put`].
#[derive(Debug, Clone)]
pub struct PutOptions {
    /// MIME type recorded on the object.
    pub content_type: String,
    /// Whether the object is served publicly. The hosted backend only
    /// supports public objects; the flag exists for interface parity.
    pub public: bool,
}

impl Default for PutOptions {
    fn default() -> Self {
        Self {
            content_type: "application/octet-stream".to_string(),
            public: true,
        }
    }
}

impl PutOptions {
    /// Public object with the given content type.
    #[must_use]
    pub fn content_type(content_type: &str) -> Self {
        Self {
            content_type: content_type.to_string(),
            public: true,
        }
    }
}

/// A stored blob as returned by [`BlobStore::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobInfo {
    /// Name the blob was stored under.
    pub name: String,
    /// URL the blob can be fetched from.
    pub url: String,
}

/// The object-store port.
///
/// Implementations must provide read-after-write consistency: once `put`
/// returns, `list` and `get` observe the new content.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `name`, overwriting any previous object at that
    /// name, and return the public URL.
    async fn put(&self, name: &str, bytes: Vec<u8>, opts: &PutOptions)
    -> Result<String, StorageError>;

    /// List all stored blobs.
    async fn list(&self) -> Result<Vec<BlobInfo>, StorageError>;

    /// Fetch a blob's bytes by its URL.
    async fn get(&self, url: &str) -> Result<Vec<u8>, StorageError>;

    /// Delete the blob stored under `name`. Deleting a missing name is not
    /// an error.
    async fn delete(&self, name: &str) -> Result<(), StorageError>;
}

/// Build the configured adapter.
#[must_use]
pub fn from_config(config: &BlobConfig) -> Arc<dyn BlobStore> {
    match config.backend {
        BlobBackend::Vercel => Arc::new(VercelBlobStore::new(
            &config.api_url,
            config.read_write_token.clone(),
        )),
        BlobBackend::Local => Arc::new(LocalBlobStore::new(
            config.local_root.clone(),
            &config.public_base_url,
        )),
        BlobBackend::Memory => Arc::new(MemoryBlobStore::new()),
    }
}

/// Generate a unique image blob name: `images/{timestamp}-{random}.{ext}`.
#[must_use]
pub fn unique_image_name(extension: &str) -> String {
    let timestamp = chrono::Utc::now().timestamp_millis();
    let suffix = Alphanumeric
        .sample_string(&mut rand::rng(), 6)
        .to_lowercase();
    format!("{IMAGES_PREFIX}{timestamp}-{suffix}.{extension}")
}

/// Reject names with empty, absolute, or parent-directory components.
pub(crate) fn validate_name(name: &str) -> Result<(), StorageError> {
    if name.is_empty() || name.starts_with('/') {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    if name.split('/').any(|part| part.is_empty() || part == "." || part == "..") {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    Ok(())
}
