//! Filesystem blob store adapter.
//!
//! Stores blobs as plain files under a root directory and addresses them by
//! a configured public base URL (the directory is expected to be served by
//! the deployment, e.g. behind a static-file route or reverse proxy). Used
//! for development and self-hosted deployments.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::instrument;

use super::{BlobInfo, BlobStore, PutOptions, StorageError, validate_name};

/// Blob store backed by a local directory.
pub struct LocalBlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalBlobStore {
    /// Create a store rooted at `root`, serving URLs under `public_base_url`.
    #[must_use]
    pub fn new(root: PathBuf, public_base_url: &str) -> Self {
        Self {
            root,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url_for(&self, name: &str) -> String {
        format!("{}/{name}", self.public_base_url)
    }

    /// Map a public URL back to the stored name.
    fn name_for(&self, url: &str) -> Result<String, StorageError> {
        url.strip_prefix(&self.public_base_url)
            .map(|rest| rest.trim_start_matches('/').to_string())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| StorageError::InvalidUrl(url.to_string()))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    #[instrument(skip(self, bytes), fields(name = %name, size = bytes.len()))]
    async fn put(
        &self,
        name: &str,
        bytes: Vec<u8>,
        _opts: &PutOptions,
    ) -> Result<String, StorageError> {
        validate_name(name)?;

        let path = self.root.join(name);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;

        Ok(self.url_for(name))
    }

    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<BlobInfo>, StorageError> {
        let mut blobs = Vec::new();
        if !self.root.exists() {
            return Ok(blobs);
        }

        // Iterative walk; blob names may contain directory separators.
        let mut pending: Vec<PathBuf> = vec![self.root.clone()];
        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                } else if let Some(name) = relative_name(&self.root, &path) {
                    blobs.push(BlobInfo {
                        url: self.url_for(&name),
                        name,
                    });
                }
            }
        }

        blobs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(blobs)
    }

    #[instrument(skip(self), fields(url = %url))]
    async fn get(&self, url: &str) -> Result<Vec<u8>, StorageError> {
        let name = self.name_for(url)?;
        validate_name(&name)?;

        match tokio::fs::read(self.root.join(&name)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(url.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self), fields(name = %name))]
    async fn delete(&self, name: &str) -> Result<(), StorageError> {
        validate_name(name)?;

        match tokio::fs::remove_file(self.root.join(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// The stored name of a file: its path relative to the root, `/`-separated.
fn relative_name(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<&str> = rel.iter().map(|c| c.to_str()).collect::<Option<_>>()?;
    Some(parts.join("/"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, LocalBlobStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path().to_path_buf(), "http://localhost:3000/blobs");
        (dir, store)
    }

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let (_dir, store) = store();

        let url = store
            .put(
                "images/1-abc.jpg",
                vec![1, 2, 3],
                &PutOptions::content_type("image/jpeg"),
            )
            .await
            .unwrap();
        assert_eq!(url, "http://localhost:3000/blobs/images/1-abc.jpg");

        let bytes = store.get(&url).await.unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_put_overwrites_at_name() {
        let (_dir, store) = store();
        let opts = PutOptions::default();

        store.put("products.json", b"[1]".to_vec(), &opts).await.unwrap();
        let url = store.put("products.json", b"[2]".to_vec(), &opts).await.unwrap();

        assert_eq!(store.get(&url).await.unwrap(), b"[2]".to_vec());
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_walks_nested_names() {
        let (_dir, store) = store();
        let opts = PutOptions::default();

        store.put("products.json", b"[]".to_vec(), &opts).await.unwrap();
        store.put("images/1-a.jpg", vec![0], &opts).await.unwrap();
        store.put("images/2-b.jpg", vec![0], &opts).await.unwrap();

        let blobs = store.list().await.unwrap();
        let names: Vec<&str> = blobs.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["images/1-a.jpg", "images/2-b.jpg", "products.json"]);
    }

    #[tokio::test]
    async fn test_get_unknown_url_is_not_found() {
        let (_dir, store) = store();
        let err = store
            .get("http://localhost:3000/blobs/missing.json")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_get_foreign_url_is_rejected() {
        let (_dir, store) = store();
        let err = store.get("https://elsewhere.example/x.json").await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (_dir, store) = store();
        let opts = PutOptions::default();

        store.put("images/1-a.jpg", vec![0], &opts).await.unwrap();
        store.delete("images/1-a.jpg").await.unwrap();
        store.delete("images/1-a.jpg").await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_traversal_names_are_rejected() {
        let (_dir, store) = store();
        let err = store
            .put("../outside.txt", vec![0], &PutOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidName(_)));
    }
}
