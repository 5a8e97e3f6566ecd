//! In-process blob store adapter.
//!
//! Holds blobs in a map that dies with the process. Useful as a throwaway
//! dev backend and in tests: per-operation counters make cache behavior
//! observable (a fresh cache hit must not touch the store at all).

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{BlobInfo, BlobStore, PutOptions, StorageError, validate_name};

const URL_SCHEME: &str = "memory://";

/// Blob store backed by an in-process map.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<BTreeMap<String, Vec<u8>>>,
    puts: AtomicUsize,
    lists: AtomicUsize,
    gets: AtomicUsize,
    deletes: AtomicUsize,
    /// When set, every operation fails with a synthetic API error.
    failing: Mutex<bool>,
}

impl MemoryBlobStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `put` calls observed.
    pub fn put_calls(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// Number of `list` calls observed.
    pub fn list_calls(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }

    /// Number of `get` calls observed.
    pub fn get_calls(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    /// Number of `delete` calls observed.
    pub fn delete_calls(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    /// Total calls across all operations.
    pub fn total_calls(&self) -> usize {
        self.put_calls() + self.list_calls() + self.get_calls() + self.delete_calls()
    }

    /// Make every subsequent operation fail (simulates a store outage).
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().expect("failing flag poisoned") = failing;
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if *self.failing.lock().expect("failing flag poisoned") {
            return Err(StorageError::Api {
                status: 503,
                message: "simulated outage".to_string(),
            });
        }
        Ok(())
    }

    fn url_for(name: &str) -> String {
        format!("{URL_SCHEME}{name}")
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(
        &self,
        name: &str,
        bytes: Vec<u8>,
        _opts: &PutOptions,
    ) -> Result<String, StorageError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        validate_name(name)?;

        self.blobs
            .lock()
            .expect("blob map poisoned")
            .insert(name.to_string(), bytes);
        Ok(Self::url_for(name))
    }

    async fn list(&self) -> Result<Vec<BlobInfo>, StorageError> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        Ok(self
            .blobs
            .lock()
            .expect("blob map poisoned")
            .keys()
            .map(|name| BlobInfo {
                name: name.clone(),
                url: Self::url_for(name),
            })
            .collect())
    }

    async fn get(&self, url: &str) -> Result<Vec<u8>, StorageError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let name = url
            .strip_prefix(URL_SCHEME)
            .ok_or_else(|| StorageError::InvalidUrl(url.to_string()))?;
        self.blobs
            .lock()
            .expect("blob map poisoned")
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(url.to_string()))
    }

    async fn delete(&self, name: &str) -> Result<(), StorageError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        self.blobs.lock().expect("blob map poisoned").remove(name);
        Ok(())
    }
}
