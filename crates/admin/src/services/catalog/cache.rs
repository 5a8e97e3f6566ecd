//! Time-boxed product list cache.
//!
//! One entry: the last fetched product list and when it was fetched. The
//! entry stays available after its freshness window lapses so a failed
//! refetch can fall back to it. The clock is injected so tests can move
//! time instead of sleeping.

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use vitrina_core::Product;

/// How long a fetched list is served without re-reading storage.
pub const FRESH_WINDOW: Duration = Duration::from_secs(300);

/// Time source for cache freshness decisions.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> Instant;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

struct CacheEntry {
    products: Vec<Product>,
    fetched_at: Instant,
}

/// The cache itself. Owned by the catalog service; not shared globally.
pub struct CatalogCache {
    clock: Arc<dyn Clock>,
    entry: RwLock<Option<CacheEntry>>,
}

impl CatalogCache {
    /// Create an empty cache using the given clock.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entry: RwLock::new(None),
        }
    }

    /// The cached list, only if its age is inside the freshness window.
    #[must_use]
    pub fn fresh(&self) -> Option<Vec<Product>> {
        let guard = self.entry.read().expect("cache lock poisoned");
        let entry = guard.as_ref()?;
        if self.clock.now().duration_since(entry.fetched_at) < FRESH_WINDOW {
            Some(entry.products.clone())
        } else {
            None
        }
    }

    /// The cached list regardless of age (the stale-fallback value).
    #[must_use]
    pub fn stale(&self) -> Option<Vec<Product>> {
        self.entry
            .read()
            .expect("cache lock poisoned")
            .as_ref()
            .map(|entry| entry.products.clone())
    }

    /// Replace the cached list and restart its freshness window.
    pub fn store(&self, products: Vec<Product>) {
        *self.entry.write().expect("cache lock poisoned") = Some(CacheEntry {
            products,
            fetched_at: self.clock.now(),
        });
    }

    /// Drop the cached list entirely.
    pub fn invalidate(&self) {
        *self.entry.write().expect("cache lock poisoned") = None;
    }
}

/// Adjustable clock for tests.
#[cfg(test)]
pub(crate) struct ManualClock {
    start: Instant,
    offset: std::sync::Mutex<Duration>,
}

#[cfg(test)]
impl ManualClock {
    pub(crate) fn new() -> Self {
        Self {
            start: Instant::now(),
            offset: std::sync::Mutex::new(Duration::ZERO),
        }
    }

    pub(crate) fn advance(&self, by: Duration) {
        *self.offset.lock().expect("clock lock poisoned") += by;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + *self.offset.lock().expect("clock lock poisoned")
    }
}
