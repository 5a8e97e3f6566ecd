//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::AdminConfig;
use crate::header::HeaderStore;
use crate::services::auth::{AuthError, TokenService};
use crate::services::catalog::CatalogService;
use crate::storage::{self, BlobStore};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`; owns the configuration, the auth guard, the
/// catalog service (and with it the product cache), and the header store.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    auth: TokenService,
    catalog: CatalogService,
    header: HeaderStore,
    store: Arc<dyn BlobStore>,
}

impl AppState {
    /// Create application state with the blob backend named in the config.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured password digest is unusable.
    pub fn new(config: AdminConfig) -> Result<Self, AuthError> {
        let store = storage::from_config(&config.blob);
        Self::with_store(config, store)
    }

    /// Create application state over an explicit blob store (tests inject
    /// the in-memory adapter here).
    ///
    /// # Errors
    ///
    /// Returns an error if the configured password digest is unusable.
    pub fn with_store(config: AdminConfig, store: Arc<dyn BlobStore>) -> Result<Self, AuthError> {
        let auth = TokenService::new(config.token_secret.clone(), &config.password_hash)?;
        let catalog = CatalogService::new(Arc::clone(&store));
        let header = HeaderStore::new(config.header_config_path.clone());

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                auth,
                catalog,
                header,
                store,
            }),
        })
    }

    /// Get a reference to the admin configuration.
    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    /// Get a reference to the auth guard.
    #[must_use]
    pub fn auth(&self) -> &TokenService {
        &self.inner.auth
    }

    /// Get a reference to the catalog service.
    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }

    /// Get a reference to the header configuration store.
    #[must_use]
    pub fn header(&self) -> &HeaderStore {
        &self.inner.header
    }

    /// Get the blob store (direct uploads bypass the catalog service).
    #[must_use]
    pub fn blob_store(&self) -> &Arc<dyn BlobStore> {
        &self.inner.store
    }
}
