//! Product catalog service.
//!
//! Orchestrates the image pipeline, blob persistence, and the product list
//! cache. The canonical catalog is one JSON document (`products.json`) in
//! blob storage, rewritten whole on every mutation; per-image blobs live
//! under `images/` with generated unique names.
//!
//! Known limitation, inherited from the whole-list persistence model:
//! concurrent writers race on the document and the last write wins. There
//! is no per-item concurrency control and no detection of external writers;
//! the cache may serve a superseded list for up to the freshness window.

pub mod cache;

use std::sync::Arc;

use thiserror::Error;
use tracing::{instrument, warn};
use vitrina_core::{Product, ProductError, ProductPatch};

use crate::services::image::{DataUrl, ImageError, OptimizeOptions, OutputFormat, optimize};
use crate::storage::{BlobStore, CATALOG_BLOB_NAME, PutOptions, StorageError, unique_image_name};

use cache::{CatalogCache, Clock, SystemClock};

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A product record failed validation.
    #[error(transparent)]
    Validation(#[from] ProductError),

    /// No product with the requested id.
    #[error("no product with id '{0}'")]
    NotFound(String),

    /// Raw image payload could not be processed.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// Blob storage failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The stored catalog document could not be (de)serialized.
    #[error("catalog document error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result of a successful whole-list save.
#[derive(Debug, Clone)]
pub struct SaveOutcome {
    /// The persisted records, raw images resolved to URLs.
    pub products: Vec<Product>,
    /// URL of the catalog document.
    pub url: String,
}

/// The catalog service. Cheap to share via the surrounding `AppState`.
pub struct CatalogService {
    store: Arc<dyn BlobStore>,
    cache: CatalogCache,
}

impl CatalogService {
    /// Create a service over the given store, using wall-clock freshness.
    #[must_use]
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    /// Create a service with an injected clock (tests).
    #[must_use]
    pub fn with_clock(store: Arc<dyn BlobStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            cache: CatalogCache::new(clock),
        }
    }

    /// The current product list.
    ///
    /// Serves the cached list without I/O while it is fresh (unless
    /// `force_refresh`). A failed fetch degrades to the stale cached list,
    /// or to an empty list if nothing was ever cached; it never surfaces
    /// the fetch error.
    #[instrument(skip(self))]
    pub async fn list(&self, force_refresh: bool) -> Vec<Product> {
        if !force_refresh
            && let Some(products) = self.cache.fresh()
        {
            return products;
        }

        match self.fetch_canonical().await {
            Ok(products) => {
                self.cache.store(products.clone());
                products
            }
            Err(e) => {
                warn!(error = %e, "catalog fetch failed, serving cached list");
                self.cache.stale().unwrap_or_default()
            }
        }
    }

    /// Persist `products` as the complete new catalog.
    ///
    /// Every record is validated up front; any raw (`data:`) image is
    /// optimized and uploaded under a fresh unique name, and the record's
    /// image field is replaced with the resulting URL. The list is then
    /// written as a single document: a failure anywhere aborts the whole
    /// save and leaves the stored catalog untouched.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Validation`] before any side effect if a
    /// record is invalid, or the underlying image/storage error.
    #[instrument(skip(self, products), fields(count = products.len()))]
    pub async fn save_all(&self, products: Vec<Product>) -> Result<SaveOutcome, CatalogError> {
        for product in &products {
            product.validate()?;
        }

        // Per-product image work is independent; run it concurrently.
        let resolved = futures::future::try_join_all(
            products.into_iter().map(|p| self.resolve_image(p)),
        )
        .await?;

        let bytes = serde_json::to_vec_pretty(&resolved)?;
        let url = self
            .store
            .put(
                CATALOG_BLOB_NAME,
                bytes,
                &PutOptions::content_type("application/json"),
            )
            .await?;

        self.cache.store(resolved.clone());
        Ok(SaveOutcome {
            products: resolved,
            url,
        })
    }

    /// Insert or replace one product in the canonical list.
    ///
    /// # Errors
    ///
    /// Propagates validation, image, and storage errors; a storage read
    /// failure aborts (this is a read-modify-write, not a blind append).
    #[instrument(skip(self, product), fields(id = %product.id))]
    pub async fn save(&self, product: Product) -> Result<Product, CatalogError> {
        product.validate()?;
        let id = product.id.clone();

        let mut products = self.fetch_canonical().await?;
        match products.iter_mut().find(|p| p.id == id) {
            Some(existing) => *existing = product,
            None => products.push(product),
        }

        let outcome = self.save_all(products).await?;
        find_by_id(outcome.products, &id)
    }

    /// Apply a partial update to one product.
    ///
    /// The image pipeline runs only when the patch supplies a new raw
    /// image; an untouched image field keeps its stored URL.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] for an unknown id, or the usual
    /// validation/image/storage errors.
    #[instrument(skip(self, patch), fields(id = %id))]
    pub async fn update(&self, id: &str, patch: ProductPatch) -> Result<Product, CatalogError> {
        let mut products = self.fetch_canonical().await?;
        let product = products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))?;
        product.apply(patch);

        let outcome = self.save_all(products).await?;
        find_by_id(outcome.products, id)
    }

    /// Remove one product from the canonical list.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] for an unknown id.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn delete(&self, id: &str) -> Result<(), CatalogError> {
        let mut products = self.fetch_canonical().await?;
        let before = products.len();
        products.retain(|p| p.id != id);
        if products.len() == before {
            return Err(CatalogError::NotFound(id.to_string()));
        }

        self.save_all(products).await?;
        Ok(())
    }

    /// Drop the cached list so the next read hits storage.
    pub fn invalidate(&self) {
        self.cache.invalidate();
    }

    /// Read and parse the canonical document. Absence is an empty catalog,
    /// not an error.
    async fn fetch_canonical(&self) -> Result<Vec<Product>, CatalogError> {
        let blobs = self.store.list().await?;
        let Some(info) = blobs.iter().find(|b| b.name == CATALOG_BLOB_NAME) else {
            return Ok(Vec::new());
        };
        let bytes = self.store.get(&info.url).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Replace a raw (`data:`) image with an uploaded blob URL. Records
    /// whose image is already a URL (or absent) pass through untouched.
    async fn resolve_image(&self, mut product: Product) -> Result<Product, CatalogError> {
        if !product.has_raw_image() {
            return Ok(product);
        }
        let raw = product.image_url.as_deref().unwrap_or_default();
        let data = DataUrl::parse(raw)?;

        // PNG sources keep their transparency; everything else goes lossy.
        let format = if data.mime_type == "image/png" {
            OutputFormat::Png
        } else {
            OutputFormat::Jpeg
        };
        let optimized = optimize(
            &data.bytes,
            &OptimizeOptions {
                format,
                ..OptimizeOptions::default()
            },
        )?;

        let name = unique_image_name(optimized.format.extension());
        let url = self
            .store
            .put(
                &name,
                optimized.bytes,
                &PutOptions::content_type(optimized.format.content_type()),
            )
            .await?;

        product.image_url = Some(url);
        Ok(product)
    }
}

fn find_by_id(products: Vec<Product>, id: &str) -> Result<Product, CatalogError> {
    products
        .into_iter()
        .find(|p| p.id == id)
        .ok_or_else(|| CatalogError::NotFound(id.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;
    use std::io::Cursor;
    use std::time::Duration;

    use super::cache::{FRESH_WINDOW, ManualClock};
    use super::*;
    use crate::storage::MemoryBlobStore;

    fn product(id: &str) -> Product {
        Product {
            id: id.to_string(),
            title: format!("Product {id}"),
            description: "A product".to_string(),
            image_url: None,
            marketplace_urls: BTreeMap::from([
                ("us".to_string(), format!("https://amazon.com/dp/{id}")),
                ("mx".to_string(), format!("https://amazon.com.mx/dp/{id}")),
            ]),
        }
    }

    fn png_data_url() -> String {
        use base64::Engine as _;

        let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            1600,
            800,
            image::Rgb([10, 20, 30]),
        ));
        let mut buffer = Cursor::new(Vec::new());
        img.write_with_encoder(image::codecs::png::PngEncoder::new(&mut buffer))
            .unwrap();
        let payload = base64::engine::general_purpose::STANDARD.encode(buffer.into_inner());
        format!("data:image/png;base64,{payload}")
    }

    fn service() -> (Arc<MemoryBlobStore>, Arc<ManualClock>, CatalogService) {
        let store = Arc::new(MemoryBlobStore::new());
        let clock = Arc::new(ManualClock::new());
        let service = CatalogService::with_clock(
            Arc::clone(&store) as Arc<dyn BlobStore>,
            Arc::clone(&clock) as Arc<dyn Clock>,
        );
        (store, clock, service)
    }

    #[tokio::test]
    async fn test_save_all_then_forced_list_roundtrips() {
        let (_store, _clock, service) = service();

        let outcome = service.save_all(vec![product("p-1")]).await.unwrap();
        assert!(outcome.url.ends_with("products.json"));

        let listed = service.list(true).await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed.first().unwrap().id, "p-1");
        assert_eq!(listed.first().unwrap().title, "Product p-1");
    }

    #[tokio::test]
    async fn test_raw_image_is_uploaded_and_replaced_with_url() {
        let (store, _clock, service) = service();

        let mut p = product("p-1");
        p.image_url = Some(png_data_url());

        let outcome = service.save_all(vec![p]).await.unwrap();
        let saved = outcome.products.first().unwrap();
        let image_url = saved.image_url.as_deref().unwrap();

        assert!(!image_url.starts_with("data:"), "raw data must not persist");
        assert!(image_url.contains("images/"));

        // The image blob really exists and the persisted document holds the
        // URL, not pixel data.
        let blobs = store.list().await.unwrap();
        assert!(blobs.iter().any(|b| b.url == image_url));
        let doc = store.get("memory://products.json").await.unwrap();
        assert!(!String::from_utf8(doc).unwrap().contains("data:image"));
    }

    #[tokio::test]
    async fn test_url_image_passes_through_unchanged() {
        let (store, _clock, service) = service();

        let mut p = product("p-1");
        p.image_url = Some("https://cdn.example.com/existing.jpg".to_string());

        let outcome = service.save_all(vec![p]).await.unwrap();
        assert_eq!(
            outcome.products.first().unwrap().image_url.as_deref(),
            Some("https://cdn.example.com/existing.jpg")
        );
        // Only the catalog document was written; no image upload happened.
        assert_eq!(store.put_calls(), 1);
    }

    #[tokio::test]
    async fn test_invalid_product_aborts_before_any_write() {
        let (store, _clock, service) = service();
        service.save_all(vec![product("p-1")]).await.unwrap();
        let puts_before = store.put_calls();

        let mut bad = product("p-2");
        bad.title = String::new();
        let err = service
            .save_all(vec![product("p-1"), bad])
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogError::Validation(_)));
        assert_eq!(store.put_calls(), puts_before, "nothing may be persisted");
        assert_eq!(service.list(true).await.len(), 1);
    }

    #[tokio::test]
    async fn test_fresh_list_does_no_storage_io() {
        let (store, _clock, service) = service();
        service.save_all(vec![product("p-1")]).await.unwrap();

        let calls_after_save = store.total_calls();
        let first = service.list(false).await;
        let second = service.list(false).await;

        assert_eq!(first, second);
        assert_eq!(
            store.total_calls(),
            calls_after_save,
            "fresh cache hits must not touch the store"
        );
    }

    #[tokio::test]
    async fn test_expired_cache_refetches() {
        let (store, clock, service) = service();
        service.save_all(vec![product("p-1")]).await.unwrap();

        clock.advance(FRESH_WINDOW + Duration::from_secs(1));
        let calls_before = store.total_calls();
        service.list(false).await;
        assert!(store.total_calls() > calls_before);
    }

    #[tokio::test]
    async fn test_fetch_failure_serves_stale_list() {
        let (store, clock, service) = service();
        service.save_all(vec![product("p-1")]).await.unwrap();

        clock.advance(FRESH_WINDOW + Duration::from_secs(1));
        store.set_failing(true);

        let listed = service.list(false).await;
        assert_eq!(listed.len(), 1, "stale list, not an error or empty");
        assert_eq!(listed.first().unwrap().id, "p-1");
    }

    #[tokio::test]
    async fn test_fetch_failure_with_no_cache_is_empty() {
        let (store, _clock, service) = service();
        store.set_failing(true);
        assert!(service.list(true).await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_store_lists_empty() {
        let (_store, _clock, service) = service();
        assert!(service.list(true).await.is_empty());
    }

    #[tokio::test]
    async fn test_save_inserts_then_replaces() {
        let (_store, _clock, service) = service();

        service.save(product("p-1")).await.unwrap();
        service.save(product("p-2")).await.unwrap();
        assert_eq!(service.list(true).await.len(), 2);

        let mut replacement = product("p-2");
        replacement.title = "Renamed".to_string();
        let saved = service.save(replacement).await.unwrap();
        assert_eq!(saved.title, "Renamed");
        assert_eq!(service.list(true).await.len(), 2);
    }

    #[tokio::test]
    async fn test_update_patches_fields() {
        let (_store, _clock, service) = service();
        service.save_all(vec![product("p-1")]).await.unwrap();

        let updated = service
            .update(
                "p-1",
                ProductPatch {
                    description: Some("New description".to_string()),
                    ..ProductPatch::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.description, "New description");
        assert_eq!(updated.title, "Product p-1");
    }

    #[tokio::test]
    async fn test_update_without_image_keeps_stored_url() {
        let (_store, _clock, service) = service();
        let mut p = product("p-1");
        p.image_url = Some(png_data_url());
        let saved = service.save_all(vec![p]).await.unwrap();
        let stored_url = saved.products.first().unwrap().image_url.clone();

        let updated = service
            .update(
                "p-1",
                ProductPatch {
                    title: Some("Renamed".to_string()),
                    ..ProductPatch::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.image_url, stored_url);
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_not_found() {
        let (_store, _clock, service) = service();
        let err = service
            .update("ghost", ProductPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_removes_and_rejects_unknown() {
        let (_store, _clock, service) = service();
        service
            .save_all(vec![product("p-1"), product("p-2")])
            .await
            .unwrap();

        service.delete("p-1").await.unwrap();
        assert_eq!(service.list(true).await.len(), 1);

        let err = service.delete("p-1").await.unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));
        assert_eq!(service.list(true).await.len(), 1);
    }
}
