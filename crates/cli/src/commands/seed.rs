//! Seed the catalog with starter products.
//!
//! Writes through the same catalog service the API uses, so seeded data
//! goes through validation and the whole-list persistence path.

#![allow(clippy::print_stdout)] // command output

use std::collections::BTreeMap;
use std::path::Path;

use tracing::info;

use vitrina_admin::config::BlobConfig;
use vitrina_admin::services::catalog::CatalogService;
use vitrina_admin::storage;
use vitrina_core::Product;

/// Persist a starter catalog through the configured blob backend.
///
/// # Arguments
///
/// * `file` - Optional JSON file with the products to seed; the built-in
///   sample is used when absent
///
/// # Errors
///
/// Returns an error if the file cannot be read, a record fails validation,
/// or the blob backend rejects the write.
pub async fn catalog(file: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let products = match file {
        Some(path) => {
            let path = Path::new(path);
            if !path.exists() {
                return Err(format!("File not found: {}", path.display()).into());
            }
            let content = tokio::fs::read_to_string(path).await?;
            serde_json::from_str::<Vec<Product>>(&content)?
        }
        None => sample_products(),
    };

    info!(count = products.len(), "Seeding catalog");

    let blob = BlobConfig::from_env()?;
    let service = CatalogService::new(storage::from_config(&blob));
    let outcome = service.save_all(products).await?;

    println!("Seeded {} products -> {}", outcome.products.len(), outcome.url);
    Ok(())
}

/// A small built-in catalog for fresh deployments.
fn sample_products() -> Vec<Product> {
    vec![
        Product {
            id: "sample-1".to_string(),
            title: "Sample product".to_string(),
            description: "Replace this with a real catalog entry".to_string(),
            image_url: None,
            marketplace_urls: BTreeMap::from([
                ("us".to_string(), "https://amazon.com/dp/example".to_string()),
                (
                    "mx".to_string(),
                    "https://amazon.com.mx/dp/example".to_string(),
                ),
            ]),
        },
        Product {
            id: "sample-2".to_string(),
            title: "Another sample".to_string(),
            description: "Also replaceable".to_string(),
            image_url: None,
            marketplace_urls: BTreeMap::from([(
                "us".to_string(),
                "https://amazon.com/dp/example-2".to_string(),
            )]),
        },
    ]
}
