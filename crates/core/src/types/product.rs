//! Product catalog records.
//!
//! A [`Product`] is one entry in the catalog: a title, a description, an
//! optional image reference, and per-region marketplace links. The wire
//! format uses camelCase names so the serialized form matches the persisted
//! `products.json` document.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Errors produced when validating a [`Product`].
#[derive(thiserror::Error, Debug, Clone)]
pub enum ProductError {
    /// A required text field is empty or missing.
    #[error("product field '{field}' is required")]
    MissingField {
        /// Name of the missing field.
        field: &'static str,
    },
    /// No marketplace links were supplied.
    #[error("product '{id}' must link at least one marketplace")]
    NoMarketplaces {
        /// Identifier of the offending product.
        id: String,
    },
    /// A marketplace link is not an absolute URL.
    #[error("marketplace link '{region}' is not a valid URL: {source}")]
    InvalidMarketplaceUrl {
        /// Region key of the offending link.
        region: String,
        /// Underlying parse error.
        source: url::ParseError,
    },
}

/// A catalog entry.
///
/// The `image_url` field holds either a fully-qualified URL (once the image
/// has been persisted to blob storage) or, transiently on incoming requests,
/// a `data:` URL carrying raw image bytes. Raw data never survives a save:
/// the admin service transcodes and uploads it, replacing the field with the
/// blob URL before the record is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Opaque unique identifier.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Free-form description.
    pub description: String,
    /// Image reference: a URL once persisted, absent if the product has none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Marketplace links keyed by region (e.g. `us`, `mx`).
    #[serde(default)]
    pub marketplace_urls: BTreeMap<String, String>,
}

impl Product {
    /// Validate the record's required fields and marketplace links.
    ///
    /// The image field is deliberately not validated here: incoming records
    /// may carry a `data:` URL that the catalog service resolves to a blob
    /// URL during save.
    ///
    /// # Errors
    ///
    /// Returns a [`ProductError`] if `id`, `title`, or `description` is
    /// empty, if no marketplace link is present, or if any marketplace link
    /// fails to parse as an absolute URL.
    pub fn validate(&self) -> Result<(), ProductError> {
        if self.id.trim().is_empty() {
            return Err(ProductError::MissingField { field: "id" });
        }
        if self.title.trim().is_empty() {
            return Err(ProductError::MissingField { field: "title" });
        }
        if self.description.trim().is_empty() {
            return Err(ProductError::MissingField {
                field: "description",
            });
        }
        if self.marketplace_urls.is_empty() {
            return Err(ProductError::NoMarketplaces {
                id: self.id.clone(),
            });
        }
        for (region, link) in &self.marketplace_urls {
            url::Url::parse(link).map_err(|source| ProductError::InvalidMarketplaceUrl {
                region: region.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Whether the image field carries raw (not yet persisted) data.
    #[must_use]
    pub fn has_raw_image(&self) -> bool {
        self.image_url
            .as_deref()
            .is_some_and(|s| s.starts_with("data:"))
    }

    /// Apply a partial update, replacing only the supplied fields.
    pub fn apply(&mut self, patch: ProductPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(image_url) = patch.image_url {
            self.image_url = image_url;
        }
        if let Some(marketplace_urls) = patch.marketplace_urls {
            self.marketplace_urls = marketplace_urls;
        }
    }
}

/// A partial update to a [`Product`].
///
/// `None` leaves the stored field untouched. The image field is doubly
/// optional so a patch can distinguish "keep the image" (`None`) from
/// "remove the image" (`Some(None)`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default, with = "double_option")]
    pub image_url: Option<Option<String>>,
    pub marketplace_urls: Option<BTreeMap<String, String>>,
}

/// Serde helper distinguishing an absent field from an explicit `null`.
mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}
