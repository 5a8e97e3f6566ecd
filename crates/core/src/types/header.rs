//! Page header configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The storefront page header: one record per deployment.
///
/// Absence of a stored record (or an unparsable one) falls back to
/// [`HeaderConfig::default`], so the read path can never fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HeaderConfig {
    /// Main heading.
    pub title: String,
    /// Secondary line under the heading.
    pub subtitle: String,
    /// Contact email shown in the header.
    pub email: String,
    /// Profile/avatar image reference.
    pub profile_image: String,
    /// Social platform name to profile URL, zero or more entries.
    pub social_links: BTreeMap<String, String>,
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            title: "My Store".to_string(),
            subtitle: "Products + Offers".to_string(),
            email: "hello@example.com".to_string(),
            profile_image: "/default-profile.jpg".to_string(),
            social_links: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_has_no_social_links() {
        let config = HeaderConfig::default();
        assert!(config.social_links.is_empty());
        assert!(!config.title.is_empty());
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        // Stored documents written by older revisions may lack newer fields.
        let config: HeaderConfig = serde_json::from_str(r#"{"title":"Tienda"}"#).unwrap();
        assert_eq!(config.title, "Tienda");
        assert_eq!(config.profile_image, "/default-profile.jpg");
    }

    #[test]
    fn test_wire_format_is_camel_case() {
        let mut config = HeaderConfig::default();
        config
            .social_links
            .insert("instagram".to_string(), "https://instagram.com/x".to_string());
        let json = serde_json::to_value(config).unwrap();
        assert!(json.get("profileImage").is_some());
        assert!(json.get("socialLinks").is_some());
    }
}
