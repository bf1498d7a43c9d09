//! Application Configuration
//!
//! Every field has a default, so an empty JSON object is a valid config.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::state::InvalidationPolicy;

/// Settings shared by the router, the component renderer and the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// `id` of the element routes are rendered into.
    pub mount_id: String,

    /// Route used when the hash is empty.
    pub default_route: String,

    /// Attribute naming the component a placeholder element expands into.
    pub component_attribute: String,

    /// Markup rendered for an unknown route.
    pub not_found_html: String,

    /// Markup shown while a lazy route loads.
    pub loading_html: String,

    /// Which bindings a state write refreshes.
    pub invalidation: InvalidationPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mount_id: "app".to_string(),
            default_route: "home".to_string(),
            component_attribute: "data-component".to_string(),
            not_found_html: "<h1>404</h1>".to_string(),
            loading_html: "<p>Loading...</p>".to_string(),
            invalidation: InvalidationPolicy::default(),
        }
    }
}

impl AppConfig {
    /// Parse a config from JSON, filling in defaults for missing fields.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn empty_object_gives_defaults() {
        let config = AppConfig::from_json("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.mount_id, "app");
        assert_eq!(config.default_route, "home");
    }

    #[test]
    fn fields_override_defaults() {
        let config =
            AppConfig::from_json(r#"{"mount_id": "root", "invalidation": "lineage"}"#).unwrap();
        assert_eq!(config.mount_id, "root");
        assert_eq!(config.invalidation, InvalidationPolicy::Lineage);
        assert_eq!(config.not_found_html, "<h1>404</h1>");
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = AppConfig::from_json("{mount_id").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
