//! Theme defaults per renderer.
//!
//! A theme contributes default properties keyed by the registered renderer
//! name. They sit beneath the schema's own literals in the merge order.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use stencil_core::{Error, Result};

/// Supplies per-renderer default configuration.
pub trait Theme {
    /// Default properties for the renderer registered as `name`.
    fn renderer_config(&self, name: &str) -> Map<String, Value>;
}

/// A theme backed by a JSON document: `{ "<renderer>": { ..defaults } }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThemeConfig {
    renderers: HashMap<String, Map<String, Value>>,
}

impl ThemeConfig {
    /// Creates an empty theme.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a theme document.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Config`] on malformed JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(Error::Config)
    }

    /// Adds defaults for one renderer.
    #[must_use]
    pub fn with_renderer(mut self, name: impl Into<String>, defaults: Map<String, Value>) -> Self {
        self.renderers.insert(name.into(), defaults);
        self
    }
}

impl Theme for ThemeConfig {
    fn renderer_config(&self, name: &str) -> Map<String, Value> {
        self.renderers.get(name).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn loads_from_json() {
        let theme = ThemeConfig::from_json(r#"{"button": {"size": "md"}}"#).unwrap();
        assert_eq!(theme.renderer_config("button").get("size"), Some(&json!("md")));
        assert!(theme.renderer_config("text").is_empty());
    }

    #[test]
    fn malformed_documents_are_config_errors() {
        assert!(matches!(ThemeConfig::from_json("[1"), Err(Error::Config(_))));
    }
}
