//! Opaque component storage

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Component tables stored as TOML values
///
/// Holds data for components that no typed component or visual factory
/// claims, so a loaded scene writes them back out unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DynamicComponents {
    /// Component data: component_name -> field data
    #[serde(flatten)]
    pub data: BTreeMap<String, toml::Value>,
}

impl DynamicComponents {
    /// Create empty components
    pub fn new() -> Self {
        Self::default()
    }

    /// Get component data by name
    pub fn get(&self, component: &str) -> Option<&toml::Value> {
        self.data.get(component)
    }

    /// Set component data
    pub fn set(&mut self, component: impl Into<String>, data: toml::Value) {
        self.data.insert(component.into(), data);
    }

    /// Remove a component
    pub fn remove(&mut self, component: &str) -> Option<toml::Value> {
        self.data.remove(component)
    }

    /// Check if a component exists
    pub fn has(&self, component: &str) -> bool {
        self.data.contains_key(component)
    }

    /// Component names in sorted order
    pub fn component_names(&self) -> Vec<&str> {
        self.data.keys().map(|s| s.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get a field value from a component
    pub fn get_field(&self, component: &str, field: &str) -> Option<&toml::Value> {
        self.data.get(component).and_then(|v| v.get(field))
    }
}
