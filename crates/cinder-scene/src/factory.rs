//! Registry of visual component constructors keyed by scene-file table name

use cinder_core::Result;
use cinder_particles::CpuParticlesVisual;
use cinder_render::visuals::{GridVisual, MeshVisual};
use cinder_render::VisualComponent;
use std::collections::BTreeMap;

/// Builds a visual from its scene-file table
pub type VisualConstructor = fn(&toml::Value) -> Result<Box<dyn VisualComponent>>;

/// Maps component table names to visual constructors
#[derive(Default)]
pub struct VisualFactory {
    constructors: BTreeMap<String, VisualConstructor>,
}

impl VisualFactory {
    /// Create an empty factory
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory knowing the stock visuals: `mesh`, `grid` and `cpu_particles`
    pub fn with_defaults() -> Self {
        let mut factory = Self::new();
        factory.register(MeshVisual::NAME, |value| {
            Ok(Box::new(MeshVisual::from_toml(value)?))
        });
        factory.register(GridVisual::NAME, |value| {
            Ok(Box::new(GridVisual::from_toml(value)?))
        });
        factory.register(CpuParticlesVisual::NAME, |value| {
            Ok(Box::new(CpuParticlesVisual::from_toml(value)?))
        });
        factory
    }

    /// Register a constructor; a later registration replaces an earlier one
    pub fn register(&mut self, name: impl Into<String>, constructor: VisualConstructor) {
        let name = name.into();
        if self.constructors.insert(name.clone(), constructor).is_some() {
            log::warn!("Visual constructor '{}' replaced", name);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(|k| k.as_str())
    }

    /// Build the visual registered under `name`, or `None` if nothing is
    pub fn create(
        &self,
        name: &str,
        value: &toml::Value,
    ) -> Option<Result<Box<dyn VisualComponent>>> {
        self.constructors.get(name).map(|constructor| constructor(value))
    }
}
