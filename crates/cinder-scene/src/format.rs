//! Scene file format definitions

use cinder_core::Transform;
use cinder_render::Camera;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root structure of a scene TOML file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneFile {
    pub scene: SceneMetadata,
    #[serde(default)]
    pub entities: BTreeMap<String, EntityDef>,
}

/// Scene metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneMetadata {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_version() -> String {
    "1.0".to_string()
}

/// Camera table of an entity: projection parameters plus the active flag
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraDef {
    #[serde(flatten)]
    pub camera: Camera,
    /// View the scene from this entity once loaded
    #[serde(default, skip_serializing_if = "is_false")]
    pub active: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Definition of an entity in a scene file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityDef {
    /// Optional parent entity name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<Transform>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera: Option<CameraDef>,
    /// Visual and opaque component tables, keyed by component name
    #[serde(flatten)]
    pub components: BTreeMap<String, toml::Value>,
}

impl EntityDef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn with_camera(mut self, camera: Camera, active: bool) -> Self {
        self.camera = Some(CameraDef { camera, active });
        self
    }

    pub fn with_component(mut self, name: impl Into<String>, data: toml::Value) -> Self {
        self.components.insert(name.into(), data);
        self
    }
}

impl SceneMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: default_version(),
            description: None,
        }
    }
}

impl SceneFile {
    /// Create a new scene file
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_metadata(SceneMetadata::new(name))
    }

    /// Empty scene file carrying existing metadata
    pub fn with_metadata(scene: SceneMetadata) -> Self {
        Self {
            scene,
            entities: BTreeMap::new(),
        }
    }

    /// Add an entity to the scene
    pub fn add_entity(&mut self, name: impl Into<String>, entity: EntityDef) {
        self.entities.insert(name.into(), entity);
    }
}
