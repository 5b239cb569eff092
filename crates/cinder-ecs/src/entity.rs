//! Per-entity summary records

use cinder_core::EntityId;
use serde::{Deserialize, Serialize};

/// One entity's place in the hierarchy, as listed by
/// [`World::all_entities`](crate::World::all_entities)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityInfo {
    pub id: EntityId,
    pub name: String,
    /// Name of the parent, if the entity is not a root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Distance from the root; roots are 0
    pub depth: usize,
}

impl EntityInfo {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}
