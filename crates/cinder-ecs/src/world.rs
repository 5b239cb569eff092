//! World - ECS world with stable IDs, names, and an ordered hierarchy

use crate::component::DynamicComponents;
use crate::entity::EntityInfo;
use bimap::BiMap;
use cinder_core::{CinderError, EntityId, IdAllocator, Mat4, Result, Transform};
use std::collections::HashMap;

/// The main ECS world for Cinder
///
/// Wraps hecs::World with:
/// - Stable EntityId mapping
/// - Named entity lookup
/// - Parent/child relationships that keep insertion order, so hierarchy
///   traversal visits siblings in a stable sequence
/// - Opaque TOML component tables
pub struct World {
    /// The underlying hecs world
    world: hecs::World,
    ids: IdAllocator,
    /// Bidirectional mapping: EntityId <-> hecs::Entity
    id_map: BiMap<EntityId, hecs::Entity>,
    /// Entity name -> EntityId mapping
    name_map: HashMap<String, EntityId>,
    names: HashMap<EntityId, String>,
    /// Spawn order, used for stable root ordering
    order: Vec<EntityId>,
    /// Parent relationships: child -> parent
    parents: HashMap<EntityId, EntityId>,
    /// parent -> children, in attach order
    children: HashMap<EntityId, Vec<EntityId>>,
    extra: HashMap<EntityId, DynamicComponents>,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Create a new empty world
    pub fn new() -> Self {
        Self {
            world: hecs::World::new(),
            ids: IdAllocator::new(),
            id_map: BiMap::new(),
            name_map: HashMap::new(),
            names: HashMap::new(),
            order: Vec::new(),
            parents: HashMap::new(),
            children: HashMap::new(),
            extra: HashMap::new(),
        }
    }

    /// Spawn a new entity with a name and an identity transform
    pub fn spawn(&mut self, name: impl Into<String>) -> Result<EntityId> {
        let name = name.into();

        if self.name_map.contains_key(&name) {
            return Err(CinderError::DuplicateEntityName(name));
        }

        let entity_id = self.ids.allocate();
        let hecs_entity = self.world.spawn((Transform::IDENTITY,));

        self.id_map.insert(entity_id, hecs_entity);
        self.name_map.insert(name.clone(), entity_id);
        self.names.insert(entity_id, name);
        self.order.push(entity_id);

        Ok(entity_id)
    }

    /// Despawn an entity. Its children are detached and become roots.
    pub fn despawn(&mut self, id: EntityId) -> Result<()> {
        let hecs_entity = self
            .id_map
            .get_by_left(&id)
            .copied()
            .ok_or_else(|| CinderError::EntityNotFound(id.to_string()))?;

        self.world
            .despawn(hecs_entity)
            .map_err(|_| CinderError::EntityNotFound(id.to_string()))?;

        self.id_map.remove_by_left(&id);
        if let Some(name) = self.names.remove(&id) {
            self.name_map.remove(&name);
        }
        self.order.retain(|e| *e != id);
        self.extra.remove(&id);

        if let Some(parent) = self.parents.remove(&id) {
            if let Some(siblings) = self.children.get_mut(&parent) {
                siblings.retain(|c| *c != id);
            }
        }
        for child in self.children.remove(&id).unwrap_or_default() {
            self.parents.remove(&child);
        }

        Ok(())
    }

    /// Get entity ID by name
    pub fn get_id(&self, name: &str) -> Option<EntityId> {
        self.name_map.get(name).copied()
    }

    /// Get entity name by ID
    pub fn get_name(&self, id: EntityId) -> Option<&str> {
        self.names.get(&id).map(|s| s.as_str())
    }

    /// Attach a typed component, replacing any previous value of the same type
    pub fn insert<C: hecs::Component>(&mut self, id: EntityId, component: C) -> Result<()> {
        let entity = self.hecs_entity(id)?;
        self.world
            .insert_one(entity, component)
            .map_err(|_| CinderError::EntityNotFound(id.to_string()))
    }

    /// Detach a typed component
    pub fn remove<C: hecs::Component>(&mut self, id: EntityId) -> Option<C> {
        let entity = self.hecs_entity(id).ok()?;
        self.world.remove_one::<C>(entity).ok()
    }

    /// Borrow a typed component
    pub fn get<C: hecs::Component>(&self, id: EntityId) -> Option<hecs::Ref<'_, C>> {
        let entity = self.hecs_entity(id).ok()?;
        self.world.get::<&C>(entity).ok()
    }

    /// Mutably borrow a typed component.
    ///
    /// Borrows are checked at runtime per component type, so a `C` can be
    /// held mutably while other component types are read through `&self`.
    pub fn get_mut<C: hecs::Component>(&self, id: EntityId) -> Option<hecs::RefMut<'_, C>> {
        let entity = self.hecs_entity(id).ok()?;
        self.world.get::<&mut C>(entity).ok()
    }

    /// Check whether an entity carries a typed component
    pub fn has<C: hecs::Component>(&self, id: EntityId) -> bool {
        self.hecs_entity(id)
            .ok()
            .and_then(|e| self.world.entity(e).ok())
            .map(|e| e.has::<C>())
            .unwrap_or(false)
    }

    /// All entities carrying a typed component, in spawn order
    pub fn entities_with<C: hecs::Component>(&self) -> Vec<EntityId> {
        self.order
            .iter()
            .copied()
            .filter(|id| self.has::<C>(*id))
            .collect()
    }

    /// Local transform of an entity
    pub fn transform(&self, id: EntityId) -> Option<Transform> {
        self.get::<Transform>(id).map(|t| *t)
    }

    /// Set the local transform of an entity
    pub fn set_transform(&mut self, id: EntityId, transform: Transform) -> Result<()> {
        self.insert(id, transform)
    }

    /// Set parent relationship. Re-parenting moves the child to the end of
    /// the new parent's child list.
    pub fn set_parent(&mut self, child: EntityId, parent: EntityId) -> Result<()> {
        if !self.contains(child) {
            return Err(CinderError::EntityNotFound(child.to_string()));
        }
        if !self.contains(parent) {
            return Err(CinderError::EntityNotFound(parent.to_string()));
        }

        // Reject cycles: the parent may not be the child or one of its descendants
        let mut cursor = Some(parent);
        while let Some(current) = cursor {
            if current == child {
                return Err(CinderError::HierarchyError(format!(
                    "setting {} as parent of {} would create a cycle",
                    parent, child
                )));
            }
            cursor = self.parents.get(&current).copied();
        }

        self.clear_parent(child);
        self.parents.insert(child, parent);
        self.children.entry(parent).or_default().push(child);
        Ok(())
    }

    /// Set parent by name
    pub fn set_parent_by_name(&mut self, child: &str, parent: &str) -> Result<()> {
        let child_id = self
            .get_id(child)
            .ok_or_else(|| CinderError::EntityNotFound(child.to_string()))?;
        let parent_id = self
            .get_id(parent)
            .ok_or_else(|| CinderError::EntityNotFound(parent.to_string()))?;

        self.set_parent(child_id, parent_id)
    }

    /// Detach an entity from its parent, making it a root
    pub fn clear_parent(&mut self, child: EntityId) {
        if let Some(old) = self.parents.remove(&child) {
            if let Some(siblings) = self.children.get_mut(&old) {
                siblings.retain(|c| *c != child);
            }
        }
    }

    /// Get parent of an entity
    pub fn get_parent(&self, child: EntityId) -> Option<EntityId> {
        self.parents.get(&child).copied()
    }

    /// Get children of an entity, in attach order
    pub fn get_children(&self, parent: EntityId) -> &[EntityId] {
        self.children
            .get(&parent)
            .map(|c| c.as_slice())
            .unwrap_or(&[])
    }

    /// Entities without a parent, in spawn order
    pub fn roots(&self) -> Vec<EntityId> {
        self.order
            .iter()
            .copied()
            .filter(|id| !self.parents.contains_key(id))
            .collect()
    }

    /// World-space matrix of an entity, walking the parent chain
    pub fn world_matrix(&self, id: EntityId) -> Option<Mat4> {
        if !self.contains(id) {
            return None;
        }
        let local = self
            .transform(id)
            .map(|t| t.to_matrix())
            .unwrap_or(Mat4::IDENTITY);
        match self.parents.get(&id) {
            Some(parent_id) => Some(self.world_matrix(*parent_id)? * local),
            None => Some(local),
        }
    }

    /// Set an opaque component table on an entity
    pub fn set_component(&mut self, id: EntityId, component: &str, data: toml::Value) -> Result<()> {
        if !self.contains(id) {
            return Err(CinderError::EntityNotFound(id.to_string()));
        }
        self.extra.entry(id).or_default().set(component, data);
        Ok(())
    }

    /// Get an opaque component table from an entity
    pub fn get_component(&self, id: EntityId, component: &str) -> Option<&toml::Value> {
        self.extra.get(&id).and_then(|c| c.get(component))
    }

    /// All opaque component tables of an entity
    pub fn get_components(&self, id: EntityId) -> Option<&DynamicComponents> {
        self.extra.get(&id)
    }

    /// Info about all entities, depth-first in hierarchy order
    pub fn all_entities(&self) -> Vec<EntityInfo> {
        let mut out = Vec::with_capacity(self.order.len());
        let mut stack: Vec<(EntityId, usize)> =
            self.roots().into_iter().rev().map(|id| (id, 0)).collect();

        while let Some((id, depth)) = stack.pop() {
            out.push(EntityInfo {
                id,
                name: self.get_name(id).unwrap_or_default().to_string(),
                parent: self
                    .get_parent(id)
                    .and_then(|p| self.get_name(p))
                    .map(str::to_string),
                depth,
            });

            for child in self.get_children(id).iter().rev() {
                stack.push((*child, depth + 1));
            }
        }
        out
    }

    /// Get number of entities
    pub fn entity_count(&self) -> usize {
        self.order.len()
    }

    /// Check if an entity exists
    pub fn contains(&self, id: EntityId) -> bool {
        self.id_map.contains_left(&id)
    }

    /// Check if an entity with name exists
    pub fn contains_name(&self, name: &str) -> bool {
        self.name_map.contains_key(name)
    }

    /// Clear the world. Ids are not reused, so handles into the old
    /// contents stay dead.
    pub fn clear(&mut self) {
        self.world.clear();
        self.id_map.clear();
        self.name_map.clear();
        self.names.clear();
        self.order.clear();
        self.parents.clear();
        self.children.clear();
        self.extra.clear();
    }

    fn hecs_entity(&self, id: EntityId) -> Result<hecs::Entity> {
        self.id_map
            .get_by_left(&id)
            .copied()
            .ok_or_else(|| CinderError::EntityNotFound(id.to_string()))
    }
}
