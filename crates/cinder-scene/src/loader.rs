//! Scene loading from TOML files

use crate::factory::VisualFactory;
use crate::format::SceneFile;
use cinder_core::{CinderError, EntityId, Result};
use cinder_ecs::World;
use cinder_render::VisualSlot;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// A world built from a scene file
pub struct LoadedScene {
    pub world: World,
    pub file: SceneFile,
    /// Entity whose camera is flagged `active`
    pub active_camera: Option<EntityId>,
}

/// Load a scene from a TOML file
pub fn load_scene<P: AsRef<Path>>(path: P, factory: &VisualFactory) -> Result<LoadedScene> {
    let content = fs::read_to_string(path)?;
    load_scene_string(&content, factory)
}

/// Load a scene from a TOML string
pub fn load_scene_string(content: &str, factory: &VisualFactory) -> Result<LoadedScene> {
    let file: SceneFile = toml::from_str(content)?;
    let mut world = World::new();
    let mut active_camera = None;

    for name in spawn_order(&file)? {
        let def = &file.entities[name];
        let id = world.spawn(name)?;

        if let Some(transform) = def.transform {
            world.set_transform(id, transform)?;
        }
        if let Some(parent) = &def.parent {
            world.set_parent_by_name(name, parent)?;
        }

        if let Some(camera) = def.camera {
            world.insert(id, camera.camera)?;
            if camera.active {
                match active_camera {
                    None => active_camera = Some(id),
                    Some(_) => log::warn!("Ignoring extra active camera on '{}'", name),
                }
            }
        }

        let mut visual: Option<&str> = None;
        for (component, data) in &def.components {
            match factory.create(component, data) {
                Some(built) => {
                    if let Some(existing) = visual {
                        return Err(CinderError::SceneError(format!(
                            "entity '{}' has two visuals: {} and {}",
                            name, existing, component
                        )));
                    }
                    let built = built.map_err(|e| {
                        CinderError::Config(format!("{}.{}: {}", name, component, e))
                    })?;
                    world.insert(id, VisualSlot::from_boxed(built))?;
                    visual = Some(component.as_str());
                }
                None => world.set_component(id, component, data.clone())?,
            }
        }
    }

    log::info!(
        "Loaded scene '{}' with {} entities",
        file.scene.name,
        world.entity_count()
    );
    Ok(LoadedScene {
        world,
        file,
        active_camera,
    })
}

/// Entity names sorted by name, with every parent ahead of its children
fn spawn_order(file: &SceneFile) -> Result<Vec<&str>> {
    let mut order = Vec::with_capacity(file.entities.len());
    let mut placed = BTreeSet::new();

    for name in file.entities.keys() {
        let mut chain: Vec<&str> = Vec::new();
        let mut current = name.as_str();
        while !placed.contains(current) {
            if chain.contains(&current) {
                return Err(CinderError::HierarchyError(format!(
                    "parent cycle through '{}'",
                    current
                )));
            }
            chain.push(current);
            match file.entities[current].parent.as_deref() {
                Some(parent) if file.entities.contains_key(parent) => current = parent,
                Some(parent) => {
                    return Err(CinderError::EntityNotFound(format!(
                        "'{}' (parent of '{}')",
                        parent, current
                    )))
                }
                None => break,
            }
        }
        for ancestor in chain.into_iter().rev() {
            placed.insert(ancestor);
            order.push(ancestor);
        }
    }
    Ok(order)
}
