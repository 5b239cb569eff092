//! Scene saving to TOML files

use crate::format::{CameraDef, EntityDef, SceneFile, SceneMetadata};
use cinder_core::{EntityId, Result, Transform};
use cinder_ecs::World;
use cinder_render::{Camera, VisualSlot};
use std::fs;
use std::path::Path;

/// Save a world to a scene file under `metadata`
pub fn save_scene<P: AsRef<Path>>(
    path: P,
    world: &World,
    metadata: &SceneMetadata,
    active_camera: Option<EntityId>,
) -> Result<()> {
    let content = save_scene_string(world, metadata, active_camera)?;
    fs::write(path, content)?;
    Ok(())
}

/// Save a world to a TOML string
pub fn save_scene_string(
    world: &World,
    metadata: &SceneMetadata,
    active_camera: Option<EntityId>,
) -> Result<String> {
    let scene_file = world_to_scene_file(world, metadata, active_camera);
    let content = toml::to_string_pretty(&scene_file)?;
    Ok(content)
}

/// Convert a world to a SceneFile
pub fn world_to_scene_file(
    world: &World,
    metadata: &SceneMetadata,
    active_camera: Option<EntityId>,
) -> SceneFile {
    let mut scene = SceneFile::with_metadata(metadata.clone());

    for info in world.all_entities() {
        let mut def = EntityDef {
            parent: info.parent,
            components: world
                .get_components(info.id)
                .map(|c| c.data.clone())
                .unwrap_or_default(),
            ..EntityDef::default()
        };

        def.transform = world
            .transform(info.id)
            .filter(|t| *t != Transform::IDENTITY);

        if let Some(camera) = world.get::<Camera>(info.id) {
            def.camera = Some(CameraDef {
                camera: *camera,
                active: active_camera == Some(info.id),
            });
        }

        if let Some(slot) = world.get::<VisualSlot>(info.id) {
            def.components
                .insert(slot.name().to_string(), slot.component().to_toml());
        }

        scene.entities.insert(info.name, def);
    }

    scene
}
