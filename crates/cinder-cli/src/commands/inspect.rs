//! Scene inspection

use anyhow::{Context, Result};
use cinder_render::{Camera, VisualSlot};
use cinder_scene::{load_scene, VisualFactory};
use std::path::Path;

pub fn run(path: &Path) -> Result<()> {
    let factory = VisualFactory::with_defaults();
    let scene = load_scene(path, &factory)
        .with_context(|| format!("Failed to load scene: {}", path.display()))?;
    let world = &scene.world;

    println!("Scene: {}", scene.file.scene.name);
    if let Some(description) = &scene.file.scene.description {
        println!("  {}", description);
    }
    println!("Entities: {}", world.entity_count());

    for info in world.all_entities() {
        let indent = "  ".repeat(info.depth + 1);
        let mut tags = Vec::new();

        if let Some(slot) = world.get::<VisualSlot>(info.id) {
            tags.push(format!("{} [{}]", slot.name(), slot.pass()));
        }
        if world.has::<Camera>(info.id) {
            if scene.active_camera == Some(info.id) {
                tags.push("camera (active)".to_string());
            } else {
                tags.push("camera".to_string());
            }
        }
        if let Some(components) = world.get_components(info.id) {
            tags.extend(components.component_names().into_iter().map(String::from));
        }

        if let Some(t) = world.transform(info.id) {
            println!(
                "{}{} @ ({:.2}, {:.2}, {:.2}) {}",
                indent,
                info.name,
                t.position.x,
                t.position.y,
                t.position.z,
                tags.join(", ")
            );
        } else {
            println!("{}{} {}", indent, info.name, tags.join(", "));
        }
    }

    Ok(())
}
