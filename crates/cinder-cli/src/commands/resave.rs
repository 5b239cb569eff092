//! Load a scene and write it back in canonical form

use anyhow::{Context, Result};
use cinder_scene::{load_scene, save_scene, VisualFactory};
use std::fs;
use std::path::Path;

pub fn run(path: &Path, out: &Path) -> Result<()> {
    let factory = VisualFactory::with_defaults();
    let scene = load_scene(path, &factory)
        .with_context(|| format!("Failed to load scene: {}", path.display()))?;

    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    save_scene(out, &scene.world, &scene.file.scene, scene.active_camera)
    .with_context(|| format!("Failed to write scene: {}", out.display()))?;

    println!(
        "Saved {} entities to {}",
        scene.world.entity_count(),
        out.display()
    );
    Ok(())
}
