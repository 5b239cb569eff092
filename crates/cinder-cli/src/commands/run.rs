//! Headless frame runner

use anyhow::{Context, Result};
use cinder_render::RecordingDevice;
use cinder_runtime::{EngineConfig, FrameDriver};
use cinder_scene::{load_scene, VisualFactory};
use std::path::PathBuf;

pub struct RunArgs {
    pub scene: PathBuf,
    pub frames: u64,
    pub config: Option<PathBuf>,
    pub editor: bool,
    pub wireframe: bool,
}

pub fn run(args: RunArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load engine config: {}", path.display()))?,
        None => EngineConfig::default(),
    };
    config.renderer.editor_pass |= args.editor;
    config.renderer.wireframe |= args.wireframe;

    let factory = VisualFactory::with_defaults();
    let scene = load_scene(&args.scene, &factory)
        .with_context(|| format!("Failed to load scene: {}", args.scene.display()))?;
    let scene_name = scene.file.scene.name.clone();
    log::info!("Running {} frames of '{}'", args.frames, scene_name);

    let mut driver = FrameDriver::from_scene(scene, RecordingDevice::new(), &config)
        .context("Failed to start renderer")?;
    let stats = driver
        .run_frames(args.frames)
        .context("Rendering failed")?;
    let device = driver.renderer().device().stats();

    println!("Scene: {}", scene_name);
    println!("Frames: {} ({:.3}s)", args.frames, driver.clock().total_time);
    println!("Passes: {}", stats.passes);
    println!("Draw calls: {}", stats.draw_calls);
    println!(
        "Visuals: {} rendered, {} skipped, {} failed",
        stats.visuals_rendered, stats.visuals_skipped, stats.visuals_failed
    );
    println!("Debug lines: {}", stats.lines);
    println!(
        "Device: {} buffers created, {} released, {} maps, {} resets",
        device.buffers_created, device.buffers_released, device.maps, device.resets
    );
    if driver.recoveries() > 0 {
        println!("Device recoveries: {}", driver.recoveries());
    }

    Ok(())
}
