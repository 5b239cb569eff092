//! Frame driver: ticks the clock and renders the world once per frame

use crate::clock::FrameClock;
use crate::config::EngineConfig;
use cinder_core::{EntityId, Result};
use cinder_ecs::World;
use cinder_render::{FrameStats, GraphicsDevice, RenderError, RenderSystem};
use cinder_scene::LoadedScene;

/// Owns the world and the render system for an engine session
pub struct FrameDriver<D: GraphicsDevice> {
    world: World,
    renderer: RenderSystem<D>,
    clock: FrameClock,
    frames: u64,
    recoveries: u32,
}

impl<D: GraphicsDevice> FrameDriver<D> {
    pub fn new(world: World, device: D, config: &EngineConfig) -> Result<Self> {
        let renderer = RenderSystem::new(device, &config.renderer)?;
        Ok(Self {
            world,
            renderer,
            clock: FrameClock::new(&config.clock),
            frames: 0,
            recoveries: 0,
        })
    }

    /// Driver for a loaded scene, viewing through its active camera if it has one
    pub fn from_scene(scene: LoadedScene, device: D, config: &EngineConfig) -> Result<Self> {
        let mut driver = Self::new(scene.world, device, config)?;
        if let Some(camera) = scene.active_camera {
            driver.renderer.set_camera(&driver.world, camera)?;
        }
        Ok(driver)
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn renderer(&self) -> &RenderSystem<D> {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut RenderSystem<D> {
        &mut self.renderer
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    /// Frames completed so far, including ones lost to device recovery
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Times the device has been recovered
    pub fn recoveries(&self) -> u32 {
        self.recoveries
    }

    /// Despawn an entity, releasing its visual's device resources
    pub fn despawn(&mut self, id: EntityId) -> Result<()> {
        self.renderer.despawn(&mut self.world, id)
    }

    /// Tick the clock and render one frame.
    ///
    /// A lost device is recovered before returning; that frame reports
    /// empty stats. Recovery failure is returned to the caller.
    pub fn run_frame(&mut self) -> std::result::Result<FrameStats, RenderError> {
        let time = self.clock.tick();
        self.frames += 1;

        match self.renderer.render(&self.world, time) {
            Ok(stats) => Ok(stats),
            Err(RenderError::DeviceLost) => {
                log::warn!("Device lost during frame {}", self.frames);
                self.renderer.recover_lost_device()?;
                self.recoveries += 1;
                Ok(FrameStats::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Run `count` frames and return their summed stats
    pub fn run_frames(&mut self, count: u64) -> std::result::Result<FrameStats, RenderError> {
        let mut total = FrameStats::default();
        for _ in 0..count {
            let stats = self.run_frame()?;
            total.accumulate(&stats);
        }
        log::debug!(
            "Ran {} frames: {} draw calls, {} failed visuals",
            count,
            total.draw_calls,
            total.visuals_failed
        );
        Ok(total)
    }
}
