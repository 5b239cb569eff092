//! The render system: per-frame pass pipeline over the world hierarchy

use crate::camera::ViewState;
use crate::constant_buffer::{
    ConstantBufferCache, FrameConstants, MatrixConstants, PixelSlot, VertexSlot,
};
use crate::context::RenderContext;
use crate::device::{GraphicsDevice, PrimitiveTopology, RasterizerMode, ShaderStage};
use crate::error::RenderError;
use crate::line_batch::{LineBatch, MAX_LINE_CAPACITY};
use crate::material::{Material, MaterialId, MaterialLibrary};
use crate::render_pass::RenderPass;
use crate::shader_library::ShaderLibrary;
use crate::transform_stack::TransformStack;
use crate::visual::{SetupContext, SlotState, VisualSlot};
use cinder_core::{Color, EntityId};
use cinder_ecs::World;
use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Renderer settings, the `[renderer]` table of the engine config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Run the editor overlay pass
    pub editor_pass: bool,
    /// Draw the main pass in wireframe
    pub wireframe: bool,
    /// Debug lines to preallocate room for
    pub line_capacity: usize,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            editor_pass: false,
            wireframe: false,
            line_capacity: 1024,
        }
    }
}

impl RendererConfig {
    /// Reject settings the renderer cannot honor
    pub fn validate(&self) -> cinder_core::Result<()> {
        if self.line_capacity > MAX_LINE_CAPACITY {
            return Err(cinder_core::CinderError::Config(format!(
                "renderer.line_capacity must be at most {}, got {}",
                MAX_LINE_CAPACITY, self.line_capacity
            )));
        }
        Ok(())
    }
}

/// Counters for one rendered frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub passes: u32,
    pub draw_calls: u32,
    /// Visuals whose `render` ran
    pub visuals_rendered: u32,
    /// Visuals that opted out in `pre_render`
    pub visuals_skipped: u32,
    /// Visuals that hit an error this frame
    pub visuals_failed: u32,
    pub lines: u32,
}

impl FrameStats {
    pub fn accumulate(&mut self, other: &FrameStats) {
        self.passes += other.passes;
        self.draw_calls += other.draw_calls;
        self.visuals_rendered += other.visuals_rendered;
        self.visuals_skipped += other.visuals_skipped;
        self.visuals_failed += other.visuals_failed;
        self.lines += other.lines;
    }
}

/// Owns the device and all shared render state for an engine session
pub struct RenderSystem<D: GraphicsDevice> {
    device: D,
    shaders: ShaderLibrary,
    materials: MaterialLibrary,
    stack: TransformStack,
    lines: LineBatch,
    line_material: MaterialId,
    view: ViewState,
    vs_frame: ConstantBufferCache,
    ps_frame: ConstantBufferCache,
    rasterizer: RasterizerMode,
    editor_pass: bool,
}

impl<D: GraphicsDevice> RenderSystem<D> {
    pub fn new(mut device: D, config: &RendererConfig) -> Result<Self, RenderError> {
        let mut shaders = ShaderLibrary::new();
        shaders.make_shaders(&mut device)?;

        let mut materials = MaterialLibrary::new();
        let line_material = materials.insert(Material::basic("debug-lines", Color::WHITE));

        let rasterizer = if config.wireframe {
            RasterizerMode::Wireframe
        } else {
            RasterizerMode::Solid
        };

        Ok(Self {
            device,
            shaders,
            materials,
            stack: TransformStack::new(),
            lines: LineBatch::with_capacity(config.line_capacity)?,
            line_material,
            view: ViewState::new(),
            vs_frame: ConstantBufferCache::new(ShaderStage::Vertex),
            ps_frame: ConstantBufferCache::new(ShaderStage::Pixel),
            rasterizer,
            editor_pass: config.editor_pass,
        })
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn shaders(&self) -> &ShaderLibrary {
        &self.shaders
    }

    pub fn materials(&self) -> &MaterialLibrary {
        &self.materials
    }

    pub fn materials_mut(&mut self) -> &mut MaterialLibrary {
        &mut self.materials
    }

    pub fn view_state(&self) -> &ViewState {
        &self.view
    }

    pub fn view_state_mut(&mut self) -> &mut ViewState {
        &mut self.view
    }

    /// Render every pass for the current world state
    pub fn render(&mut self, world: &World, time: f64) -> Result<FrameStats, RenderError> {
        self.device.begin_frame()?;
        self.stack.reset();
        self.prune_orphans(world);
        self.setup_pending(world);

        let mut stats = FrameStats::default();
        for pass in RenderPass::ORDER {
            if pass == RenderPass::Editor && !self.editor_pass {
                continue;
            }
            self.render_pass(world, pass, time, &mut stats)?;
            stats.passes += 1;
        }

        self.device.end_frame()?;
        Ok(stats)
    }

    /// Release materials of entities despawned without [`RenderSystem::despawn`]
    fn prune_orphans(&mut self, world: &World) {
        let released = self
            .materials
            .prune(&mut self.device, |owner| world.contains(owner));
        if released > 0 {
            log::warn!(
                "Released {} material(s) of entities despawned outside the renderer",
                released
            );
        }
    }

    /// Take the visual off `id` and free everything it holds on the device.
    /// Returns the released slot, which can be inserted again later.
    pub fn remove_visual(&mut self, world: &mut World, id: EntityId) -> Option<VisualSlot> {
        let mut slot = world.remove::<VisualSlot>(id);
        if let Some(slot) = slot.as_mut() {
            slot.release(&mut self.device);
        }
        let released = self.materials.release_owned(&mut self.device, id);
        if slot.is_some() || released > 0 {
            log::debug!(
                "Released visual resources of '{}' ({} material(s))",
                world.get_name(id).unwrap_or_default(),
                released
            );
        }
        slot
    }

    /// Despawn `id` after releasing its visual. Children become roots.
    pub fn despawn(&mut self, world: &mut World, id: EntityId) -> cinder_core::Result<()> {
        if !world.contains(id) {
            return Err(cinder_core::CinderError::EntityNotFound(id.to_string()));
        }
        self.remove_visual(world, id);
        if self.view.active() == Some(id) {
            self.view.restore_camera();
        }
        world.despawn(id)
    }

    fn setup_pending(&mut self, world: &World) {
        for id in world.entities_with::<VisualSlot>() {
            let Some(mut slot) = world.get_mut::<VisualSlot>(id) else {
                continue;
            };
            if slot.state() != SlotState::Pending {
                continue;
            }
            let mut ctx = SetupContext {
                world,
                owner: id,
                materials: &mut self.materials,
            };
            if slot.setup(&mut ctx) {
                log::debug!(
                    "{} on '{}' ready",
                    slot.name(),
                    world.get_name(id).unwrap_or_default()
                );
            }
        }
    }

    fn render_pass(
        &mut self,
        world: &World,
        pass: RenderPass,
        time: f64,
        stats: &mut FrameStats,
    ) -> Result<(), RenderError> {
        if let Err(e) = self.begin_pass(world, pass, time) {
            if e.is_device_lost() {
                return Err(e);
            }
            log::error!("Failed to bind {} pass constants: {}", pass, e);
        }

        for root in world.roots() {
            self.traverse(world, root, pass, time, stats)?;
        }

        if pass == RenderPass::Line {
            self.flush_lines(stats)?;
        }
        Ok(())
    }

    fn begin_pass(&mut self, world: &World, pass: RenderPass, time: f64) -> Result<(), RenderError> {
        let (rasterizer, topology) = match pass {
            RenderPass::Main => (self.rasterizer, PrimitiveTopology::TriangleList),
            RenderPass::Editor => (RasterizerMode::Solid, PrimitiveTopology::TriangleList),
            RenderPass::Line => (RasterizerMode::Solid, PrimitiveTopology::LineList),
        };
        self.device.set_rasterizer(rasterizer);
        self.device.set_topology(topology);

        let vp = self.view.view_projection(world);
        self.vs_frame.upload(
            &mut self.device,
            VertexSlot::View.index(),
            &MatrixConstants::new(vp.view),
        )?;
        self.vs_frame.upload(
            &mut self.device,
            VertexSlot::Projection.index(),
            &MatrixConstants::new(vp.projection),
        )?;
        self.ps_frame.upload(
            &mut self.device,
            PixelSlot::Frame.index(),
            &FrameConstants::new(vp.eye, time),
        )
    }

    fn traverse(
        &mut self,
        world: &World,
        id: EntityId,
        pass: RenderPass,
        time: f64,
        stats: &mut FrameStats,
    ) -> Result<(), RenderError> {
        let local = world
            .transform(id)
            .map(|t| t.to_matrix())
            .unwrap_or(Mat4::IDENTITY);
        self.stack.push(local);
        let depth = self.stack.depth();
        let result = self.visit(world, id, pass, time, stats, depth);
        self.stack.truncate(depth - 1);
        result
    }

    fn visit(
        &mut self,
        world: &World,
        id: EntityId,
        pass: RenderPass,
        time: f64,
        stats: &mut FrameStats,
        depth: usize,
    ) -> Result<(), RenderError> {
        let drawn = self.render_visual(world, id, pass, time, stats, depth)?;

        for &child in world.get_children(id) {
            self.traverse(world, child, pass, time, stats)?;
        }

        if drawn {
            if let Some(mut slot) = world.get_mut::<VisualSlot>(id) {
                let mut ctx = self.context(world, Some(id), pass, time, stats);
                slot.component_mut().post_render(&mut ctx);
            }
            self.check_stack(world, id, depth);
        }
        Ok(())
    }

    /// Run `pre_render` and `render` for the entity's visual if it belongs
    /// to `pass`. Returns whether the visual should get `post_render`.
    fn render_visual(
        &mut self,
        world: &World,
        id: EntityId,
        pass: RenderPass,
        time: f64,
        stats: &mut FrameStats,
        depth: usize,
    ) -> Result<bool, RenderError> {
        let Some(mut slot) = world.get_mut::<VisualSlot>(id) else {
            return Ok(false);
        };
        if !slot.is_active() || slot.pass() != pass {
            return Ok(false);
        }

        let outcome = {
            let mut ctx = self.context(world, Some(id), pass, time, stats);
            let component = slot.component_mut();
            match component.pre_render(&mut ctx) {
                Ok(true) => component.render(&mut ctx).map(|_| true),
                other => other,
            }
        };
        self.check_stack(world, id, depth);

        match outcome {
            Ok(true) => {
                stats.visuals_rendered += 1;
                Ok(true)
            }
            Ok(false) => {
                stats.visuals_skipped += 1;
                Ok(true)
            }
            Err(RenderError::DeviceLost) => Err(RenderError::DeviceLost),
            Err(RenderError::StaleHandle(what)) => {
                log::error!(
                    "{} on '{}' lost its {}, disabling it",
                    slot.name(),
                    world.get_name(id).unwrap_or_default(),
                    what
                );
                slot.disable();
                stats.visuals_failed += 1;
                Ok(false)
            }
            Err(e) => {
                log::error!(
                    "{} on '{}' skipped this frame: {}",
                    slot.name(),
                    world.get_name(id).unwrap_or_default(),
                    e
                );
                stats.visuals_failed += 1;
                Ok(true)
            }
        }
    }

    /// Drop transforms a visual pushed without popping
    fn check_stack(&mut self, world: &World, id: EntityId, depth: usize) {
        let current = self.stack.depth();
        if current > depth {
            log::warn!(
                "Visual on '{}' left {} transform(s) pushed",
                world.get_name(id).unwrap_or_default(),
                current - depth
            );
            self.stack.truncate(depth);
        } else if current < depth {
            log::warn!(
                "Visual on '{}' popped its own transform",
                world.get_name(id).unwrap_or_default()
            );
        }
    }

    fn context<'s>(
        &'s mut self,
        world: &'s World,
        owner: Option<EntityId>,
        pass: RenderPass,
        time: f64,
        stats: &'s mut FrameStats,
    ) -> RenderContext<'s> {
        RenderContext {
            world,
            owner,
            pass,
            time,
            device: &mut self.device,
            shaders: &self.shaders,
            materials: &mut self.materials,
            stack: &mut self.stack,
            lines: &mut self.lines,
            stats,
        }
    }

    /// Run `f` with a render context outside the frame traversal, for
    /// immediate-mode drawing. Returns `f`'s result and the draws it made.
    pub fn with_context<R>(
        &mut self,
        world: &World,
        owner: Option<EntityId>,
        pass: RenderPass,
        time: f64,
        f: impl FnOnce(&mut RenderContext<'_>) -> R,
    ) -> (R, FrameStats) {
        let mut stats = FrameStats::default();
        let depth = self.stack.depth();
        let result = {
            let mut ctx = self.context(world, owner, pass, time, &mut stats);
            f(&mut ctx)
        };
        self.stack.truncate(depth);
        (result, stats)
    }

    fn flush_lines(&mut self, stats: &mut FrameStats) -> Result<(), RenderError> {
        if self.lines.is_empty() {
            return Ok(());
        }
        let count = self.lines.line_count() as u32;
        match self.draw_lines() {
            Ok(drawn) => {
                if drawn {
                    stats.draw_calls += 1;
                    stats.lines += count;
                }
                Ok(())
            }
            Err(e) => {
                self.lines.clear();
                if e.is_device_lost() {
                    return Err(e);
                }
                log::error!("Dropped {} debug lines: {}", count, e);
                Ok(())
            }
        }
    }

    fn draw_lines(&mut self) -> Result<bool, RenderError> {
        let material = self.materials.get_mut(self.line_material)?;
        material.set_vs_constant_buffer(
            &mut self.device,
            VertexSlot::Model.index(),
            &MatrixConstants::new(Mat4::IDENTITY),
        )?;
        material.bind(&mut self.device, &self.shaders)?;
        self.lines.flush(&mut self.device)
    }

    /// Queue a world-space debug line for this frame's line pass
    pub fn submit_line(&mut self, from: Vec3, to: Vec3) {
        self.lines.submit_line(from, to);
    }

    pub fn pending_lines(&self) -> usize {
        self.lines.line_count()
    }

    pub fn push_matrix(&mut self, local: Mat4) {
        self.stack.push(local);
    }

    pub fn push_matrix_override(&mut self, matrix: Mat4) {
        self.stack.push_override(matrix);
    }

    pub fn pop_matrix(&mut self) {
        self.stack.pop();
    }

    pub fn current_matrix(&self) -> Mat4 {
        self.stack.current()
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.depth()
    }

    /// Look through the camera on `id`
    pub fn set_camera(&mut self, world: &World, id: EntityId) -> cinder_core::Result<()> {
        self.view.set_camera(world, id)
    }

    /// Go back to the default camera
    pub fn restore_camera(&mut self) {
        self.view.restore_camera();
    }

    pub fn active_camera(&self) -> Option<EntityId> {
        self.view.active()
    }

    pub fn enable_wireframe_rasterizer(&mut self) {
        self.rasterizer = RasterizerMode::Wireframe;
    }

    pub fn reset_default_rasterizer(&mut self) {
        self.rasterizer = RasterizerMode::Solid;
    }

    pub fn rasterizer(&self) -> RasterizerMode {
        self.rasterizer
    }

    pub fn set_editor_pass_enabled(&mut self, enabled: bool) {
        self.editor_pass = enabled;
    }

    pub fn is_editor_pass_enabled(&self) -> bool {
        self.editor_pass
    }

    /// Reset the device and rebuild everything that lived on it.
    ///
    /// Shaders are recreated from their descriptors; constant buffers and
    /// line buffers are dropped and recreated on next use. Vertex, index and
    /// texture data re-upload lazily from their CPU copies.
    pub fn recover_lost_device(&mut self) -> Result<(), RenderError> {
        log::warn!("Recovering from graphics device loss");
        self.device.reset()?;
        self.shaders.recreate_all(&mut self.device)?;
        self.materials.invalidate_all();
        self.vs_frame.invalidate();
        self.ps_frame.invalidate();
        self.lines.clear();
        self.lines.invalidate();
        self.stack.reset();
        log::info!(
            "Graphics device recovered (generation {})",
            self.device.generation()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffers::{unit_quad, IndexBuffer, Vertex, VertexBuffer};
    use crate::camera::Camera;
    use crate::headless::RecordingDevice;
    use crate::visuals::{MeshConfig, MeshVisual};
    use crate::visual::VisualComponent;
    use cinder_core::{CinderError, Transform};
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<String>>>;

    /// Records its callbacks and optionally draws a quad
    struct Tracer {
        label: &'static str,
        pass: RenderPass,
        log: Log,
        draw: bool,
        skip: bool,
        fail_setup: bool,
        fail_render: bool,
        leak_push: bool,
        mesh: (VertexBuffer<Vertex>, IndexBuffer),
        material: Option<MaterialId>,
        seen_matrix: Arc<Mutex<Option<Mat4>>>,
    }

    impl Tracer {
        fn new(label: &'static str, log: &Log) -> Self {
            Self {
                label,
                pass: RenderPass::Main,
                log: log.clone(),
                draw: false,
                skip: false,
                fail_setup: false,
                fail_render: false,
                leak_push: false,
                mesh: unit_quad(),
                material: None,
                seen_matrix: Arc::new(Mutex::new(None)),
            }
        }

        fn record(&self, event: &str) {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.label, event));
        }
    }

    impl VisualComponent for Tracer {
        fn name(&self) -> &'static str {
            "tracer"
        }

        fn default_pass(&self) -> RenderPass {
            self.pass
        }

        fn setup(&mut self, ctx: &mut SetupContext<'_>) -> cinder_core::Result<()> {
            self.record("setup");
            if self.fail_setup {
                return Err(CinderError::Setup("tracer refused".into()));
            }
            self.material = Some(
                ctx.materials
                    .get_or_insert_with("tracer", || Material::basic("tracer", Color::GREEN)),
            );
            Ok(())
        }

        fn pre_render(&mut self, _ctx: &mut RenderContext<'_>) -> Result<bool, RenderError> {
            self.record("pre");
            Ok(!self.skip)
        }

        fn render(&mut self, ctx: &mut RenderContext<'_>) -> Result<(), RenderError> {
            self.record("render");
            *self.seen_matrix.lock().unwrap() = Some(ctx.current_matrix());
            if self.fail_render {
                return Err(RenderError::BufferCreation("tracer".into()));
            }
            if self.leak_push {
                ctx.push_matrix(Mat4::IDENTITY);
            }
            if self.draw {
                let material = self.material.unwrap();
                ctx.set_model_matrix(material)?;
                let (vb, ib) = &mut self.mesh;
                ctx.draw(vb, ib, material)?;
            }
            Ok(())
        }

        fn post_render(&mut self, _ctx: &mut RenderContext<'_>) {
            self.record("post");
        }

        fn to_toml(&self) -> toml::Value {
            toml::Value::Table(toml::map::Map::new())
        }
    }

    fn system() -> RenderSystem<RecordingDevice> {
        RenderSystem::new(RecordingDevice::new(), &RendererConfig::default()).unwrap()
    }

    fn events(log: &Log) -> Vec<String> {
        std::mem::take(&mut *log.lock().unwrap())
    }

    #[test]
    fn test_depth_first_pre_render_children_post() {
        let log = Log::default();
        let mut world = World::new();
        let parent = world.spawn("parent").unwrap();
        let child = world.spawn("child").unwrap();
        world.set_parent(child, parent).unwrap();
        world.insert(parent, VisualSlot::new(Tracer::new("p", &log))).unwrap();
        world.insert(child, VisualSlot::new(Tracer::new("c", &log))).unwrap();

        let mut renderer = system();
        let stats = renderer.render(&world, 0.0).unwrap();

        assert_eq!(
            events(&log),
            vec![
                "p:setup", "c:setup", "p:pre", "p:render", "c:pre", "c:render", "c:post",
                "p:post"
            ]
        );
        assert_eq!(stats.visuals_rendered, 2);
        assert_eq!(stats.passes, 2);
        assert_eq!(renderer.stack_depth(), 0);
    }

    #[test]
    fn test_child_sees_concatenated_transform() {
        let log = Log::default();
        let mut world = World::new();
        let parent = world.spawn("parent").unwrap();
        let child = world.spawn("child").unwrap();
        world.set_parent(child, parent).unwrap();
        world
            .set_transform(parent, Transform::from_position(Vec3::new(1.0, 0.0, 0.0)))
            .unwrap();
        world
            .set_transform(child, Transform::from_position(Vec3::new(0.0, 2.0, 0.0)))
            .unwrap();

        let tracer = Tracer::new("c", &log);
        let seen = tracer.seen_matrix.clone();
        world.insert(child, VisualSlot::new(tracer)).unwrap();

        system().render(&world, 0.0).unwrap();
        let m = seen.lock().unwrap().unwrap();
        let origin = m.transform_point3(Vec3::ZERO);
        assert!((origin - Vec3::new(1.0, 2.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_editor_pass_runs_only_when_enabled() {
        let log = Log::default();
        let mut world = World::new();
        let e = world.spawn("overlay").unwrap();
        let mut tracer = Tracer::new("e", &log);
        tracer.pass = RenderPass::Editor;
        world.insert(e, VisualSlot::new(tracer)).unwrap();

        let mut renderer = system();
        renderer.render(&world, 0.0).unwrap();
        assert_eq!(events(&log), vec!["e:setup"]);

        renderer.set_editor_pass_enabled(true);
        let stats = renderer.render(&world, 0.0).unwrap();
        assert_eq!(events(&log), vec!["e:pre", "e:render", "e:post"]);
        assert_eq!(stats.passes, 3);
    }

    #[test]
    fn test_pre_render_false_skips_render_but_not_post() {
        let log = Log::default();
        let mut world = World::new();
        let e = world.spawn("quiet").unwrap();
        let mut tracer = Tracer::new("q", &log);
        tracer.skip = true;
        world.insert(e, VisualSlot::new(tracer)).unwrap();

        let stats = system().render(&world, 0.0).unwrap();
        assert_eq!(events(&log), vec!["q:setup", "q:pre", "q:post"]);
        assert_eq!(stats.visuals_skipped, 1);
    }

    #[test]
    fn test_failed_setup_disables_until_reinitialized() {
        let log = Log::default();
        let mut world = World::new();
        let e = world.spawn("broken").unwrap();
        let mut tracer = Tracer::new("b", &log);
        tracer.fail_setup = true;
        world.insert(e, VisualSlot::new(tracer)).unwrap();

        let mut renderer = system();
        renderer.render(&world, 0.0).unwrap();
        renderer.render(&world, 0.0).unwrap();
        assert_eq!(events(&log), vec!["b:setup"]);
        assert_eq!(
            world.get::<VisualSlot>(e).unwrap().state(),
            SlotState::Disabled
        );

        world.get_mut::<VisualSlot>(e).unwrap().reinitialize();
        renderer.render(&world, 0.0).unwrap();
        assert_eq!(events(&log), vec!["b:setup"]);
    }

    #[test]
    fn test_render_error_skips_only_that_visual() {
        let log = Log::default();
        let mut world = World::new();
        let bad = world.spawn("bad").unwrap();
        let good = world.spawn("good").unwrap();
        let mut failing = Tracer::new("bad", &log);
        failing.fail_render = true;
        world.insert(bad, VisualSlot::new(failing)).unwrap();
        let mut drawing = Tracer::new("good", &log);
        drawing.draw = true;
        world.insert(good, VisualSlot::new(drawing)).unwrap();

        let mut renderer = system();
        let stats = renderer.render(&world, 0.0).unwrap();
        assert_eq!(stats.visuals_failed, 1);
        assert_eq!(stats.visuals_rendered, 1);
        assert_eq!(stats.draw_calls, 1);
        assert_eq!(renderer.device().draws().len(), 1);
        assert!(events(&log).contains(&"bad:post".to_string()));
    }

    #[test]
    fn test_leaked_push_is_truncated() {
        let log = Log::default();
        let mut world = World::new();
        let e = world.spawn("leaky").unwrap();
        let sibling = world.spawn("sibling").unwrap();
        let mut leaky = Tracer::new("l", &log);
        leaky.leak_push = true;
        world.insert(e, VisualSlot::new(leaky)).unwrap();
        world
            .set_transform(e, Transform::from_position(Vec3::X))
            .unwrap();
        let tracer = Tracer::new("s", &log);
        let seen = tracer.seen_matrix.clone();
        world.insert(sibling, VisualSlot::new(tracer)).unwrap();

        let mut renderer = system();
        renderer.render(&world, 0.0).unwrap();
        assert_eq!(renderer.stack_depth(), 0);
        assert_eq!(seen.lock().unwrap().unwrap(), Mat4::IDENTITY);
    }

    #[test]
    fn test_wireframe_applies_to_main_pass_only() {
        let log = Log::default();
        let mut world = World::new();
        let main = world.spawn("main").unwrap();
        let editor = world.spawn("editor").unwrap();
        let mut a = Tracer::new("a", &log);
        a.draw = true;
        world.insert(main, VisualSlot::new(a)).unwrap();
        let mut b = Tracer::new("b", &log);
        b.draw = true;
        world
            .insert(editor, VisualSlot::new(b).with_pass(RenderPass::Editor))
            .unwrap();

        let mut renderer = system();
        renderer.set_editor_pass_enabled(true);
        renderer.enable_wireframe_rasterizer();
        renderer.render(&world, 0.0).unwrap();

        let draws = renderer.device().draws();
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].rasterizer, RasterizerMode::Wireframe);
        assert_eq!(draws[1].rasterizer, RasterizerMode::Solid);

        renderer.reset_default_rasterizer();
        renderer.render(&world, 0.0).unwrap();
        assert_eq!(renderer.device().draws()[0].rasterizer, RasterizerMode::Solid);
    }

    #[test]
    fn test_lines_flush_in_one_line_list_draw() {
        let world = World::new();
        let mut renderer = system();
        renderer.submit_line(Vec3::ZERO, Vec3::X);
        renderer.submit_line(Vec3::ZERO, Vec3::Y);

        let stats = renderer.render(&world, 0.0).unwrap();
        assert_eq!(stats.lines, 2);
        assert_eq!(stats.draw_calls, 1);
        assert_eq!(renderer.pending_lines(), 0);

        let draws = renderer.device().draws();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].topology, PrimitiveTopology::LineList);
        assert_eq!(draws[0].index_count, 4);
        let model: MatrixConstants = draws[0].vs_constant(VertexSlot::Model.index()).unwrap();
        assert_eq!(model.to_mat4(), Mat4::IDENTITY);

        let stats = renderer.render(&world, 0.0).unwrap();
        assert_eq!(stats.draw_calls, 0);
    }

    #[test]
    fn test_draws_see_view_and_projection() {
        let log = Log::default();
        let mut world = World::new();
        let e = world.spawn("quad").unwrap();
        let mut tracer = Tracer::new("q", &log);
        tracer.draw = true;
        world.insert(e, VisualSlot::new(tracer)).unwrap();

        let mut renderer = system();
        renderer.render(&world, 0.0).unwrap();
        let draw = &renderer.device().draws()[0];
        let view: MatrixConstants = draw.vs_constant(VertexSlot::View.index()).unwrap();
        let expected = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y);
        assert!(view.to_mat4().abs_diff_eq(expected, 1e-5));
        assert!(draw.vs_constant::<MatrixConstants>(VertexSlot::Projection.index()).is_some());
    }

    #[test]
    fn test_device_loss_propagates_and_recovers() {
        let log = Log::default();
        let mut world = World::new();
        let e = world.spawn("quad").unwrap();
        let mut tracer = Tracer::new("q", &log);
        tracer.draw = true;
        world.insert(e, VisualSlot::new(tracer)).unwrap();

        let mut renderer = system();
        renderer.render(&world, 0.0).unwrap();

        renderer.device_mut().simulate_device_loss();
        let err = renderer.render(&world, 0.1).unwrap_err();
        assert!(err.is_device_lost());

        renderer.recover_lost_device().unwrap();
        let stats = renderer.render(&world, 0.2).unwrap();
        assert_eq!(stats.draw_calls, 1);
        assert_eq!(renderer.device().stats().resets, 1);
        assert_eq!(renderer.device().stats().programs_created, 6);
    }

    #[test]
    fn test_with_context_draws_immediately() {
        let world = World::new();
        let mut renderer = system();
        let material = renderer
            .materials_mut()
            .insert(Material::basic("immediate", Color::RED));
        let (mut vb, mut ib) = unit_quad();

        let (result, stats) = renderer.with_context(&world, None, RenderPass::Main, 0.0, |ctx| {
            ctx.with_matrix_override(Mat4::from_scale(Vec3::splat(2.0)), |ctx| {
                ctx.set_model_matrix(material)?;
                ctx.draw(&mut vb, &mut ib, material)
            })
        });
        result.unwrap();
        assert_eq!(stats.draw_calls, 1);
        assert_eq!(renderer.stack_depth(), 0);
    }

    #[test]
    fn test_despawn_releases_mesh_buffers() {
        let mut world = World::new();
        let mut renderer = system();
        renderer.render(&world, 0.0).unwrap();
        let baseline = renderer.device().live_buffers();

        for i in 0..10 {
            let e = world.spawn(format!("mesh{}", i)).unwrap();
            world
                .insert(e, VisualSlot::new(MeshVisual::new(MeshConfig::default())))
                .unwrap();
            assert_eq!(renderer.render(&world, 0.0).unwrap().draw_calls, 1);
            renderer.despawn(&mut world, e).unwrap();
        }

        // Only the shared white material keeps its two constant buffers
        assert_eq!(renderer.device().live_buffers(), baseline + 2);
        assert_eq!(renderer.device().stats().buffers_released, 20);
        assert_eq!(renderer.materials().len(), 2);
        assert_eq!(world.entity_count(), 0);
    }

    #[test]
    fn test_removed_visual_sets_up_again() {
        let log = Log::default();
        let mut world = World::new();
        let e = world.spawn("quad").unwrap();
        let mut tracer = Tracer::new("q", &log);
        tracer.draw = true;
        world.insert(e, VisualSlot::new(tracer)).unwrap();

        let mut renderer = system();
        renderer.render(&world, 0.0).unwrap();
        let slot = renderer.remove_visual(&mut world, e).unwrap();
        assert_eq!(slot.state(), SlotState::Pending);
        assert_eq!(renderer.render(&world, 0.1).unwrap().draw_calls, 0);
        assert!(renderer.remove_visual(&mut world, e).is_none());

        world.insert(e, slot).unwrap();
        events(&log);
        assert_eq!(renderer.render(&world, 0.2).unwrap().draw_calls, 1);
        assert_eq!(events(&log)[0], "q:setup");
    }

    #[test]
    fn test_despawn_active_camera_restores_default() {
        let mut world = World::new();
        let eye = world.spawn("eye").unwrap();
        world.insert(eye, Camera::default()).unwrap();

        let mut renderer = system();
        renderer.set_camera(&world, eye).unwrap();
        renderer.despawn(&mut world, eye).unwrap();
        assert_eq!(renderer.active_camera(), None);
        assert!(matches!(
            renderer.despawn(&mut world, eye),
            Err(CinderError::EntityNotFound(_))
        ));
    }

    #[test]
    fn test_oversized_line_capacity_is_rejected() {
        let config = RendererConfig {
            line_capacity: 4_000_000_000_000_000_000,
            ..RendererConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CinderError::Config(_))
        ));
        assert!(matches!(
            RenderSystem::new(RecordingDevice::new(), &config).err(),
            Some(RenderError::InvalidConfig(_))
        ));
        assert!(RendererConfig::default().validate().is_ok());
    }
}
