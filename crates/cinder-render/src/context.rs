//! Per-visual render context
//!
//! Lends the render system's shared state (device, transform stack,
//! materials, line batch) to a visual for the duration of one callback.

use crate::buffers::{IndexBuffer, VertexBuffer};
use crate::constant_buffer::{MatrixConstants, VertexSlot};
use crate::device::GraphicsDevice;
use crate::error::RenderError;
use crate::line_batch::LineBatch;
use crate::material::{Material, MaterialId, MaterialLibrary};
use crate::render_pass::RenderPass;
use crate::renderer::FrameStats;
use crate::shader_library::ShaderLibrary;
use crate::transform_stack::TransformStack;
use bytemuck::Pod;
use cinder_core::EntityId;
use cinder_ecs::World;
use glam::{Mat4, Vec3};

pub struct RenderContext<'a> {
    pub(crate) world: &'a World,
    pub(crate) owner: Option<EntityId>,
    pub(crate) pass: RenderPass,
    pub(crate) time: f64,
    pub(crate) device: &'a mut dyn GraphicsDevice,
    pub(crate) shaders: &'a ShaderLibrary,
    pub(crate) materials: &'a mut MaterialLibrary,
    pub(crate) stack: &'a mut TransformStack,
    pub(crate) lines: &'a mut LineBatch,
    pub(crate) stats: &'a mut FrameStats,
}

impl<'a> RenderContext<'a> {
    pub fn world(&self) -> &World {
        self.world
    }

    /// Entity whose visual is being drawn
    pub fn owner(&self) -> Option<EntityId> {
        self.owner
    }

    pub fn pass(&self) -> RenderPass {
        self.pass
    }

    /// Frame timestamp in seconds
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn device(&mut self) -> &mut dyn GraphicsDevice {
        &mut *self.device
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

    /// Run `f` with `matrix` pushed as an override; the push is always popped
    pub fn with_matrix_override<R>(&mut self, matrix: Mat4, f: impl FnOnce(&mut Self) -> R) -> R {
        self.stack.push_override(matrix);
        let result = f(self);
        self.stack.pop();
        result
    }

    pub fn material(&self, id: MaterialId) -> Result<&Material, RenderError> {
        self.materials.get(id)
    }

    pub fn material_mut(&mut self, id: MaterialId) -> Result<&mut Material, RenderError> {
        self.materials.get_mut(id)
    }

    /// Upload the top of the transform stack as `material`'s model matrix
    pub fn set_model_matrix(&mut self, material: MaterialId) -> Result<(), RenderError> {
        let model = MatrixConstants::new(self.stack.current());
        self.set_vs_constants(material, VertexSlot::Model.index(), &model)
    }

    pub fn set_vs_constants<T: Pod>(
        &mut self,
        material: MaterialId,
        slot: u32,
        data: &T,
    ) -> Result<(), RenderError> {
        self.materials
            .get_mut(material)?
            .set_vs_constant_buffer(&mut *self.device, slot, data)
    }

    pub fn set_ps_constants<T: Pod>(
        &mut self,
        material: MaterialId,
        slot: u32,
        data: &T,
    ) -> Result<(), RenderError> {
        self.materials
            .get_mut(material)?
            .set_ps_constant_buffer(&mut *self.device, slot, data)
    }

    /// Bind `material` and draw the indexed geometry
    pub fn draw<V: Pod>(
        &mut self,
        vertices: &mut VertexBuffer<V>,
        indices: &mut IndexBuffer,
        material: MaterialId,
    ) -> Result<(), RenderError> {
        let vb = vertices.ensure(&mut *self.device)?;
        let ib = indices.ensure(&mut *self.device)?;
        self.materials
            .get_mut(material)?
            .bind(&mut *self.device, self.shaders)?;
        self.device
            .draw_indexed(vb, vertices.stride(), ib, indices.len() as u32)?;
        self.stats.draw_calls += 1;
        Ok(())
    }

    /// Queue a debug line in world space for the line pass
    pub fn submit_line(&mut self, from: Vec3, to: Vec3) {
        self.lines.submit_line(from, to);
    }
}
