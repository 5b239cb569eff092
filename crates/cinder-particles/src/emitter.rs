//! CPU particle emitter as a visual component

use crate::curves::{color_over_life, life_fraction, size_over_life};
use crate::particle::ParticlePool;
use crate::rand::ParticleRng;
use crate::template::{ParticleTemplate, ParticlesConfig};
use cinder_core::{CinderError, EntityId, Result, Transform};
use cinder_ecs::World;
use cinder_render::{
    unit_quad, ColorConstants, GraphicsDevice, IndexBuffer, Material, MaterialId, PixelSlot,
    RenderContext, RenderError, SetupContext, Vertex, VertexBuffer, VisualComponent,
};
use glam::{Mat4, Quat, Vec3};

/// Emits particles from its owner's world transform every frame and draws
/// each live particle as a camera-agnostic unit quad.
pub struct CpuParticlesVisual {
    template: ParticleTemplate,
    pool: ParticlePool,
    emit_rate: i32,
    rng: ParticleRng,
    owner: Option<EntityId>,
    material: Option<MaterialId>,
    quad_vertices: VertexBuffer<Vertex>,
    quad_indices: IndexBuffer,
    /// Frame time captured in the last `post_render`
    last_render_time: Option<f64>,
}

impl CpuParticlesVisual {
    pub const NAME: &'static str = "cpu_particles";

    pub fn new(config: ParticlesConfig) -> Result<Self> {
        let (quad_vertices, quad_indices) = unit_quad();
        Ok(Self {
            template: config.template,
            pool: ParticlePool::new(config.pool_size)?,
            emit_rate: config.emit_rate,
            rng: ParticleRng::default(),
            owner: None,
            material: None,
            quad_vertices,
            quad_indices,
            last_render_time: None,
        })
    }

    pub fn from_toml(value: &toml::Value) -> Result<Self> {
        Self::new(ParticlesConfig::from_toml(value)?)
    }

    pub fn config(&self) -> ParticlesConfig {
        ParticlesConfig {
            pool_size: self.pool.capacity(),
            emit_rate: self.emit_rate,
            template: self.template,
        }
    }

    pub fn template(&self) -> &ParticleTemplate {
        &self.template
    }

    pub fn set_template(&mut self, template: ParticleTemplate) {
        self.template = template;
    }

    pub fn emit_rate(&self) -> i32 {
        self.emit_rate
    }

    pub fn set_emit_rate(&mut self, emit_rate: i32) {
        self.emit_rate = emit_rate;
    }

    pub fn pool(&self) -> &ParticlePool {
        &self.pool
    }

    pub fn active_count(&self) -> usize {
        self.pool.active_count()
    }

    pub fn owner(&self) -> Option<EntityId> {
        self.owner
    }

    /// Particles emitted per frame: `emit_rate + 1`, none for negative rates
    pub fn emissions_per_frame(&self) -> usize {
        self.emit_rate.saturating_add(1).max(0) as usize
    }

    /// Emit one particle from `template` at the owner's current transform
    pub fn emit(
        &mut self,
        template: &ParticleTemplate,
        world: &World,
    ) -> std::result::Result<(), RenderError> {
        let (position, rotation) = self.emit_origin(world)?;
        self.pool.emit(template, position, rotation, &mut self.rng);
        Ok(())
    }

    /// Owner's world position and rotation
    fn emit_origin(&self, world: &World) -> std::result::Result<(Vec3, Quat), RenderError> {
        let owner = self
            .owner
            .ok_or_else(|| RenderError::StaleHandle("owner (not set up)".into()))?;
        if !world.has::<Transform>(owner) {
            return Err(RenderError::StaleHandle(format!("owner transform ({})", owner)));
        }
        let matrix = world
            .world_matrix(owner)
            .ok_or_else(|| RenderError::StaleHandle(format!("owner entity ({})", owner)))?;
        let (_, rotation, position) = matrix.to_scale_rotation_translation();
        Ok((position, rotation))
    }
}

impl VisualComponent for CpuParticlesVisual {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn setup(&mut self, ctx: &mut SetupContext<'_>) -> Result<()> {
        if !ctx.world.has::<Transform>(ctx.owner) {
            return Err(CinderError::ComponentNotFound(format!(
                "Transform on '{}' (required by {})",
                ctx.world.get_name(ctx.owner).unwrap_or_default(),
                Self::NAME
            )));
        }
        self.owner = Some(ctx.owner);
        self.rng = ParticleRng::new(0x9E37_79B9 ^ ctx.owner.raw() as u32);
        self.material = Some(ctx.materials.insert_owned(
            Material::cpu_particles(format!("{}/{}", Self::NAME, ctx.owner)),
            ctx.owner,
        ));
        Ok(())
    }

    fn pre_render(&mut self, ctx: &mut RenderContext<'_>) -> std::result::Result<bool, RenderError> {
        let (position, rotation) = self.emit_origin(ctx.world())?;
        for _ in 0..self.emissions_per_frame() {
            self.pool
                .emit(&self.template, position, rotation, &mut self.rng);
        }

        let delta = self
            .last_render_time
            .map(|last| (ctx.time() - last).max(0.0) as f32)
            .unwrap_or(0.0);
        self.pool.integrate(delta);
        Ok(true)
    }

    fn render(&mut self, ctx: &mut RenderContext<'_>) -> std::result::Result<(), RenderError> {
        let Some(material) = self.material else {
            return Ok(());
        };
        let vertices = &mut self.quad_vertices;
        let indices = &mut self.quad_indices;

        for particle in self.pool.active() {
            let Some(life) = life_fraction(particle.life_remaining, particle.life_time) else {
                continue;
            };
            let size = size_over_life(particle.size_begin, particle.size_end, life);
            let color = color_over_life(&particle.color_begin, &particle.color_end, life);
            let model = Mat4::from_scale_rotation_translation(
                Vec3::splat(size),
                particle.rotation,
                particle.position,
            );

            ctx.with_matrix_override(model, |ctx| {
                ctx.set_model_matrix(material)?;
                ctx.set_ps_constants(
                    material,
                    PixelSlot::Material.index(),
                    &ColorConstants {
                        color: color.to_array(),
                    },
                )?;
                ctx.draw(&mut *vertices, &mut *indices, material)
            })?;
        }
        Ok(())
    }

    fn post_render(&mut self, ctx: &mut RenderContext<'_>) {
        self.last_render_time = Some(ctx.time());
    }

    /// The per-owner material goes with the owner's registration
    fn release(&mut self, device: &mut dyn GraphicsDevice) {
        self.quad_vertices.release(device);
        self.quad_indices.release(device);
        self.material = None;
        self.pool.clear();
        self.last_render_time = None;
    }

    fn to_toml(&self) -> toml::Value {
        match self.config().to_toml() {
            Ok(value) => value,
            Err(e) => {
                log::error!("Failed to serialize {}: {}", Self::NAME, e);
                toml::Value::Table(toml::map::Map::new())
            }
        }
    }
}
