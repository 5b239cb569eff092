//! Stock visuals: colored meshes and the editor grid

use crate::buffers::{unit_cube, unit_quad, IndexBuffer, Vertex, VertexBuffer};
use crate::context::RenderContext;
use crate::device::GraphicsDevice;
use crate::error::RenderError;
use crate::material::{Material, MaterialId};
use crate::render_pass::RenderPass;
use crate::visual::{SetupContext, VisualComponent};
use cinder_core::{CinderError, Color};
use glam::Vec3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeshShape {
    #[default]
    Cube,
    Quad,
}

/// Scene-file form of a [`MeshVisual`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshConfig {
    pub shape: MeshShape,
    pub color: Color,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            shape: MeshShape::Cube,
            color: Color::WHITE,
        }
    }
}

/// A unit mesh drawn with a solid-color material
pub struct MeshVisual {
    config: MeshConfig,
    vertices: VertexBuffer<Vertex>,
    indices: IndexBuffer,
    material: Option<MaterialId>,
}

impl MeshVisual {
    pub const NAME: &'static str = "mesh";

    pub fn new(config: MeshConfig) -> Self {
        let (vertices, indices) = match config.shape {
            MeshShape::Cube => unit_cube(),
            MeshShape::Quad => unit_quad(),
        };
        Self {
            config,
            vertices,
            indices,
            material: None,
        }
    }

    pub fn from_toml(value: &toml::Value) -> cinder_core::Result<Self> {
        let config: MeshConfig = value
            .clone()
            .try_into()
            .map_err(|e| CinderError::Config(format!("mesh: {}", e)))?;
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &MeshConfig {
        &self.config
    }

    /// Materials are shared between meshes of the same color
    fn material_name(color: &Color) -> String {
        format!(
            "basic/{:.3}/{:.3}/{:.3}/{:.3}",
            color.r, color.g, color.b, color.a
        )
    }
}

impl VisualComponent for MeshVisual {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn setup(&mut self, ctx: &mut SetupContext<'_>) -> cinder_core::Result<()> {
        let color = self.config.color;
        let name = Self::material_name(&color);
        self.material = Some(
            ctx.materials
                .get_or_insert_with(&name, || Material::basic(name.clone(), color)),
        );
        Ok(())
    }

    fn render(&mut self, ctx: &mut RenderContext<'_>) -> Result<(), RenderError> {
        let Some(material) = self.material else {
            return Ok(());
        };
        ctx.set_model_matrix(material)?;
        ctx.draw(&mut self.vertices, &mut self.indices, material)
    }

    /// The shared material stays in the library for other meshes
    fn release(&mut self, device: &mut dyn GraphicsDevice) {
        self.vertices.release(device);
        self.indices.release(device);
        self.material = None;
    }

    fn to_toml(&self) -> toml::Value {
        toml::Value::try_from(self.config)
            .unwrap_or_else(|_| toml::Value::Table(toml::map::Map::new()))
    }
}

/// Scene-file form of a [`GridVisual`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Edge length of the grid
    pub size: f32,
    /// Cells along each edge
    pub divisions: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            size: 40.0,
            divisions: 40,
        }
    }
}

/// Ground grid in the owner's XZ plane, drawn as debug lines in the editor pass
pub struct GridVisual {
    config: GridConfig,
}

impl GridVisual {
    pub const NAME: &'static str = "grid";

    pub fn new(config: GridConfig) -> Self {
        Self { config }
    }

    pub fn from_toml(value: &toml::Value) -> cinder_core::Result<Self> {
        let config: GridConfig = value
            .clone()
            .try_into()
            .map_err(|e| CinderError::Config(format!("grid: {}", e)))?;
        if config.divisions == 0 {
            return Err(CinderError::ValueOutOfRange {
                field: "grid.divisions".into(),
                min: 1.0,
                max: f64::from(u32::MAX),
                value: 0.0,
            });
        }
        Ok(Self::new(config))
    }

    pub fn line_count(&self) -> usize {
        2 * (self.config.divisions as usize + 1)
    }
}

impl VisualComponent for GridVisual {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn default_pass(&self) -> RenderPass {
        RenderPass::Editor
    }

    fn setup(&mut self, _ctx: &mut SetupContext<'_>) -> cinder_core::Result<()> {
        Ok(())
    }

    fn render(&mut self, ctx: &mut RenderContext<'_>) -> Result<(), RenderError> {
        let model = ctx.current_matrix();
        let half = self.config.size / 2.0;
        let step = self.config.size / self.config.divisions.max(1) as f32;

        for i in 0..=self.config.divisions {
            let offset = -half + i as f32 * step;
            ctx.submit_line(
                model.transform_point3(Vec3::new(-half, 0.0, offset)),
                model.transform_point3(Vec3::new(half, 0.0, offset)),
            );
            ctx.submit_line(
                model.transform_point3(Vec3::new(offset, 0.0, -half)),
                model.transform_point3(Vec3::new(offset, 0.0, half)),
            );
        }
        Ok(())
    }

    fn to_toml(&self) -> toml::Value {
        toml::Value::try_from(self.config)
            .unwrap_or_else(|_| toml::Value::Table(toml::map::Map::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::PrimitiveTopology;
    use crate::headless::RecordingDevice;
    use crate::renderer::{RenderSystem, RendererConfig};
    use crate::visual::VisualSlot;
    use cinder_core::Transform;
    use cinder_ecs::World;

    fn renderer(editor: bool) -> RenderSystem<RecordingDevice> {
        let config = RendererConfig {
            editor_pass: editor,
            ..RendererConfig::default()
        };
        RenderSystem::new(RecordingDevice::new(), &config).unwrap()
    }

    #[test]
    fn test_meshes_share_material_by_color() {
        let mut world = World::new();
        for name in ["a", "b"] {
            let id = world.spawn(name).unwrap();
            let mesh = MeshVisual::new(MeshConfig {
                shape: MeshShape::Cube,
                color: Color::RED,
            });
            world.insert(id, VisualSlot::new(mesh)).unwrap();
        }

        let mut renderer = renderer(false);
        let stats = renderer.render(&world, 0.0).unwrap();
        assert_eq!(stats.draw_calls, 2);
        // debug-lines + one shared red material
        assert_eq!(renderer.materials().len(), 2);
        assert_eq!(renderer.device().draws()[0].index_count, 36);
    }

    #[test]
    fn test_mesh_config_from_toml() {
        let value: toml::Value = toml::from_str(
            r#"
            shape = "quad"
            color = { r = 0.0, g = 1.0, b = 0.0, a = 1.0 }
            "#,
        )
        .unwrap();
        let mesh = MeshVisual::from_toml(&value).unwrap();
        assert_eq!(mesh.config().shape, MeshShape::Quad);
        assert_eq!(mesh.config().color, Color::GREEN);
        assert_eq!(mesh.to_toml().get("shape").and_then(|v| v.as_str()), Some("quad"));
    }

    #[test]
    fn test_grid_draws_in_line_pass_when_editor_enabled() {
        let mut world = World::new();
        let id = world.spawn("grid").unwrap();
        world
            .set_transform(id, Transform::from_position(Vec3::new(0.0, -1.0, 0.0)))
            .unwrap();
        let grid = GridVisual::new(GridConfig {
            size: 2.0,
            divisions: 2,
        });
        world.insert(id, VisualSlot::new(grid)).unwrap();

        let mut hidden = renderer(false);
        assert_eq!(hidden.render(&world, 0.0).unwrap().lines, 0);

        let mut shown = renderer(true);
        let stats = shown.render(&world, 0.0).unwrap();
        assert_eq!(stats.lines, 6);
        let draw = &shown.device().draws()[0];
        assert_eq!(draw.topology, PrimitiveTopology::LineList);

        let data = shown.device().buffer_data(draw.vertex_buffer).unwrap();
        let first: [f32; 3] = bytemuck::pod_read_unaligned(&data[..12]);
        assert_eq!(first, [-1.0, -1.0, -1.0]);
    }

    #[test]
    fn test_grid_rejects_zero_divisions() {
        let value: toml::Value = toml::from_str("divisions = 0").unwrap();
        assert!(GridVisual::from_toml(&value).is_err());
    }
}
