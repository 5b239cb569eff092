//! Registry of the engine's shaders, keyed by [`ShaderKind`]

use crate::buffers::{DiffuseVertex, Vertex};
use crate::device::{GraphicsDevice, ShaderDesc};
use crate::error::RenderError;
use crate::shader::{Shader, ShaderKind};
use std::collections::BTreeMap;

/// Owns every shader for the lifetime of the render system
#[derive(Debug, Default)]
pub struct ShaderLibrary {
    shaders: BTreeMap<ShaderKind, Shader>,
}

impl ShaderLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Descriptor the engine uses for each stock shader
    pub fn default_desc(kind: ShaderKind) -> ShaderDesc {
        let (stem, layout) = match kind {
            ShaderKind::Default => ("basic", Vertex::layout()),
            ShaderKind::Diffuse => ("diffuse_texture", DiffuseVertex::layout()),
            ShaderKind::CpuParticles => ("cpu_particles", Vertex::layout()),
        };
        ShaderDesc {
            vertex_path: format!("shaders/{stem}_vertex.cso"),
            pixel_path: format!("shaders/{stem}_pixel.cso"),
            layout,
        }
    }

    /// Register a shader under `kind`.
    ///
    /// Registering a kind twice keeps the first shader and returns it.
    pub fn make_shader(
        &mut self,
        device: &mut dyn GraphicsDevice,
        kind: ShaderKind,
        desc: ShaderDesc,
    ) -> Result<&Shader, RenderError> {
        if self.shaders.contains_key(&kind) {
            log::warn!("Duplicate {} shader registered, keeping the existing one", kind);
            return self.get(kind);
        }
        let shader = Shader::new(kind, desc, device)?;
        Ok(self.shaders.entry(kind).or_insert(shader))
    }

    /// Build every stock shader; does nothing if already built
    pub fn make_shaders(&mut self, device: &mut dyn GraphicsDevice) -> Result<(), RenderError> {
        if !self.shaders.is_empty() {
            log::warn!("Shaders already constructed, ignoring make_shaders");
            return Ok(());
        }
        for kind in ShaderKind::ALL {
            self.make_shader(device, kind, Self::default_desc(kind))?;
        }
        log::debug!("Built {} shaders", self.shaders.len());
        Ok(())
    }

    pub fn get(&self, kind: ShaderKind) -> Result<&Shader, RenderError> {
        self.shaders
            .get(&kind)
            .ok_or_else(|| RenderError::UnknownShader(kind.to_string()))
    }

    /// Recreate every program from its descriptor after a device reset
    pub fn recreate_all(&mut self, device: &mut dyn GraphicsDevice) -> Result<(), RenderError> {
        for shader in self.shaders.values_mut() {
            shader.recreate(device)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.shaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shaders.is_empty()
    }
}
