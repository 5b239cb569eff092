//! Shader programs and their per-kind capabilities

use crate::device::{
    DeviceBound, GraphicsDevice, ProgramHandle, SamplerHandle, ShaderDesc, TextureHandle,
};
use crate::error::RenderError;
use std::fmt;

/// Registry key for the engine's shaders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderKind {
    /// Position-only, solid color
    Default,
    /// Lit and textured
    Diffuse,
    /// Per-particle model matrix and color
    CpuParticles,
}

impl ShaderKind {
    pub const ALL: [ShaderKind; 3] = [
        ShaderKind::Default,
        ShaderKind::Diffuse,
        ShaderKind::CpuParticles,
    ];
}

impl fmt::Display for ShaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShaderKind::Default => "Default",
            ShaderKind::Diffuse => "Diffuse",
            ShaderKind::CpuParticles => "CpuParticles",
        };
        f.write_str(name)
    }
}

/// Kind-specific shader state
#[derive(Debug, Clone)]
pub enum ShaderVariant {
    Basic,
    Diffuse { sampler: DeviceBound<SamplerHandle> },
    CpuParticles,
}

impl ShaderVariant {
    fn for_kind(kind: ShaderKind) -> Self {
        match kind {
            ShaderKind::Default => ShaderVariant::Basic,
            ShaderKind::Diffuse => ShaderVariant::Diffuse {
                sampler: DeviceBound::empty(),
            },
            ShaderKind::CpuParticles => ShaderVariant::CpuParticles,
        }
    }
}

/// Texture slot used by textured shaders
pub const DIFFUSE_TEXTURE_SLOT: u32 = 0;

/// A compiled program plus the descriptor it was built from
#[derive(Debug, Clone)]
pub struct Shader {
    kind: ShaderKind,
    desc: ShaderDesc,
    program: DeviceBound<ProgramHandle>,
    variant: ShaderVariant,
}

impl Shader {
    pub(crate) fn new(
        kind: ShaderKind,
        desc: ShaderDesc,
        device: &mut dyn GraphicsDevice,
    ) -> Result<Self, RenderError> {
        let mut shader = Self {
            kind,
            desc,
            program: DeviceBound::empty(),
            variant: ShaderVariant::for_kind(kind),
        };
        shader.recreate(device)?;
        Ok(shader)
    }

    /// Rebuild the program (and sampler) on the current device generation
    pub(crate) fn recreate(&mut self, device: &mut dyn GraphicsDevice) -> Result<(), RenderError> {
        let program = device.create_program(&self.desc)?;
        self.program.set(program, &*device);
        if let ShaderVariant::Diffuse { sampler } = &mut self.variant {
            let handle = device.create_sampler()?;
            sampler.set(handle, &*device);
        }
        Ok(())
    }

    pub fn kind(&self) -> ShaderKind {
        self.kind
    }

    pub fn desc(&self) -> &ShaderDesc {
        &self.desc
    }

    pub fn variant(&self) -> &ShaderVariant {
        &self.variant
    }

    pub fn program(&self, device: &dyn GraphicsDevice) -> Option<ProgramHandle> {
        self.program.get(device)
    }

    pub fn supports_textures(&self) -> bool {
        matches!(self.variant, ShaderVariant::Diffuse { .. })
    }

    /// Bind the program and any fixed per-kind state
    pub fn bind(&self, device: &mut dyn GraphicsDevice) -> Result<(), RenderError> {
        let program = self.program.get(&*device).ok_or_else(|| {
            RenderError::InvalidHandle(format!("{} shader program is from a lost device", self.kind))
        })?;
        device.bind_program(program);
        if let ShaderVariant::Diffuse { sampler } = &self.variant {
            if let Some(sampler) = sampler.get(&*device) {
                device.bind_sampler(DIFFUSE_TEXTURE_SLOT, sampler);
            }
        }
        Ok(())
    }

    /// Bind a texture; only textured shaders accept one
    pub fn bind_texture(
        &self,
        device: &mut dyn GraphicsDevice,
        texture: TextureHandle,
    ) -> Result<(), RenderError> {
        match &self.variant {
            ShaderVariant::Diffuse { .. } => {
                device.bind_texture(DIFFUSE_TEXTURE_SLOT, texture);
                Ok(())
            }
            _ => Err(RenderError::UnsupportedCapability {
                shader: self.kind.to_string(),
                capability: "textures",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffers::Vertex;
    use crate::device::TextureDesc;
    use crate::headless::RecordingDevice;

    fn desc(name: &str) -> ShaderDesc {
        ShaderDesc {
            vertex_path: format!("{name}.vs"),
            pixel_path: format!("{name}.ps"),
            layout: Vertex::layout(),
        }
    }

    #[test]
    fn test_diffuse_binds_texture_others_refuse() {
        let mut device = RecordingDevice::new();
        let texture = device.create_texture(&TextureDesc::solid([0; 4])).unwrap();

        let diffuse = Shader::new(ShaderKind::Diffuse, desc("diffuse"), &mut device).unwrap();
        diffuse.bind(&mut device).unwrap();
        diffuse.bind_texture(&mut device, texture).unwrap();
        assert_eq!(device.bound_texture(DIFFUSE_TEXTURE_SLOT), Some(texture));
        assert!(device.bound_sampler(DIFFUSE_TEXTURE_SLOT).is_some());

        let basic = Shader::new(ShaderKind::Default, desc("basic"), &mut device).unwrap();
        let err = basic.bind_texture(&mut device, texture).unwrap_err();
        assert!(matches!(
            err,
            RenderError::UnsupportedCapability {
                capability: "textures",
                ..
            }
        ));
        assert!(!basic.supports_textures());
    }

    #[test]
    fn test_bind_after_reset_needs_recreate() {
        let mut device = RecordingDevice::new();
        let mut shader = Shader::new(ShaderKind::Default, desc("basic"), &mut device).unwrap();

        device.reset().unwrap();
        assert!(shader.bind(&mut device).is_err());

        shader.recreate(&mut device).unwrap();
        shader.bind(&mut device).unwrap();
        assert_eq!(device.bound_program(), shader.program(&device));
    }
}
