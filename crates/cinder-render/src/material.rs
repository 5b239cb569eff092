//! Materials: a shader plus the constant buffers and textures it draws with

use crate::buffers::Texture;
use crate::constant_buffer::{ColorConstants, ConstantBufferCache, PixelSlot};
use crate::device::{GraphicsDevice, ShaderStage};
use crate::error::RenderError;
use crate::shader::ShaderKind;
use crate::shader_library::ShaderLibrary;
use bytemuck::Pod;
use cinder_core::{Color, EntityId};
use std::collections::HashMap;

/// Index of a material in a [`MaterialLibrary`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialId(pub usize);

/// Per-kind material parameters
#[derive(Debug, Clone)]
pub enum MaterialKind {
    Basic { color: Color },
    Diffuse { color: Color, texture: Option<Texture> },
    CpuParticles,
}

#[derive(Debug, Clone)]
pub struct Material {
    name: String,
    kind: MaterialKind,
    vs: ConstantBufferCache,
    ps: ConstantBufferCache,
}

impl Material {
    pub fn new(name: impl Into<String>, kind: MaterialKind) -> Self {
        Self {
            name: name.into(),
            kind,
            vs: ConstantBufferCache::new(ShaderStage::Vertex),
            ps: ConstantBufferCache::new(ShaderStage::Pixel),
        }
    }

    pub fn basic(name: impl Into<String>, color: Color) -> Self {
        Self::new(name, MaterialKind::Basic { color })
    }

    pub fn diffuse(name: impl Into<String>, color: Color, texture: Option<Texture>) -> Self {
        Self::new(name, MaterialKind::Diffuse { color, texture })
    }

    pub fn cpu_particles(name: impl Into<String>) -> Self {
        Self::new(name, MaterialKind::CpuParticles)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &'static str {
        match self.kind {
            MaterialKind::Basic { .. } => "BasicMaterial",
            MaterialKind::Diffuse { .. } => "DiffuseMaterial",
            MaterialKind::CpuParticles => "CPUParticlesMaterial",
        }
    }

    pub fn kind(&self) -> &MaterialKind {
        &self.kind
    }

    pub fn shader_kind(&self) -> ShaderKind {
        match self.kind {
            MaterialKind::Basic { .. } => ShaderKind::Default,
            MaterialKind::Diffuse { .. } => ShaderKind::Diffuse,
            MaterialKind::CpuParticles => ShaderKind::CpuParticles,
        }
    }

    pub fn color(&self) -> Option<Color> {
        match &self.kind {
            MaterialKind::Basic { color } | MaterialKind::Diffuse { color, .. } => Some(*color),
            MaterialKind::CpuParticles => None,
        }
    }

    /// Upload `data` to the vertex-stage constant buffer at `slot`
    pub fn set_vs_constant_buffer<T: Pod>(
        &mut self,
        device: &mut dyn GraphicsDevice,
        slot: u32,
        data: &T,
    ) -> Result<(), RenderError> {
        self.vs.upload(device, slot, data)
    }

    /// Upload `data` to the pixel-stage constant buffer at `slot`
    pub fn set_ps_constant_buffer<T: Pod>(
        &mut self,
        device: &mut dyn GraphicsDevice,
        slot: u32,
        data: &T,
    ) -> Result<(), RenderError> {
        self.ps.upload(device, slot, data)
    }

    /// Bind the shader, the material's own parameters, and every cached
    /// constant buffer. Safe to call any number of times per frame.
    pub fn bind(
        &mut self,
        device: &mut dyn GraphicsDevice,
        shaders: &ShaderLibrary,
    ) -> Result<(), RenderError> {
        let shader = shaders.get(self.shader_kind())?;
        shader.bind(device)?;

        match &mut self.kind {
            MaterialKind::Basic { color } => {
                let constants = ColorConstants {
                    color: color.to_array(),
                };
                self.ps.upload(device, PixelSlot::Material.index(), &constants)?;
            }
            MaterialKind::Diffuse { color, texture } => {
                let constants = ColorConstants {
                    color: color.to_array(),
                };
                self.ps.upload(device, PixelSlot::Material.index(), &constants)?;
                if let Some(texture) = texture {
                    let handle = texture.ensure(device)?;
                    shader.bind_texture(device, handle)?;
                }
            }
            MaterialKind::CpuParticles => {}
        }

        self.vs.bind_all(device);
        self.ps.bind_all(device);
        Ok(())
    }

    /// Constant buffers allocated across both stages
    pub fn allocated_buffers(&self) -> usize {
        self.vs.allocated() + self.ps.allocated()
    }

    /// Release the material's constant buffers on `device`
    pub fn release(&mut self, device: &mut dyn GraphicsDevice) {
        self.vs.release(device);
        self.ps.release(device);
    }

    /// Forget every device resource (after a device reset)
    pub fn invalidate(&mut self) {
        self.vs.invalidate();
        self.ps.invalidate();
    }
}

/// Arena of materials shared by name
///
/// Materials registered for an owner entity are released together once the
/// owner goes away; freed ids are handed out again to later materials.
#[derive(Debug, Default)]
pub struct MaterialLibrary {
    materials: Vec<Option<Material>>,
    free: Vec<usize>,
    by_name: HashMap<String, MaterialId>,
    owned: HashMap<EntityId, Vec<MaterialId>>,
}

impl MaterialLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a material; a material with the same name is returned instead
    pub fn insert(&mut self, material: Material) -> MaterialId {
        if let Some(id) = self.by_name.get(material.name()) {
            log::debug!("Material '{}' already exists, sharing it", material.name());
            return *id;
        }
        let name = material.name().to_string();
        let id = match self.free.pop() {
            Some(index) => {
                self.materials[index] = Some(material);
                MaterialId(index)
            }
            None => {
                self.materials.push(Some(material));
                MaterialId(self.materials.len() - 1)
            }
        };
        self.by_name.insert(name, id);
        id
    }

    /// Add a material that lives only as long as `owner`
    pub fn insert_owned(&mut self, material: Material, owner: EntityId) -> MaterialId {
        let id = self.insert(material);
        let ids = self.owned.entry(owner).or_default();
        if !ids.contains(&id) {
            ids.push(id);
        }
        id
    }

    /// Look up `name`, building it with `make` on first use
    pub fn get_or_insert_with(
        &mut self,
        name: &str,
        make: impl FnOnce() -> Material,
    ) -> MaterialId {
        match self.by_name.get(name) {
            Some(id) => *id,
            None => self.insert(make()),
        }
    }

    pub fn find(&self, name: &str) -> Option<MaterialId> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, id: MaterialId) -> Result<&Material, RenderError> {
        self.materials
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(RenderError::UnknownMaterial(id.0))
    }

    pub fn get_mut(&mut self, id: MaterialId) -> Result<&mut Material, RenderError> {
        self.materials
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(RenderError::UnknownMaterial(id.0))
    }

    /// Remove a material and release its constant buffers
    pub fn remove(&mut self, device: &mut dyn GraphicsDevice, id: MaterialId) -> Option<Material> {
        let mut material = self.materials.get_mut(id.0)?.take()?;
        material.release(device);
        self.by_name.remove(material.name());
        self.free.push(id.0);
        for ids in self.owned.values_mut() {
            ids.retain(|owned| *owned != id);
        }
        Some(material)
    }

    /// Remove every material registered for `owner`; returns how many went
    pub fn release_owned(&mut self, device: &mut dyn GraphicsDevice, owner: EntityId) -> usize {
        let ids = self.owned.remove(&owner).unwrap_or_default();
        ids.into_iter()
            .filter(|id| self.remove(device, *id).is_some())
            .count()
    }

    /// Release materials whose owner no longer passes `alive`
    pub fn prune(
        &mut self,
        device: &mut dyn GraphicsDevice,
        alive: impl Fn(EntityId) -> bool,
    ) -> usize {
        let orphans: Vec<EntityId> = self
            .owned
            .keys()
            .copied()
            .filter(|owner| !alive(*owner))
            .collect();
        orphans
            .into_iter()
            .map(|owner| self.release_owned(device, owner))
            .sum()
    }

    /// Owners with materials still registered
    pub fn owner_count(&self) -> usize {
        self.owned.len()
    }

    pub fn invalidate_all(&mut self) {
        for material in self.materials.iter_mut().flatten() {
            material.invalidate();
        }
    }

    /// Live materials
    pub fn len(&self) -> usize {
        self.materials.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
