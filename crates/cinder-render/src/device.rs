//! The graphics device boundary
//!
//! Everything the renderer asks of the GPU goes through [`GraphicsDevice`].
//! Handles are plain integers; a handle is only meaningful for the device
//! generation that created it (see [`DeviceBound`]).

use crate::error::RenderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SamplerHandle(pub u64);

/// Programmable pipeline stage that owns a set of constant-buffer slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Pixel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    Vertex,
    Index,
    Constant(ShaderStage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    /// Written once at creation
    Immutable,
    /// CPU-writable through map/unmap
    Dynamic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferDesc {
    pub kind: BufferKind,
    pub usage: BufferUsage,
    /// Size in bytes
    pub size: usize,
}

impl BufferDesc {
    pub fn constant(stage: ShaderStage, size: usize) -> Self {
        Self {
            kind: BufferKind::Constant(stage),
            usage: BufferUsage::Dynamic,
            size,
        }
    }

    pub fn vertex(size: usize, usage: BufferUsage) -> Self {
        Self {
            kind: BufferKind::Vertex,
            usage,
            size,
        }
    }

    pub fn index(size: usize, usage: BufferUsage) -> Self {
        Self {
            kind: BufferKind::Index,
            usage,
            size,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RasterizerMode {
    #[default]
    Solid,
    Wireframe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrimitiveTopology {
    #[default]
    TriangleList,
    LineList,
}

/// Vertex input element semantic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexAttribute {
    /// float3
    Position,
    /// float3
    Normal,
    /// float2
    TexCoord,
}

impl VertexAttribute {
    pub fn size(&self) -> u32 {
        match self {
            VertexAttribute::Position | VertexAttribute::Normal => 12,
            VertexAttribute::TexCoord => 8,
        }
    }
}

/// Ordered vertex input layout
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VertexLayout {
    pub attributes: Vec<VertexAttribute>,
}

impl VertexLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, attribute: VertexAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Byte stride of one vertex
    pub fn stride(&self) -> u32 {
        self.attributes.iter().map(VertexAttribute::size).sum()
    }
}

/// Everything needed to (re)create a shader program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderDesc {
    pub vertex_path: String,
    pub pixel_path: String,
    pub layout: VertexLayout,
}

/// CPU-side RGBA8 texture data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl TextureDesc {
    /// A single-color 1x1 texture
    pub fn solid(rgba: [u8; 4]) -> Self {
        Self {
            width: 1,
            height: 1,
            pixels: rgba.to_vec(),
        }
    }
}

/// A graphics device: the only thing the renderer talks to for GPU work.
///
/// Creation calls fail with [`RenderError::DeviceLost`] once the device is
/// lost; binds are ignored. After [`GraphicsDevice::reset`] every handle
/// from the previous generation is invalid.
pub trait GraphicsDevice {
    /// Incremented by every successful reset
    fn generation(&self) -> u64;

    fn begin_frame(&mut self) -> Result<(), RenderError>;
    fn end_frame(&mut self) -> Result<(), RenderError>;

    /// Recreate the device after a loss, discarding all resources
    fn reset(&mut self) -> Result<(), RenderError>;

    /// Create a buffer; `contents` may be shorter than `desc.size`
    fn create_buffer(
        &mut self,
        desc: &BufferDesc,
        contents: &[u8],
    ) -> Result<BufferHandle, RenderError>;
    /// Map a dynamic buffer for CPU writes
    fn map_buffer(&mut self, buffer: BufferHandle) -> Result<&mut [u8], RenderError>;
    fn unmap_buffer(&mut self, buffer: BufferHandle);
    fn release_buffer(&mut self, buffer: BufferHandle);
    fn bind_constant_buffer(&mut self, stage: ShaderStage, slot: u32, buffer: BufferHandle);

    fn create_program(&mut self, desc: &ShaderDesc) -> Result<ProgramHandle, RenderError>;
    fn bind_program(&mut self, program: ProgramHandle);

    fn create_sampler(&mut self) -> Result<SamplerHandle, RenderError>;
    fn bind_sampler(&mut self, slot: u32, sampler: SamplerHandle);

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureHandle, RenderError>;
    fn bind_texture(&mut self, slot: u32, texture: TextureHandle);

    fn set_rasterizer(&mut self, mode: RasterizerMode);
    fn set_topology(&mut self, topology: PrimitiveTopology);

    /// Draw `index_count` 32-bit indices
    fn draw_indexed(
        &mut self,
        vertices: BufferHandle,
        stride: u32,
        indices: BufferHandle,
        index_count: u32,
    ) -> Result<(), RenderError>;
}

/// A device handle tagged with the device generation that created it
///
/// Reading it against a newer generation yields `None`, which is how
/// resources notice they must be recreated after a device reset.
#[derive(Debug, Clone, Copy)]
pub struct DeviceBound<H> {
    slot: Option<(H, u64)>,
}

impl<H> Default for DeviceBound<H> {
    fn default() -> Self {
        Self { slot: None }
    }
}

impl<H: Copy> DeviceBound<H> {
    pub const fn empty() -> Self {
        Self { slot: None }
    }

    /// The handle, if it belongs to the device's current generation
    pub fn get(&self, device: &dyn GraphicsDevice) -> Option<H> {
        match self.slot {
            Some((handle, generation)) if generation == device.generation() => Some(handle),
            _ => None,
        }
    }

    pub fn set(&mut self, handle: H, device: &dyn GraphicsDevice) {
        self.slot = Some((handle, device.generation()));
    }

    /// Take the handle regardless of generation
    pub fn take(&mut self) -> Option<H> {
        self.slot.take().map(|(handle, _)| handle)
    }

    pub fn clear(&mut self) {
        self.slot = None;
    }

    pub fn is_set(&self) -> bool {
        self.slot.is_some()
    }
}
