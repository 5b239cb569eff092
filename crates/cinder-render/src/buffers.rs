//! CPU-backed vertex, index and texture resources
//!
//! Each resource keeps its source data on the CPU and uploads lazily, so a
//! device reset only costs a re-upload on next use.

use crate::device::{
    BufferDesc, BufferHandle, BufferUsage, DeviceBound, GraphicsDevice, TextureDesc,
    TextureHandle, VertexAttribute, VertexLayout,
};
use crate::error::RenderError;
use bytemuck::{Pod, Zeroable};

/// Position-only vertex
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
}

impl Vertex {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            position: [x, y, z],
        }
    }

    pub fn layout() -> VertexLayout {
        VertexLayout::new().push(VertexAttribute::Position)
    }
}

/// Vertex with normal and texture coordinates for lit, textured shading
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct DiffuseVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl DiffuseVertex {
    pub fn layout() -> VertexLayout {
        VertexLayout::new()
            .push(VertexAttribute::Position)
            .push(VertexAttribute::Normal)
            .push(VertexAttribute::TexCoord)
    }
}

/// Immutable vertex buffer with CPU-side source data
#[derive(Debug, Clone)]
pub struct VertexBuffer<V: Pod> {
    vertices: Vec<V>,
    gpu: DeviceBound<BufferHandle>,
}

impl<V: Pod> VertexBuffer<V> {
    pub fn new(vertices: Vec<V>) -> Self {
        Self {
            vertices,
            gpu: DeviceBound::empty(),
        }
    }

    pub fn vertices(&self) -> &[V] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn stride(&self) -> u32 {
        std::mem::size_of::<V>() as u32
    }

    /// Device buffer for the current generation, uploading if needed
    pub fn ensure(&mut self, device: &mut dyn GraphicsDevice) -> Result<BufferHandle, RenderError> {
        if let Some(handle) = self.gpu.get(&*device) {
            return Ok(handle);
        }
        let bytes: &[u8] = bytemuck::cast_slice(&self.vertices);
        let handle = device.create_buffer(
            &BufferDesc::vertex(bytes.len(), BufferUsage::Immutable),
            bytes,
        )?;
        self.gpu.set(handle, &*device);
        Ok(handle)
    }

    /// Free the device copy; the CPU data stays for a later `ensure`
    pub fn release(&mut self, device: &mut dyn GraphicsDevice) {
        release_bound(&mut self.gpu, device);
    }
}

/// Immutable 32-bit index buffer with CPU-side source data
#[derive(Debug, Clone)]
pub struct IndexBuffer {
    indices: Vec<u32>,
    gpu: DeviceBound<BufferHandle>,
}

impl IndexBuffer {
    pub fn new(indices: Vec<u32>) -> Self {
        Self {
            indices,
            gpu: DeviceBound::empty(),
        }
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn ensure(&mut self, device: &mut dyn GraphicsDevice) -> Result<BufferHandle, RenderError> {
        if let Some(handle) = self.gpu.get(&*device) {
            return Ok(handle);
        }
        let bytes: &[u8] = bytemuck::cast_slice(&self.indices);
        let handle = device.create_buffer(
            &BufferDesc::index(bytes.len(), BufferUsage::Immutable),
            bytes,
        )?;
        self.gpu.set(handle, &*device);
        Ok(handle)
    }

    pub fn release(&mut self, device: &mut dyn GraphicsDevice) {
        release_bound(&mut self.gpu, device);
    }
}

/// Release `bound` if it belongs to the current device generation.
/// Handles from an older generation died with the reset.
fn release_bound(bound: &mut DeviceBound<BufferHandle>, device: &mut dyn GraphicsDevice) {
    if let Some(handle) = bound.get(&*device) {
        device.release_buffer(handle);
    }
    bound.clear();
}

/// Texture with CPU-side pixels
#[derive(Debug, Clone)]
pub struct Texture {
    desc: TextureDesc,
    gpu: DeviceBound<TextureHandle>,
}

impl Texture {
    pub fn new(desc: TextureDesc) -> Self {
        Self {
            desc,
            gpu: DeviceBound::empty(),
        }
    }

    pub fn desc(&self) -> &TextureDesc {
        &self.desc
    }

    pub fn ensure(&mut self, device: &mut dyn GraphicsDevice) -> Result<TextureHandle, RenderError> {
        if let Some(handle) = self.gpu.get(&*device) {
            return Ok(handle);
        }
        let handle = device.create_texture(&self.desc)?;
        self.gpu.set(handle, &*device);
        Ok(handle)
    }
}

/// Unit quad in the XY plane, centered on the origin
pub fn unit_quad() -> (VertexBuffer<Vertex>, IndexBuffer) {
    let vertices = vec![
        Vertex::new(-0.5, -0.5, 0.0),
        Vertex::new(0.5, -0.5, 0.0),
        Vertex::new(0.5, 0.5, 0.0),
        Vertex::new(-0.5, 0.5, 0.0),
    ];
    let indices = vec![0, 1, 2, 2, 3, 0];
    (VertexBuffer::new(vertices), IndexBuffer::new(indices))
}

/// Unit cube centered on the origin
pub fn unit_cube() -> (VertexBuffer<Vertex>, IndexBuffer) {
    let h = 0.5;
    let vertices = vec![
        Vertex::new(-h, -h, -h),
        Vertex::new(h, -h, -h),
        Vertex::new(h, h, -h),
        Vertex::new(-h, h, -h),
        Vertex::new(-h, -h, h),
        Vertex::new(h, -h, h),
        Vertex::new(h, h, h),
        Vertex::new(-h, h, h),
    ];
    #[rustfmt::skip]
    let indices = vec![
        // back, front
        0, 2, 1, 0, 3, 2,
        4, 5, 6, 4, 6, 7,
        // left, right
        0, 4, 7, 0, 7, 3,
        1, 2, 6, 1, 6, 5,
        // bottom, top
        0, 1, 5, 0, 5, 4,
        3, 7, 6, 3, 6, 2,
    ];
    (VertexBuffer::new(vertices), IndexBuffer::new(indices))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::RecordingDevice;

    #[test]
    fn test_vertex_layout_matches_struct_size() {
        assert_eq!(Vertex::layout().stride() as usize, std::mem::size_of::<Vertex>());
        assert_eq!(
            DiffuseVertex::layout().stride() as usize,
            std::mem::size_of::<DiffuseVertex>()
        );
    }

    #[test]
    fn test_upload_is_lazy_and_cached() {
        let mut device = RecordingDevice::new();
        let (mut vb, mut ib) = unit_quad();

        let first = vb.ensure(&mut device).unwrap();
        assert_eq!(vb.ensure(&mut device).unwrap(), first);
        ib.ensure(&mut device).unwrap();
        assert_eq!(device.stats().buffers_created, 2);
        assert_eq!(device.buffer_data(first).unwrap().len(), 4 * 12);
    }

    #[test]
    fn test_reupload_after_reset() {
        let mut device = RecordingDevice::new();
        let (mut vb, mut ib) = unit_cube();
        assert_eq!(ib.len(), 36);
        vb.ensure(&mut device).unwrap();

        device.reset().unwrap();
        let handle = vb.ensure(&mut device).unwrap();
        assert_eq!(device.stats().buffers_created, 2);
        assert!(device.buffer_data(handle).is_some());
    }

    #[test]
    fn test_release_frees_device_copy() {
        let mut device = RecordingDevice::new();
        let (mut vb, mut ib) = unit_quad();
        vb.ensure(&mut device).unwrap();
        ib.ensure(&mut device).unwrap();

        vb.release(&mut device);
        ib.release(&mut device);
        assert_eq!(device.live_buffers(), 0);
        assert_eq!(device.stats().buffers_released, 2);

        // Released twice is a no-op; the CPU copy can upload again
        vb.release(&mut device);
        assert_eq!(device.stats().buffers_released, 2);
        vb.ensure(&mut device).unwrap();
        assert_eq!(device.live_buffers(), 1);
    }

    #[test]
    fn test_release_after_reset_skips_stale_handle() {
        let mut device = RecordingDevice::new();
        let (mut vb, _) = unit_quad();
        vb.ensure(&mut device).unwrap();
        device.reset().unwrap();

        vb.release(&mut device);
        assert_eq!(device.stats().buffers_released, 0);
    }

    #[test]
    fn test_texture_validates_pixels() {
        let mut device = RecordingDevice::new();
        let mut ok = Texture::new(TextureDesc::solid([255, 0, 0, 255]));
        assert!(ok.ensure(&mut device).is_ok());

        let mut bad = Texture::new(TextureDesc {
            width: 2,
            height: 2,
            pixels: vec![0; 4],
        });
        assert!(matches!(
            bad.ensure(&mut device),
            Err(RenderError::TextureCreation(_))
        ));
    }
}
