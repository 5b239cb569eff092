//! Debug-line batcher: collects line segments during a frame and draws them
//! with a single indexed draw call

use crate::device::{
    BufferDesc, BufferHandle, BufferUsage, DeviceBound, GraphicsDevice,
};
use crate::error::RenderError;
use glam::Vec3;

/// Largest `line_capacity` the renderer preallocates for
pub const MAX_LINE_CAPACITY: usize = 1 << 20;

const FLOATS_PER_VERTEX: usize = 3;
const VERTEX_STRIDE: usize = FLOATS_PER_VERTEX * std::mem::size_of::<f32>();

/// Growable device buffer, resized to the next power of two when too small
/// and otherwise updated in place through map/unmap
#[derive(Debug, Default)]
struct StreamBuffer {
    handle: DeviceBound<BufferHandle>,
    capacity: usize,
}

impl StreamBuffer {
    fn upload(
        &mut self,
        device: &mut dyn GraphicsDevice,
        bytes: &[u8],
        make_desc: fn(usize, BufferUsage) -> BufferDesc,
    ) -> Result<BufferHandle, RenderError> {
        if let Some(handle) = self.handle.get(&*device) {
            if self.capacity >= bytes.len() {
                let mapped = device.map_buffer(handle)?;
                mapped[..bytes.len()].copy_from_slice(bytes);
                device.unmap_buffer(handle);
                return Ok(handle);
            }
            device.release_buffer(handle);
        }
        self.handle.clear();

        let capacity = bytes.len().next_power_of_two();
        let handle = device.create_buffer(&make_desc(capacity, BufferUsage::Dynamic), bytes)?;
        self.handle.set(handle, &*device);
        self.capacity = capacity;
        Ok(handle)
    }

    fn invalidate(&mut self) {
        self.handle.clear();
        self.capacity = 0;
    }
}

#[derive(Debug, Default)]
pub struct LineBatch {
    /// xyz triplets, two per line
    endpoints: Vec<f32>,
    /// Index pairs into `endpoints`
    indices: Vec<u32>,
    vertices_gpu: StreamBuffer,
    indices_gpu: StreamBuffer,
}

impl LineBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preallocate room for `lines` segments, at most [`MAX_LINE_CAPACITY`]
    pub fn with_capacity(lines: usize) -> Result<Self, RenderError> {
        let floats = lines
            .checked_mul(2 * FLOATS_PER_VERTEX)
            .filter(|_| lines <= MAX_LINE_CAPACITY)
            .ok_or_else(|| {
                RenderError::InvalidConfig(format!(
                    "line_capacity {} exceeds {}",
                    lines, MAX_LINE_CAPACITY
                ))
            })?;
        Ok(Self {
            endpoints: Vec::with_capacity(floats),
            indices: Vec::with_capacity(lines * 2),
            ..Self::default()
        })
    }

    pub fn submit_line(&mut self, from: Vec3, to: Vec3) {
        let base = (self.endpoints.len() / FLOATS_PER_VERTEX) as u32;
        self.endpoints.extend_from_slice(&from.to_array());
        self.endpoints.extend_from_slice(&to.to_array());
        self.indices.push(base);
        self.indices.push(base + 1);
    }

    pub fn line_count(&self) -> usize {
        self.indices.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn endpoints(&self) -> &[f32] {
        &self.endpoints
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn clear(&mut self) {
        self.endpoints.clear();
        self.indices.clear();
    }

    /// Upload and draw the whole batch in one call, then clear it.
    ///
    /// Returns whether a draw was issued. The caller sets topology and binds
    /// the line material beforehand.
    pub fn flush(&mut self, device: &mut dyn GraphicsDevice) -> Result<bool, RenderError> {
        if self.is_empty() {
            return Ok(false);
        }
        let result = self.draw(device);
        self.clear();
        result.map(|_| true)
    }

    fn draw(&mut self, device: &mut dyn GraphicsDevice) -> Result<(), RenderError> {
        let vertices = self.vertices_gpu.upload(
            device,
            bytemuck::cast_slice(&self.endpoints),
            BufferDesc::vertex,
        )?;
        let indices = self.indices_gpu.upload(
            device,
            bytemuck::cast_slice(&self.indices),
            BufferDesc::index,
        )?;
        device.draw_indexed(
            vertices,
            VERTEX_STRIDE as u32,
            indices,
            self.indices.len() as u32,
        )
    }

    /// Forget device buffers (after a device reset)
    pub fn invalidate(&mut self) {
        self.vertices_gpu.invalidate();
        self.indices_gpu.invalidate();
    }
}
