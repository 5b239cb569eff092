//! Constant-buffer layouts and per-stage slot caches

use crate::device::{BufferDesc, BufferHandle, DeviceBound, GraphicsDevice, ShaderStage};
use crate::error::RenderError;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

/// Vertex-stage constant-buffer slots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexSlot {
    Model = 0,
    View = 1,
    Projection = 2,
}

/// Pixel-stage constant-buffer slots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelSlot {
    /// Per-object color / material parameters
    Material = 0,
    /// Per-frame parameters
    Frame = 1,
}

impl VertexSlot {
    pub const fn index(self) -> u32 {
        self as u32
    }
}

impl PixelSlot {
    pub const fn index(self) -> u32 {
        self as u32
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct MatrixConstants {
    pub matrix: [[f32; 4]; 4],
}

impl MatrixConstants {
    pub fn new(matrix: Mat4) -> Self {
        Self {
            matrix: matrix.to_cols_array_2d(),
        }
    }

    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.matrix)
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct ColorConstants {
    pub color: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct FrameConstants {
    pub camera_position: [f32; 3],
    pub time: f32,
}

impl FrameConstants {
    pub fn new(camera_position: Vec3, time: f64) -> Self {
        Self {
            camera_position: camera_position.to_array(),
            time: time as f32,
        }
    }
}

/// Constant buffers for one shader stage, indexed by slot
///
/// The first upload to a slot creates a dynamic buffer sized exactly to the
/// data and binds it. Later uploads map, copy, unmap and rebind the same
/// buffer. Buffers created against an older device generation are ignored
/// and recreated on the next upload.
#[derive(Debug, Clone)]
pub struct ConstantBufferCache {
    stage: ShaderStage,
    slots: Vec<DeviceBound<BufferHandle>>,
}

impl ConstantBufferCache {
    pub fn new(stage: ShaderStage) -> Self {
        Self {
            stage,
            slots: Vec::new(),
        }
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn upload<T: Pod>(
        &mut self,
        device: &mut dyn GraphicsDevice,
        slot: u32,
        data: &T,
    ) -> Result<(), RenderError> {
        let bytes = bytemuck::bytes_of(data);
        let index = slot as usize;
        if self.slots.len() <= index {
            self.slots.resize_with(index + 1, DeviceBound::empty);
        }

        let handle = match self.slots[index].get(&*device) {
            Some(handle) => {
                let mapped = device.map_buffer(handle)?;
                let expected = mapped.len();
                if expected == bytes.len() {
                    mapped.copy_from_slice(bytes);
                }
                device.unmap_buffer(handle);
                if expected != bytes.len() {
                    return Err(RenderError::SizeMismatch {
                        expected,
                        got: bytes.len(),
                    });
                }
                handle
            }
            None => {
                let desc = BufferDesc::constant(self.stage, bytes.len());
                let handle = device.create_buffer(&desc, bytes)?;
                self.slots[index].set(handle, &*device);
                handle
            }
        };

        device.bind_constant_buffer(self.stage, slot, handle);
        Ok(())
    }

    /// Rebind every live buffer at its slot
    pub fn bind_all(&self, device: &mut dyn GraphicsDevice) {
        for (slot, bound) in self.slots.iter().enumerate() {
            if let Some(handle) = bound.get(&*device) {
                device.bind_constant_buffer(self.stage, slot as u32, handle);
            }
        }
    }

    /// Buffer currently backing `slot`
    pub fn buffer(&self, device: &dyn GraphicsDevice, slot: u32) -> Option<BufferHandle> {
        self.slots.get(slot as usize).and_then(|b| b.get(device))
    }

    /// Release every buffer still owned by the current device generation
    pub fn release(&mut self, device: &mut dyn GraphicsDevice) {
        for bound in &mut self.slots {
            if let Some(handle) = bound.get(&*device) {
                device.release_buffer(handle);
            }
        }
        self.slots.clear();
    }

    /// Forget all buffers without touching the device (after a reset)
    pub fn invalidate(&mut self) {
        self.slots.clear();
    }

    pub fn allocated(&self) -> usize {
        self.slots.iter().filter(|b| b.is_set()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::RecordingDevice;

    #[test]
    fn test_first_upload_allocates_then_maps() {
        let mut device = RecordingDevice::new();
        let mut cache = ConstantBufferCache::new(ShaderStage::Vertex);

        let model = MatrixConstants::new(Mat4::IDENTITY);
        cache.upload(&mut device, 0, &model).unwrap();
        assert_eq!(device.stats().buffers_created, 1);
        assert_eq!(device.stats().maps, 0);

        for i in 0..5 {
            let m = Mat4::from_translation(Vec3::splat(i as f32));
            cache.upload(&mut device, 0, &MatrixConstants::new(m)).unwrap();
        }
        assert_eq!(device.stats().buffers_created, 1);
        assert_eq!(device.stats().maps, 5);
        assert_eq!(device.stats().unmaps, 5);

        let handle = cache.buffer(&device, 0).unwrap();
        let stored: MatrixConstants =
            bytemuck::pod_read_unaligned(device.buffer_data(handle).unwrap());
        assert_eq!(stored.to_mat4(), Mat4::from_translation(Vec3::splat(4.0)));
        assert_eq!(
            device.bound_constant_buffer(ShaderStage::Vertex, 0),
            Some(handle)
        );
    }

    #[test]
    fn test_slots_are_independent() {
        let mut device = RecordingDevice::new();
        let mut cache = ConstantBufferCache::new(ShaderStage::Pixel);
        let color = ColorConstants { color: [1.0; 4] };

        cache.upload(&mut device, 0, &color).unwrap();
        cache.upload(&mut device, 1, &color).unwrap();
        assert_eq!(device.stats().buffers_created, 2);
        assert_eq!(cache.allocated(), 2);
    }

    #[test]
    fn test_size_change_is_rejected() {
        let mut device = RecordingDevice::new();
        let mut cache = ConstantBufferCache::new(ShaderStage::Pixel);
        cache
            .upload(&mut device, 0, &ColorConstants { color: [0.0; 4] })
            .unwrap();
        let err = cache
            .upload(&mut device, 0, &MatrixConstants::new(Mat4::IDENTITY))
            .unwrap_err();
        assert!(matches!(
            err,
            RenderError::SizeMismatch {
                expected: 16,
                got: 64
            }
        ));
        assert_eq!(device.stats().maps, device.stats().unmaps);
    }

    #[test]
    fn test_creation_failure_is_reported_and_not_cached() {
        let mut device = RecordingDevice::new();
        let mut cache = ConstantBufferCache::new(ShaderStage::Vertex);
        device.fail_next_buffer_creations(1);

        let model = MatrixConstants::new(Mat4::IDENTITY);
        assert!(cache.upload(&mut device, 0, &model).is_err());
        assert_eq!(cache.allocated(), 0);
        cache.upload(&mut device, 0, &model).unwrap();
        assert_eq!(cache.allocated(), 1);
    }

    #[test]
    fn test_stale_buffers_are_recreated_after_reset() {
        let mut device = RecordingDevice::new();
        let mut cache = ConstantBufferCache::new(ShaderStage::Vertex);
        let model = MatrixConstants::new(Mat4::IDENTITY);
        cache.upload(&mut device, 0, &model).unwrap();

        device.reset().unwrap();
        cache.upload(&mut device, 0, &model).unwrap();
        assert_eq!(device.stats().buffers_created, 2);
        assert_eq!(device.stats().maps, 0);
    }
}
