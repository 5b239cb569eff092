//! Headless graphics device that records what the renderer asks of it
//!
//! Used by the CLI to run scenes without a window and by tests to observe
//! allocations, map/unmap cycles and draw calls. Buffer contents are kept in
//! memory so every draw can snapshot the constant buffers bound at the time.

use crate::device::{
    BufferDesc, BufferHandle, BufferUsage, GraphicsDevice, PrimitiveTopology, ProgramHandle,
    RasterizerMode, SamplerHandle, ShaderDesc, ShaderStage, TextureDesc, TextureHandle,
};
use crate::error::RenderError;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Cumulative counters across the device's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceStats {
    pub buffers_created: usize,
    pub buffers_released: usize,
    pub maps: usize,
    pub unmaps: usize,
    pub programs_created: usize,
    pub samplers_created: usize,
    pub textures_created: usize,
    pub draw_calls: usize,
    pub frames: usize,
    pub resets: usize,
}

/// Snapshot of pipeline state at the time of a draw
#[derive(Debug, Clone)]
pub struct DrawRecord {
    pub program: Option<ProgramHandle>,
    pub topology: PrimitiveTopology,
    pub rasterizer: RasterizerMode,
    pub vertex_buffer: BufferHandle,
    pub index_buffer: BufferHandle,
    pub stride: u32,
    pub index_count: u32,
    pub texture: Option<TextureHandle>,
    /// Constant-buffer bytes bound to the vertex stage, by slot
    pub vs_constants: BTreeMap<u32, Vec<u8>>,
    /// Constant-buffer bytes bound to the pixel stage, by slot
    pub ps_constants: BTreeMap<u32, Vec<u8>>,
}

impl DrawRecord {
    /// Read a bound vertex-stage constant buffer as `T`
    pub fn vs_constant<T: bytemuck::Pod>(&self, slot: u32) -> Option<T> {
        read_pod(self.vs_constants.get(&slot)?)
    }

    /// Read a bound pixel-stage constant buffer as `T`
    pub fn ps_constant<T: bytemuck::Pod>(&self, slot: u32) -> Option<T> {
        read_pod(self.ps_constants.get(&slot)?)
    }
}

fn read_pod<T: bytemuck::Pod>(bytes: &[u8]) -> Option<T> {
    if bytes.len() != std::mem::size_of::<T>() {
        return None;
    }
    Some(bytemuck::pod_read_unaligned(bytes))
}

#[derive(Debug)]
struct RecordedBuffer {
    desc: BufferDesc,
    data: Vec<u8>,
    mapped: bool,
}

#[derive(Debug, Default)]
struct PipelineState {
    program: Option<ProgramHandle>,
    vs_buffers: BTreeMap<u32, BufferHandle>,
    ps_buffers: BTreeMap<u32, BufferHandle>,
    textures: BTreeMap<u32, TextureHandle>,
    samplers: BTreeMap<u32, SamplerHandle>,
    rasterizer: RasterizerMode,
    topology: PrimitiveTopology,
}

/// In-memory [`GraphicsDevice`]
#[derive(Debug, Default)]
pub struct RecordingDevice {
    generation: u64,
    next_handle: u64,
    lost: bool,
    buffers: HashMap<BufferHandle, RecordedBuffer>,
    programs: HashMap<ProgramHandle, ShaderDesc>,
    samplers: HashSet<SamplerHandle>,
    textures: HashMap<TextureHandle, (u32, u32)>,
    state: PipelineState,
    draws: Vec<DrawRecord>,
    stats: DeviceStats,
    failing_buffers: usize,
    failing_programs: usize,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> DeviceStats {
        self.stats
    }

    /// Draws issued since the last `begin_frame`
    pub fn draws(&self) -> &[DrawRecord] {
        &self.draws
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn buffer_data(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(|b| b.data.as_slice())
    }

    pub fn buffer_desc(&self, buffer: BufferHandle) -> Option<BufferDesc> {
        self.buffers.get(&buffer).map(|b| b.desc)
    }

    pub fn program_desc(&self, program: ProgramHandle) -> Option<&ShaderDesc> {
        self.programs.get(&program)
    }

    pub fn bound_program(&self) -> Option<ProgramHandle> {
        self.state.program
    }

    pub fn bound_texture(&self, slot: u32) -> Option<TextureHandle> {
        self.state.textures.get(&slot).copied()
    }

    pub fn bound_sampler(&self, slot: u32) -> Option<SamplerHandle> {
        self.state.samplers.get(&slot).copied()
    }

    pub fn bound_constant_buffer(&self, stage: ShaderStage, slot: u32) -> Option<BufferHandle> {
        self.constant_slots(stage).get(&slot).copied()
    }

    pub fn rasterizer(&self) -> RasterizerMode {
        self.state.rasterizer
    }

    pub fn topology(&self) -> PrimitiveTopology {
        self.state.topology
    }

    pub fn is_lost(&self) -> bool {
        self.lost
    }

    /// Mark the device lost; every creation, map and draw fails until reset
    pub fn simulate_device_loss(&mut self) {
        self.lost = true;
    }

    /// Make the next `count` buffer creations fail
    pub fn fail_next_buffer_creations(&mut self, count: usize) {
        self.failing_buffers = count;
    }

    /// Make the next `count` program creations fail
    pub fn fail_next_program_creations(&mut self, count: usize) {
        self.failing_programs = count;
    }

    fn constant_slots(&self, stage: ShaderStage) -> &BTreeMap<u32, BufferHandle> {
        match stage {
            ShaderStage::Vertex => &self.state.vs_buffers,
            ShaderStage::Pixel => &self.state.ps_buffers,
        }
    }

    fn snapshot(&self, stage: ShaderStage) -> BTreeMap<u32, Vec<u8>> {
        self.constant_slots(stage)
            .iter()
            .filter_map(|(slot, handle)| {
                self.buffers
                    .get(handle)
                    .map(|buffer| (*slot, buffer.data.clone()))
            })
            .collect()
    }

    fn allocate(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn check_alive(&self) -> Result<(), RenderError> {
        if self.lost {
            Err(RenderError::DeviceLost)
        } else {
            Ok(())
        }
    }
}

impl GraphicsDevice for RecordingDevice {
    fn generation(&self) -> u64 {
        self.generation
    }

    fn begin_frame(&mut self) -> Result<(), RenderError> {
        self.check_alive()?;
        self.draws.clear();
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), RenderError> {
        self.check_alive()?;
        self.stats.frames += 1;
        Ok(())
    }

    fn reset(&mut self) -> Result<(), RenderError> {
        self.buffers.clear();
        self.programs.clear();
        self.samplers.clear();
        self.textures.clear();
        self.state = PipelineState::default();
        self.draws.clear();
        self.lost = false;
        self.generation += 1;
        self.stats.resets += 1;
        Ok(())
    }

    fn create_buffer(
        &mut self,
        desc: &BufferDesc,
        contents: &[u8],
    ) -> Result<BufferHandle, RenderError> {
        self.check_alive()?;
        if self.failing_buffers > 0 {
            self.failing_buffers -= 1;
            return Err(RenderError::BufferCreation(format!(
                "injected failure ({} bytes)",
                desc.size
            )));
        }
        if contents.len() > desc.size {
            return Err(RenderError::BufferCreation(format!(
                "{} bytes of contents for a {} byte buffer",
                contents.len(),
                desc.size
            )));
        }

        let mut data = vec![0u8; desc.size];
        data[..contents.len()].copy_from_slice(contents);

        let handle = BufferHandle(self.allocate());
        self.buffers.insert(
            handle,
            RecordedBuffer {
                desc: *desc,
                data,
                mapped: false,
            },
        );
        self.stats.buffers_created += 1;
        Ok(handle)
    }

    fn map_buffer(&mut self, buffer: BufferHandle) -> Result<&mut [u8], RenderError> {
        self.check_alive()?;
        let entry = self
            .buffers
            .get_mut(&buffer)
            .ok_or_else(|| RenderError::InvalidHandle(format!("{:?}", buffer)))?;
        if entry.desc.usage != BufferUsage::Dynamic {
            return Err(RenderError::BufferMap(format!(
                "{:?} was not created CPU-writable",
                buffer
            )));
        }
        if entry.mapped {
            return Err(RenderError::BufferMap(format!("{:?} is already mapped", buffer)));
        }
        entry.mapped = true;
        self.stats.maps += 1;
        Ok(entry.data.as_mut_slice())
    }

    fn unmap_buffer(&mut self, buffer: BufferHandle) {
        if let Some(entry) = self.buffers.get_mut(&buffer) {
            if entry.mapped {
                entry.mapped = false;
                self.stats.unmaps += 1;
            }
        }
    }

    fn release_buffer(&mut self, buffer: BufferHandle) {
        if self.buffers.remove(&buffer).is_some() {
            self.stats.buffers_released += 1;
        }
    }

    fn bind_constant_buffer(&mut self, stage: ShaderStage, slot: u32, buffer: BufferHandle) {
        if self.lost {
            return;
        }
        match stage {
            ShaderStage::Vertex => self.state.vs_buffers.insert(slot, buffer),
            ShaderStage::Pixel => self.state.ps_buffers.insert(slot, buffer),
        };
    }

    fn create_program(&mut self, desc: &ShaderDesc) -> Result<ProgramHandle, RenderError> {
        self.check_alive()?;
        if self.failing_programs > 0 {
            self.failing_programs -= 1;
            return Err(RenderError::ShaderCreation(format!(
                "injected failure ({})",
                desc.vertex_path
            )));
        }
        let handle = ProgramHandle(self.allocate());
        self.programs.insert(handle, desc.clone());
        self.stats.programs_created += 1;
        Ok(handle)
    }

    fn bind_program(&mut self, program: ProgramHandle) {
        if !self.lost {
            self.state.program = Some(program);
        }
    }

    fn create_sampler(&mut self) -> Result<SamplerHandle, RenderError> {
        self.check_alive()?;
        let handle = SamplerHandle(self.allocate());
        self.samplers.insert(handle);
        self.stats.samplers_created += 1;
        Ok(handle)
    }

    fn bind_sampler(&mut self, slot: u32, sampler: SamplerHandle) {
        if !self.lost {
            self.state.samplers.insert(slot, sampler);
        }
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureHandle, RenderError> {
        self.check_alive()?;
        let expected = desc.width as usize * desc.height as usize * 4;
        if desc.pixels.len() != expected {
            return Err(RenderError::TextureCreation(format!(
                "{}x{} texture needs {} bytes, got {}",
                desc.width,
                desc.height,
                expected,
                desc.pixels.len()
            )));
        }
        let handle = TextureHandle(self.allocate());
        self.textures.insert(handle, (desc.width, desc.height));
        self.stats.textures_created += 1;
        Ok(handle)
    }

    fn bind_texture(&mut self, slot: u32, texture: TextureHandle) {
        if !self.lost {
            self.state.textures.insert(slot, texture);
        }
    }

    fn set_rasterizer(&mut self, mode: RasterizerMode) {
        if !self.lost {
            self.state.rasterizer = mode;
        }
    }

    fn set_topology(&mut self, topology: PrimitiveTopology) {
        if !self.lost {
            self.state.topology = topology;
        }
    }

    fn draw_indexed(
        &mut self,
        vertices: BufferHandle,
        stride: u32,
        indices: BufferHandle,
        index_count: u32,
    ) -> Result<(), RenderError> {
        self.check_alive()?;
        for handle in [vertices, indices] {
            if !self.buffers.contains_key(&handle) {
                return Err(RenderError::InvalidHandle(format!("{:?}", handle)));
            }
        }

        let record = DrawRecord {
            program: self.state.program,
            topology: self.state.topology,
            rasterizer: self.state.rasterizer,
            vertex_buffer: vertices,
            index_buffer: indices,
            stride,
            index_count,
            texture: self.state.textures.get(&0).copied(),
            vs_constants: self.snapshot(ShaderStage::Vertex),
            ps_constants: self.snapshot(ShaderStage::Pixel),
        };
        self.draws.push(record);
        self.stats.draw_calls += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_requires_dynamic_buffer() {
        let mut device = RecordingDevice::new();
        let fixed = device
            .create_buffer(&BufferDesc::vertex(12, BufferUsage::Immutable), &[1; 12])
            .unwrap();
        assert!(matches!(
            device.map_buffer(fixed),
            Err(RenderError::BufferMap(_))
        ));

        let dynamic = device
            .create_buffer(&BufferDesc::constant(ShaderStage::Pixel, 16), &[])
            .unwrap();
        device.map_buffer(dynamic).unwrap().copy_from_slice(&[7; 16]);
        device.unmap_buffer(dynamic);
        assert_eq!(device.buffer_data(dynamic), Some(&[7u8; 16][..]));
        assert_eq!(device.stats().maps, 1);
        assert_eq!(device.stats().unmaps, 1);
    }

    #[test]
    fn test_draw_snapshots_bound_constants() {
        let mut device = RecordingDevice::new();
        let cb = device
            .create_buffer(&BufferDesc::constant(ShaderStage::Pixel, 16), &[0; 16])
            .unwrap();
        device.bind_constant_buffer(ShaderStage::Pixel, 0, cb);
        let vb = device
            .create_buffer(&BufferDesc::vertex(36, BufferUsage::Immutable), &[])
            .unwrap();
        let ib = device
            .create_buffer(&BufferDesc::index(12, BufferUsage::Immutable), &[])
            .unwrap();

        device.begin_frame().unwrap();
        device.draw_indexed(vb, 12, ib, 3).unwrap();
        device.map_buffer(cb).unwrap()[0] = 9;
        device.unmap_buffer(cb);
        device.draw_indexed(vb, 12, ib, 3).unwrap();

        assert_eq!(device.draws().len(), 2);
        assert_eq!(device.draws()[0].ps_constants[&0][0], 0);
        assert_eq!(device.draws()[1].ps_constants[&0][0], 9);
    }

    #[test]
    fn test_lost_device_fails_until_reset() {
        let mut device = RecordingDevice::new();
        device.simulate_device_loss();
        assert!(device.begin_frame().unwrap_err().is_device_lost());
        assert!(device
            .create_buffer(&BufferDesc::vertex(4, BufferUsage::Immutable), &[])
            .is_err());

        device.reset().unwrap();
        assert_eq!(device.generation(), 1);
        assert!(device.begin_frame().is_ok());
    }

    #[test]
    fn test_injected_failures_are_consumed() {
        let mut device = RecordingDevice::new();
        device.fail_next_buffer_creations(1);
        let desc = BufferDesc::vertex(4, BufferUsage::Immutable);
        assert!(device.create_buffer(&desc, &[]).is_err());
        assert!(device.create_buffer(&desc, &[]).is_ok());
        assert_eq!(device.stats().buffers_created, 1);
    }
}
