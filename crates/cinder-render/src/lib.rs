//! Cinder Render - device-abstracted renderer
//!
//! Walks the world hierarchy once per render pass, accumulating transforms
//! on a stack and driving each entity's visual component. All GPU work goes
//! through the [`GraphicsDevice`] trait; [`RecordingDevice`] implements it
//! headlessly for tests and offline runs.

mod buffers;
mod camera;
mod constant_buffer;
mod context;
mod device;
mod error;
mod headless;
mod line_batch;
mod material;
mod render_pass;
mod renderer;
mod shader;
mod shader_library;
mod transform_stack;
mod visual;
pub mod visuals;

pub use buffers::{unit_cube, unit_quad, DiffuseVertex, IndexBuffer, Texture, Vertex, VertexBuffer};
pub use camera::{Camera, ViewProjection, ViewState, DEFAULT_EYE};
pub use constant_buffer::{
    ColorConstants, ConstantBufferCache, FrameConstants, MatrixConstants, PixelSlot, VertexSlot,
};
pub use context::RenderContext;
pub use device::{
    BufferDesc, BufferHandle, BufferKind, BufferUsage, DeviceBound, GraphicsDevice,
    PrimitiveTopology, ProgramHandle, RasterizerMode, SamplerHandle, ShaderDesc, ShaderStage,
    TextureDesc, TextureHandle, VertexAttribute, VertexLayout,
};
pub use error::RenderError;
pub use headless::{DeviceStats, DrawRecord, RecordingDevice};
pub use line_batch::{LineBatch, MAX_LINE_CAPACITY};
pub use material::{Material, MaterialId, MaterialKind, MaterialLibrary};
pub use render_pass::RenderPass;
pub use renderer::{FrameStats, RenderSystem, RendererConfig};
pub use shader::{Shader, ShaderKind, ShaderVariant, DIFFUSE_TEXTURE_SLOT};
pub use shader_library::ShaderLibrary;
pub use transform_stack::TransformStack;
pub use visual::{SetupContext, SlotState, VisualComponent, VisualSlot};
