//! Renderer error type

use cinder_core::CinderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Graphics device lost")]
    DeviceLost,
    #[error("Failed to create buffer: {0}")]
    BufferCreation(String),
    #[error("Failed to map buffer: {0}")]
    BufferMap(String),
    #[error("Constant buffer size mismatch: buffer holds {expected} bytes, got {got}")]
    SizeMismatch { expected: usize, got: usize },
    #[error("Failed to create shader: {0}")]
    ShaderCreation(String),
    #[error("Failed to create texture: {0}")]
    TextureCreation(String),
    #[error("Shader not registered: {0}")]
    UnknownShader(String),
    #[error("Material not found: {0}")]
    UnknownMaterial(usize),
    #[error("{shader} shader does not support {capability}")]
    UnsupportedCapability {
        shader: String,
        capability: &'static str,
    },
    #[error("Stale entity handle: {0}")]
    StaleHandle(String),
    #[error("Invalid device handle: {0}")]
    InvalidHandle(String),
    #[error("Invalid renderer configuration: {0}")]
    InvalidConfig(String),
}

impl RenderError {
    pub fn is_device_lost(&self) -> bool {
        matches!(self, RenderError::DeviceLost)
    }
}

impl From<RenderError> for CinderError {
    fn from(err: RenderError) -> Self {
        CinderError::RenderError(err.to_string())
    }
}
