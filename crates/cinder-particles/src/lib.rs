//! Cinder Particles - CPU particle simulation
//!
//! Provides a fixed-capacity ring pool per emitter with:
//! - Cursor-based emission that overwrites the oldest slot
//! - First-order position and rotation integration
//! - Size and color interpolated over each particle's life
//! - One quad draw per live particle through the render system

pub mod curves;
pub mod emitter;
pub mod particle;
pub mod rand;
pub mod template;

pub use emitter::CpuParticlesVisual;
pub use particle::{Particle, ParticlePool, MAX_POOL_SIZE};
pub use rand::ParticleRng;
pub use template::{ParticleTemplate, ParticlesConfig};
