//! Cinder Runtime - Frame loop infrastructure
//!
//! Provides the building blocks for driving the renderer:
//! - `FrameClock`: frame timing, clamped or fixed-step
//! - `EngineConfig`: the engine's TOML configuration
//! - `FrameDriver`: owns the world and render system, runs frames and
//!   recovers from device loss

mod clock;
mod config;
mod driver;

pub use clock::FrameClock;
pub use config::{ClockConfig, EngineConfig};
pub use driver::FrameDriver;
