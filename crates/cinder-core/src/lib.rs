//! Cinder Core - Foundational types for the Cinder engine
//!
//! This crate provides the core types that all other Cinder crates depend on:
//! - `EntityId`, `IdAllocator` - Entity identifiers, allocated per world
//! - `Transform`, `Color` - Spatial and appearance types (built on glam)
//! - Error types and Result alias

mod error;
mod id;
mod types;

pub use error::{CinderError, Result};
pub use id::{EntityId, IdAllocator};
pub use types::{lerp, Color, Transform};

/// Re-exported so downstream crates agree on one math library version
pub use glam::{Mat4, Quat, Vec3, Vec4};
