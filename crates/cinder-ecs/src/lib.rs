//! Cinder ECS - Entity Component System with stable IDs
//!
//! This crate wraps hecs with stable entity identifiers, named entities,
//! an ordered parent/child hierarchy, and opaque per-entity component tables
//! for data no typed component claims.

mod component;
mod entity;
mod world;

pub use component::DynamicComponents;
pub use entity::EntityInfo;
pub use hecs::{Component, Ref, RefMut};
pub use world::World;
