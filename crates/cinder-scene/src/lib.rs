//! Cinder Scene - TOML scene serialization
//!
//! Loads scene files into a world, building visual components through a
//! name-keyed factory registry, and writes worlds back out.

mod factory;
mod format;
mod loader;
mod saver;

pub use factory::{VisualConstructor, VisualFactory};
pub use format::{CameraDef, EntityDef, SceneFile, SceneMetadata};
pub use loader::{load_scene, load_scene_string, LoadedScene};
pub use saver::{save_scene, save_scene_string, world_to_scene_file};
