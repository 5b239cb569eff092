//! Particle template and the emitter's TOML configuration

use crate::particle::check_capacity;
use cinder_core::{CinderError, Color, Result};
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Per-emission particle parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleTemplate {
    pub velocity: Vec3,
    /// Rotation rate as a quaternion delta
    pub angular_velocity: Quat,
    pub color_begin: Color,
    pub color_end: Color,
    /// Each velocity axis is jittered by up to half this, either way
    pub velocity_variation: f32,
    pub size_begin: f32,
    pub size_end: f32,
    /// `size_begin` is jittered by up to half this, either way
    pub size_variation: f32,
    /// Seconds
    pub life_time: f32,
}

impl Default for ParticleTemplate {
    fn default() -> Self {
        Self {
            velocity: Vec3::new(1.0, 0.0, 0.0),
            angular_velocity: Quat::IDENTITY,
            color_begin: Color::RED,
            color_end: Color::BLUE,
            velocity_variation: 10.0,
            size_begin: 0.1,
            size_end: 0.0,
            size_variation: 0.1,
            life_time: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct Vec3Table {
    x: f32,
    y: f32,
    z: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct QuatTable {
    x: f32,
    y: f32,
    z: f32,
    w: f32,
}

/// On-disk layout; every template field is required
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ParticlesTable {
    pool_size: usize,
    #[serde(default)]
    emit_rate: i32,
    velocity: Vec3Table,
    velocity_variation: f32,
    angular_velocity: QuatTable,
    color_begin: Color,
    color_end: Color,
    size_begin: f32,
    size_end: f32,
    size_variation: f32,
    life_time: f32,
}

/// Everything needed to build a particle emitter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticlesConfig {
    pub pool_size: usize,
    /// Extra emissions per frame; a frame emits `emit_rate + 1` particles
    pub emit_rate: i32,
    pub template: ParticleTemplate,
}

impl Default for ParticlesConfig {
    fn default() -> Self {
        Self {
            pool_size: 1000,
            emit_rate: 0,
            template: ParticleTemplate::default(),
        }
    }
}

impl ParticlesConfig {
    /// Parse from a `cpu_particles` component table
    pub fn from_toml(value: &toml::Value) -> Result<Self> {
        let table: ParticlesTable = value
            .clone()
            .try_into()
            .map_err(|e| CinderError::Config(format!("cpu_particles: {}", e)))?;
        check_capacity(table.pool_size)?;

        Ok(Self {
            pool_size: table.pool_size,
            emit_rate: table.emit_rate,
            template: ParticleTemplate {
                velocity: Vec3::new(table.velocity.x, table.velocity.y, table.velocity.z),
                angular_velocity: Quat::from_xyzw(
                    table.angular_velocity.x,
                    table.angular_velocity.y,
                    table.angular_velocity.z,
                    table.angular_velocity.w,
                ),
                color_begin: table.color_begin,
                color_end: table.color_end,
                velocity_variation: table.velocity_variation,
                size_begin: table.size_begin,
                size_end: table.size_end,
                size_variation: table.size_variation,
                life_time: table.life_time,
            },
        })
    }

    /// Same layout [`ParticlesConfig::from_toml`] reads
    pub fn to_toml(&self) -> Result<toml::Value> {
        let t = &self.template;
        let table = ParticlesTable {
            pool_size: self.pool_size,
            emit_rate: self.emit_rate,
            velocity: Vec3Table {
                x: t.velocity.x,
                y: t.velocity.y,
                z: t.velocity.z,
            },
            velocity_variation: t.velocity_variation,
            angular_velocity: QuatTable {
                x: t.angular_velocity.x,
                y: t.angular_velocity.y,
                z: t.angular_velocity.z,
                w: t.angular_velocity.w,
            },
            color_begin: t.color_begin,
            color_end: t.color_end,
            size_begin: t.size_begin,
            size_end: t.size_end,
            size_variation: t.size_variation,
            life_time: t.life_time,
        };
        Ok(toml::Value::try_from(table)?)
    }
}
