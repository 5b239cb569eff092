//! Particle state and the ring-buffer pool that owns it

use crate::rand::ParticleRng;
use crate::template::ParticleTemplate;
use cinder_core::{CinderError, Color, Result};
use glam::{Quat, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub position: Vec3,
    pub velocity: Vec3,
    pub angular_velocity: Quat,
    pub rotation: Quat,
    pub color_begin: Color,
    pub color_end: Color,
    pub size_begin: f32,
    pub size_end: f32,
    pub life_time: f32,
    pub life_remaining: f32,
    pub active: bool,
}

impl Default for Particle {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            angular_velocity: Quat::IDENTITY,
            rotation: Quat::IDENTITY,
            color_begin: Color::WHITE,
            color_end: Color::WHITE,
            size_begin: 0.0,
            size_end: 0.0,
            life_time: 0.0,
            life_remaining: 0.0,
            active: false,
        }
    }
}

impl Particle {
    /// Advance one step: age first, then move the survivors.
    ///
    /// Rotation uses the first-order update `q += 0.5 * dt * (w * q)` and is
    /// not renormalized.
    pub fn integrate(&mut self, dt: f32) {
        if !self.active {
            return;
        }
        self.life_remaining -= dt;
        if self.life_remaining <= 0.0 {
            self.active = false;
            return;
        }
        self.position += self.velocity * dt;
        self.rotation = self.rotation + (self.angular_velocity * self.rotation) * (0.5 * dt);
    }
}

/// Largest pool an emitter may allocate
pub const MAX_POOL_SIZE: usize = 100_000;

/// Reject pool sizes outside `1..=MAX_POOL_SIZE`
pub fn check_capacity(capacity: usize) -> Result<()> {
    if capacity == 0 || capacity > MAX_POOL_SIZE {
        return Err(CinderError::Config(format!(
            "particle pool_size must be between 1 and {}, got {}",
            MAX_POOL_SIZE, capacity
        )));
    }
    Ok(())
}

/// Fixed-capacity pool written through a cursor that walks backwards and
/// wraps, so a full pool overwrites its oldest particle
#[derive(Debug, Clone)]
pub struct ParticlePool {
    particles: Vec<Particle>,
    cursor: usize,
}

impl ParticlePool {
    pub fn new(capacity: usize) -> Result<Self> {
        check_capacity(capacity)?;
        Ok(Self {
            particles: vec![Particle::default(); capacity],
            cursor: capacity - 1,
        })
    }

    pub fn capacity(&self) -> usize {
        self.particles.len()
    }

    /// Slot the next emission writes
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn active(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter().filter(|p| p.active)
    }

    pub fn active_count(&self) -> usize {
        self.active().count()
    }

    /// Write a new particle at the cursor, whatever is there, and step the
    /// cursor back. Returns the slot written.
    pub fn emit(
        &mut self,
        template: &ParticleTemplate,
        position: Vec3,
        rotation: Quat,
        rng: &mut ParticleRng,
    ) -> usize {
        let slot = self.cursor;
        let particle = &mut self.particles[slot];

        particle.active = true;
        particle.position = position;
        particle.rotation = rotation;

        particle.velocity = template.velocity;
        particle.velocity.x += template.velocity_variation * rng.centered();
        particle.velocity.y += template.velocity_variation * rng.centered();
        particle.velocity.z += template.velocity_variation * rng.centered();

        particle.angular_velocity = template.angular_velocity;
        particle.color_begin = template.color_begin;
        particle.color_end = template.color_end;

        particle.life_time = template.life_time;
        particle.life_remaining = template.life_time;
        particle.size_begin = template.size_begin + template.size_variation * rng.centered();
        particle.size_end = template.size_end;

        let capacity = self.particles.len();
        self.cursor = (self.cursor + capacity - 1) % capacity;
        slot
    }

    pub fn integrate(&mut self, dt: f32) {
        for particle in &mut self.particles {
            particle.integrate(dt);
        }
    }

    /// Deactivate every particle and rewind the cursor
    pub fn clear(&mut self) {
        for particle in &mut self.particles {
            particle.active = false;
        }
        self.cursor = self.particles.len() - 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn still_template() -> ParticleTemplate {
        ParticleTemplate {
            velocity: Vec3::new(1.0, 0.0, 0.0),
            velocity_variation: 0.0,
            size_variation: 0.0,
            life_time: 1.0,
            ..ParticleTemplate::default()
        }
    }

    #[test]
    fn test_capacity_out_of_range_is_config_error() {
        assert!(matches!(ParticlePool::new(0), Err(CinderError::Config(_))));
        assert!(matches!(
            ParticlePool::new(MAX_POOL_SIZE + 1),
            Err(CinderError::Config(_))
        ));
        assert!(matches!(
            ParticlePool::new(usize::MAX),
            Err(CinderError::Config(_))
        ));
        assert_eq!(ParticlePool::new(MAX_POOL_SIZE).unwrap().capacity(), MAX_POOL_SIZE);
    }

    #[test]
    fn test_cursor_trace_for_pool_of_two() {
        let mut pool = ParticlePool::new(2).unwrap();
        let mut rng = ParticleRng::default();
        let template = still_template();

        assert_eq!(pool.cursor(), 1);
        assert_eq!(pool.emit(&template, Vec3::ZERO, Quat::IDENTITY, &mut rng), 1);
        assert_eq!(pool.cursor(), 0);
        assert_eq!(pool.emit(&template, Vec3::ZERO, Quat::IDENTITY, &mut rng), 0);
        assert_eq!(pool.cursor(), 1);
    }

    #[test]
    fn test_cursor_wraps_for_any_capacity() {
        let mut pool = ParticlePool::new(3).unwrap();
        let mut rng = ParticleRng::default();
        let template = still_template();
        let slots: Vec<usize> = (0..7)
            .map(|_| pool.emit(&template, Vec3::ZERO, Quat::IDENTITY, &mut rng))
            .collect();
        assert_eq!(slots, vec![2, 1, 0, 2, 1, 0, 2]);
        assert!(pool.cursor() < pool.capacity());
    }

    #[test]
    fn test_full_pool_overwrites_oldest() {
        let capacity = 4;
        let mut pool = ParticlePool::new(capacity).unwrap();
        let mut rng = ParticleRng::default();
        let template = still_template();

        for i in 0..=capacity {
            pool.emit(&template, Vec3::splat(i as f32), Quat::IDENTITY, &mut rng);
        }

        assert_eq!(pool.active_count(), capacity);
        // The first emission went to slot N-1 and was replaced by the last
        assert_eq!(pool.particles()[capacity - 1].position, Vec3::splat(capacity as f32));
        assert_eq!(pool.cursor(), capacity - 2);
    }

    #[test]
    fn test_emission_jitters_within_variation() {
        let mut pool = ParticlePool::new(64).unwrap();
        let mut rng = ParticleRng::new(99);
        let template = ParticleTemplate {
            velocity_variation: 2.0,
            size_begin: 1.0,
            size_variation: 0.5,
            ..ParticleTemplate::default()
        };
        for _ in 0..64 {
            pool.emit(&template, Vec3::ZERO, Quat::IDENTITY, &mut rng);
        }
        for p in pool.particles() {
            let dv = p.velocity - template.velocity;
            assert!(dv.abs().max_element() <= 1.0);
            assert!((p.size_begin - 1.0).abs() <= 0.25);
            assert_eq!(p.life_remaining, p.life_time);
        }
    }

    #[test]
    fn test_particle_dies_when_life_runs_out() {
        let mut pool = ParticlePool::new(1).unwrap();
        let mut rng = ParticleRng::default();
        pool.emit(&still_template(), Vec3::ZERO, Quat::IDENTITY, &mut rng);

        pool.integrate(0.5);
        assert_eq!(pool.active_count(), 1);
        assert!((pool.particles()[0].position.x - 0.5).abs() < 1e-6);

        pool.integrate(0.5);
        assert_eq!(pool.active_count(), 0);
        // Dead particles no longer move
        assert!((pool.particles()[0].position.x - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_rotation_follows_angular_velocity_without_renormalizing() {
        let mut particle = Particle {
            active: true,
            life_time: 10.0,
            life_remaining: 10.0,
            angular_velocity: Quat::from_xyzw(0.0, 0.0, 1.0, 0.0),
            ..Particle::default()
        };
        particle.integrate(0.1);

        let expected = Quat::IDENTITY + Quat::from_xyzw(0.0, 0.0, 1.0, 0.0) * 0.05;
        assert!((particle.rotation.z - expected.z).abs() < 1e-6);
        assert!((particle.rotation.w - 1.0).abs() < 1e-6);
        assert!(particle.rotation.length() > 1.0);
    }

    #[test]
    fn test_clear_resets_cursor() {
        let mut pool = ParticlePool::new(5).unwrap();
        let mut rng = ParticleRng::default();
        pool.emit(&still_template(), Vec3::ZERO, Quat::IDENTITY, &mut rng);
        pool.clear();
        assert_eq!(pool.active_count(), 0);
        assert_eq!(pool.cursor(), 4);
    }
}
