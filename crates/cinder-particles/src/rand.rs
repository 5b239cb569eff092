//! Lightweight xorshift32 PRNG for emission jitter

#[derive(Debug, Clone)]
pub struct ParticleRng {
    state: u32,
}

impl ParticleRng {
    pub fn new(seed: u32) -> Self {
        Self {
            state: if seed == 0 { 1 } else { seed },
        }
    }

    fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    /// Returns a float in [0, 1)
    pub fn next_f32(&mut self) -> f32 {
        // 24 bits fit exactly in an f32 mantissa
        (self.next_u32() >> 8) as f32 / (1u32 << 24) as f32
    }

    /// Returns a float in [-0.5, 0.5)
    pub fn centered(&mut self) -> f32 {
        self.next_f32() - 0.5
    }
}

impl Default for ParticleRng {
    fn default() -> Self {
        Self::new(0xDEAD_BEEF)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floats_stay_in_unit_range() {
        let mut rng = ParticleRng::new(12345);
        for _ in 0..10_000 {
            let v = rng.next_f32();
            assert!((0.0..1.0).contains(&v));
            let c = rng.centered();
            assert!((-0.5..0.5).contains(&c));
        }
    }

    #[test]
    fn test_zero_seed_is_usable() {
        let mut rng = ParticleRng::new(0);
        assert_ne!(rng.next_u32(), 0);
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = ParticleRng::new(7);
        let mut b = ParticleRng::new(7);
        for _ in 0..16 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
    }
}
