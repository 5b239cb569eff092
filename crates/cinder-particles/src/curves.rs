//! Value-over-lifetime interpolation
//!
//! `life` runs from 1 at emission down to 0 at death.

use cinder_core::Color;

/// Remaining fraction of a particle's life, or `None` for a zero or
/// negative life time
pub fn life_fraction(life_remaining: f32, life_time: f32) -> Option<f32> {
    if life_time <= 0.0 {
        return None;
    }
    Some(life_remaining / life_time)
}

/// `begin` at life 1, `end` at life 0
pub fn size_over_life(begin: f32, end: f32, life: f32) -> f32 {
    begin * life + end * (1.0 - life)
}

/// `begin` at life 1, `end` at life 0
pub fn color_over_life(begin: &Color, end: &Color, life: f32) -> Color {
    end.lerp(begin, life)
}
