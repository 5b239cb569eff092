//! Frame clock

use crate::config::ClockConfig;
use std::time::Instant;

/// Tracks frame time handed to the renderer
pub struct FrameClock {
    /// Total elapsed time in seconds; the timestamp of the current frame
    pub total_time: f64,
    /// Time since the previous frame in seconds
    pub delta_time: f64,
    /// Longest wall-clock step a single frame may advance
    pub max_delta: f64,
    /// Advance by exactly this much each frame, ignoring the wall clock
    pub fixed_delta: Option<f64>,
    last_instant: Instant,
    first_tick: bool,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(&ClockConfig::default())
    }
}

impl FrameClock {
    pub fn new(config: &ClockConfig) -> Self {
        Self {
            total_time: 0.0,
            delta_time: 0.0,
            max_delta: config.max_delta,
            fixed_delta: config.fixed_delta,
            last_instant: Instant::now(),
            first_tick: true,
        }
    }

    /// Clock stepping `delta` seconds per frame
    pub fn fixed(delta: f64) -> Self {
        Self::new(&ClockConfig {
            fixed_delta: Some(delta),
            ..ClockConfig::default()
        })
    }

    /// Advance the clock. Call once per frame; returns the frame timestamp.
    pub fn tick(&mut self) -> f64 {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_instant).as_secs_f64();
        self.last_instant = now;
        self.advance(elapsed)
    }

    /// Advance by a measured `elapsed` time. The first frame stays at zero.
    pub fn advance(&mut self, elapsed: f64) -> f64 {
        if self.first_tick {
            self.first_tick = false;
            self.delta_time = 0.0;
            return self.total_time;
        }

        self.delta_time = match self.fixed_delta {
            Some(fixed) => fixed,
            None => elapsed.clamp(0.0, self.max_delta),
        };
        self.total_time += self.delta_time;
        self.total_time
    }
}
