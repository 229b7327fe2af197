//! Scaled application clock.

/// Application run time that can be sped up, slowed down or paused
/// independently of the wall clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunTime {
    /// Scaled seconds since start.
    pub current: f64,
    /// Multiplier applied to real time.
    pub speed: f32,
    /// While paused, time does not advance.
    pub paused: bool,
    /// Scaled length of the last step in seconds.
    pub delta: f32,
}

impl Default for RunTime {
    fn default() -> Self {
        Self {
            current: 0.0,
            speed: 1.0,
            paused: false,
            delta: 0.0,
        }
    }
}

impl RunTime {
    /// Advance by `real_dt` wall-clock seconds and return the scaled step.
    pub fn advance(&mut self, real_dt: f32) -> f32 {
        let dt = if self.paused {
            0.0
        } else {
            real_dt.max(0.0) * self.speed
        };
        self.delta = dt;
        self.current += f64::from(dt);
        dt
    }

    /// Set the speed multiplier (never negative).
    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed.max(0.0);
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    /// Back to zero, keeping speed and pause state.
    pub fn reset(&mut self) {
        self.current = 0.0;
        self.delta = 0.0;
    }
}
