//! Frame timing

use std::time::Duration;

/// Fixed-step clock driving `Scene::update`
pub struct FrameClock {
    delta_time: f32,
    total_time: f32,
    frame_count: u64,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    /// Create a clock at time zero
    pub fn new() -> Self {
        Self {
            delta_time: 0.0,
            total_time: 0.0,
            frame_count: 0,
        }
    }

    /// Advance by a fixed step, returning it in seconds
    pub fn tick_fixed(&mut self, step: Duration) -> f32 {
        self.delta_time = step.as_secs_f32();
        self.total_time += self.delta_time;
        self.frame_count += 1;
        self.delta_time
    }

    /// Seconds covered by the last tick
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Seconds accumulated over all ticks
    pub fn total_time(&self) -> f32 {
        self.total_time
    }

    /// Number of ticks so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Average frames per second over the clock's lifetime
    pub fn average_fps(&self) -> f32 {
        if self.total_time > 0.0 {
            self.frame_count as f32 / self.total_time
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_ticks_accumulate() {
        let mut clock = FrameClock::new();
        for _ in 0..4 {
            clock.tick_fixed(Duration::from_millis(250));
        }

        assert_eq!(clock.frame_count(), 4);
        assert!((clock.total_time() - 1.0).abs() < 1e-6);
        assert!((clock.average_fps() - 4.0).abs() < 1e-4);
    }

    #[test]
    fn test_fresh_clock_reports_zero_fps() {
        let clock = FrameClock::new();
        assert_eq!(clock.average_fps(), 0.0);
        assert_eq!(clock.delta_time(), 0.0);
    }
}
