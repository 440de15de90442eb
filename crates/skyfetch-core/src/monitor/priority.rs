//! The priority dial and everything derived from it.

use std::time::Duration;

/// Caller-supplied aggressiveness in `[0.1, 1.0]`; out-of-range values are clamped.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Priority(f64);

impl Priority {
    pub const MIN: f64 = 0.1;
    pub const MAX: f64 = 1.0;
    pub const DEFAULT: f64 = 0.5;

    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self(Self::DEFAULT);
        }
        Self(value.clamp(Self::MIN, Self::MAX))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// CPU utilisation (percent) above which dispatch pauses.
    pub fn cpu_threshold(self) -> f64 {
        80.0 - 20.0 * self.0
    }

    /// Available memory (GiB) below which dispatch pauses.
    pub fn mem_threshold_gb(self) -> f64 {
        1.0 + 2.0 * self.0
    }

    /// Concurrent workers for the whole run; chosen once, never re-evaluated.
    pub fn worker_count(self) -> usize {
        if self.0 < 0.3 {
            2
        } else if self.0 < 0.7 {
            4
        } else {
            6
        }
    }

    /// Sleep length of one adaptive pause: `15 + (1 - p) * 45` seconds, capped.
    pub fn pause_duration(self, cap: Duration) -> Duration {
        Duration::from_secs_f64(15.0 + (1.0 - self.0) * 45.0).min(cap)
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}
