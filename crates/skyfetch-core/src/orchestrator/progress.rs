//! Progress reporting for a run (jobs done, rate, ETA).
//!
//! Sent to the CLI every few completions; consumers can compute
//! rate = completed / elapsed_secs and ETA = (total - completed) / rate.

/// Snapshot of run progress (CLI-friendly).
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressStats {
    /// Jobs that reached a terminal outcome so far.
    pub completed: usize,
    /// Jobs dispatched to the pool in this run (excludes already-present ones).
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Elapsed time since the first dispatch (seconds).
    pub elapsed_secs: f64,
}

impl ProgressStats {
    /// Completion rate in jobs per second (0 if elapsed is 0).
    pub fn jobs_per_sec(&self) -> f64 {
        if self.elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.completed as f64 / self.elapsed_secs
    }

    /// Estimated seconds remaining (None if rate is 0).
    pub fn eta_secs(&self) -> Option<f64> {
        let remaining = self.total.saturating_sub(self.completed);
        if remaining == 0 {
            return Some(0.0);
        }
        let rate = self.jobs_per_sec();
        if rate <= 0.0 {
            return None;
        }
        Some(remaining as f64 / rate)
    }

    /// Fraction complete in [0.0, 1.0].
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        (self.completed as f64 / self.total as f64).min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(completed: usize, total: usize, elapsed_secs: f64) -> ProgressStats {
        ProgressStats {
            completed,
            total,
            succeeded: completed,
            failed: 0,
            elapsed_secs,
        }
    }

    #[test]
    fn rate_and_eta() {
        let s = stats(10, 40, 5.0);
        assert!((s.jobs_per_sec() - 2.0).abs() < 1e-9);
        assert_eq!(s.eta_secs(), Some(15.0));
        assert!((s.fraction() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn eta_unknown_before_any_time_passes() {
        assert_eq!(stats(0, 10, 0.0).eta_secs(), None);
        assert_eq!(stats(10, 10, 0.0).eta_secs(), Some(0.0));
        assert_eq!(stats(0, 0, 0.0).fraction(), 1.0);
    }
}
