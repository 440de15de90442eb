//! Host resource monitor and dispatch throttle.
//!
//! The monitor samples host load on a slow cadence and turns it into a
//! cooperative pause: the dispatcher calls [`ResourceMonitor::adaptive_wait`]
//! before starting the next job. Transfers already running are never
//! interrupted.
//!
//! Thresholds and pool size come from a single [`Priority`] dial:
//! - CPU threshold `80 - 20p` percent (breach → 30 s cooldown)
//! - available memory threshold `1 + 2p` GiB (breach → 45 s cooldown)
//! - pause length `min(60, 15 + (1 - p) * 45)` seconds
//! - workers: 2 below 0.3, 4 below 0.7, else 6

mod priority;
mod probe;

pub use priority::Priority;
pub use probe::{HostLoad, HostProbe, ProcProbe};

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Monitor cadence and cooldown lengths (optional `[monitor]` in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Minimum seconds between two host measurements.
    pub sample_interval_secs: u64,
    /// Cooldown after a CPU threshold breach.
    pub cpu_cooldown_secs: u64,
    /// Cooldown after a memory threshold breach.
    pub mem_cooldown_secs: u64,
    /// Upper bound on a single adaptive pause.
    pub max_pause_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sample_interval_secs: 15,
            cpu_cooldown_secs: 30,
            mem_cooldown_secs: 45,
            max_pause_secs: 60,
        }
    }
}

/// One host measurement.
#[derive(Debug, Clone, Copy)]
pub struct ResourceSample {
    pub cpu_percent: f64,
    pub mem_available_gb: f64,
    pub taken_at: Instant,
}

/// While `now < cooldown_until` no new job may be dispatched.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThrottleState {
    pub cooldown_until: Option<Instant>,
}

impl ThrottleState {
    pub fn is_cooling(&self, now: Instant) -> bool {
        self.cooldown_until.map(|t| now < t).unwrap_or(false)
    }
}

/// Result of [`ResourceMonitor::adaptive_wait`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Proceed,
    Paused(Duration),
}

#[derive(Debug)]
struct MonitorState {
    /// Time of the last measurement; starts at construction so the first
    /// real measurement happens one interval into the run.
    last_measured: Instant,
    last_sample: Option<ResourceSample>,
    throttle: ThrottleState,
}

/// Shared throttle. Every decision runs under one lock, so concurrent callers
/// observe a single cooldown rather than racing to compute their own.
pub struct ResourceMonitor {
    priority: Priority,
    settings: MonitorConfig,
    probe: Box<dyn HostProbe>,
    state: Mutex<MonitorState>,
}

impl std::fmt::Debug for ResourceMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceMonitor")
            .field("priority", &self.priority)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl ResourceMonitor {
    pub fn new(priority: Priority, settings: MonitorConfig, probe: Box<dyn HostProbe>) -> Self {
        Self {
            priority,
            settings,
            probe,
            state: Mutex::new(MonitorState {
                last_measured: Instant::now(),
                last_sample: None,
                throttle: ThrottleState::default(),
            }),
        }
    }

    /// Monitor backed by procfs with default settings.
    pub fn for_host(priority: Priority) -> Self {
        Self::new(priority, MonitorConfig::default(), Box::new(ProcProbe::new()))
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    fn lock(&self) -> MutexGuard<'_, MonitorState> {
        match self.state.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn last_sample(&self) -> Option<ResourceSample> {
        self.lock().last_sample
    }

    pub fn throttle_state(&self) -> ThrottleState {
        self.lock().throttle
    }

    /// Measure the host if the sampling interval has elapsed; `None` means
    /// the previous measurement still stands and is treated as "ok".
    pub fn sample(&self) -> Option<ResourceSample> {
        let mut state = self.lock();
        self.sample_locked(&mut state, Instant::now())
    }

    fn sample_locked(&self, state: &mut MonitorState, now: Instant) -> Option<ResourceSample> {
        let interval = Duration::from_secs(self.settings.sample_interval_secs);
        if now.saturating_duration_since(state.last_measured) < interval {
            return None;
        }
        state.last_measured = now;
        match self.probe.measure() {
            Ok(load) => {
                let sample = ResourceSample {
                    cpu_percent: load.cpu_percent,
                    mem_available_gb: load.mem_available_gb,
                    taken_at: now,
                };
                tracing::debug!(
                    cpu = sample.cpu_percent,
                    mem_gb = sample.mem_available_gb,
                    "host sample"
                );
                state.last_sample = Some(sample);
                Some(sample)
            }
            Err(e) => {
                tracing::warn!(error = %e, "host measurement failed; assuming ok");
                None
            }
        }
    }

    /// True while a cooldown is active, or when a fresh measurement breaches a
    /// threshold (which starts a new cooldown).
    pub fn should_pause(&self) -> bool {
        let now = Instant::now();
        let mut state = self.lock();
        if state.throttle.is_cooling(now) {
            return true;
        }
        let Some(sample) = self.sample_locked(&mut state, now) else {
            return false;
        };

        let cpu_threshold = self.priority.cpu_threshold();
        if sample.cpu_percent > cpu_threshold {
            tracing::warn!(
                cpu = sample.cpu_percent,
                threshold = cpu_threshold,
                "CPU usage high, pausing downloads"
            );
            state.throttle.cooldown_until =
                Some(now + Duration::from_secs(self.settings.cpu_cooldown_secs));
            return true;
        }

        let mem_threshold = self.priority.mem_threshold_gb();
        if sample.mem_available_gb < mem_threshold {
            tracing::warn!(
                mem_gb = sample.mem_available_gb,
                threshold = mem_threshold,
                "available memory low, pausing downloads"
            );
            state.throttle.cooldown_until =
                Some(now + Duration::from_secs(self.settings.mem_cooldown_secs));
            return true;
        }
        false
    }

    pub fn pause_duration(&self) -> Duration {
        self.priority
            .pause_duration(Duration::from_secs(self.settings.max_pause_secs))
    }

    /// Sleep for [`Self::pause_duration`] if the host is busy.
    pub async fn adaptive_wait(&self) -> WaitOutcome {
        if !self.should_pause() {
            return WaitOutcome::Proceed;
        }
        let pause = self.pause_duration();
        tracing::info!(secs = pause.as_secs_f64(), "system busy, sleeping");
        tokio::time::sleep(pause).await;
        WaitOutcome::Paused(pause)
    }

    /// Repeat [`Self::adaptive_wait`] until it lets dispatch proceed. Returns
    /// the total time spent paused.
    pub async fn wait_until_clear(&self) -> Duration {
        let mut paused = Duration::ZERO;
        while let WaitOutcome::Paused(d) = self.adaptive_wait().await {
            paused += d;
        }
        paused
    }
}
