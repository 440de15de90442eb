use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::job::CutoutEndpoint;
use crate::monitor::MonitorConfig;

/// Global configuration loaded from `~/.config/skyfetch/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkyfetchConfig {
    /// Per-request HTTP timeout in seconds.
    pub request_timeout_secs: u64,
    /// Emit a progress line every N completions.
    pub progress_every: usize,
    /// Re-check host load after every N completions, in addition to before each dispatch.
    pub recheck_every: usize,
    /// Checkpoint log file name inside the output directory.
    pub checkpoint_file_name: String,
    /// Failure list file name inside the output directory.
    pub failure_file_name: String,
    /// Optional cutout service override; if missing, the Legacy Survey DR9 viewer is used.
    #[serde(default)]
    pub endpoint: Option<CutoutEndpoint>,
    /// Optional monitor cadence override; if missing, built-in defaults are used.
    #[serde(default)]
    pub monitor: Option<MonitorConfig>,
}

impl Default for SkyfetchConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            progress_every: 10,
            recheck_every: 50,
            checkpoint_file_name: "download_checkpoint.txt".to_string(),
            failure_file_name: "failed_objects.csv".to_string(),
            endpoint: None,
            monitor: None,
        }
    }
}

impl SkyfetchConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn endpoint(&self) -> CutoutEndpoint {
        self.endpoint.clone().unwrap_or_default()
    }

    pub fn monitor(&self) -> MonitorConfig {
        self.monitor.clone().unwrap_or_default()
    }

    /// Reject values that would make a run misbehave.
    pub fn validate(&self) -> Result<()> {
        self.endpoint().validate()?;
        for (field, name) in [
            ("checkpoint_file_name", &self.checkpoint_file_name),
            ("failure_file_name", &self.failure_file_name),
        ] {
            if name.is_empty() || name.contains('/') || name.contains('\\') {
                anyhow::bail!("{} must be a plain file name, got {:?}", field, name);
            }
        }
        Ok(())
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("skyfetch")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<SkyfetchConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = SkyfetchConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Load configuration from an explicit path (no default file is created).
pub fn load_from_path(path: &Path) -> Result<SkyfetchConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let cfg: SkyfetchConfig =
        toml::from_str(&data).with_context(|| format!("invalid config {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}
