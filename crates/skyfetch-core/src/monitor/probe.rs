//! Host load measurement.
//!
//! [`ProcProbe`] reads Linux procfs: CPU utilisation is the busy share of
//! jiffies between two consecutive measurements, available memory is
//! `MemAvailable` from `/proc/meminfo` (falling back to `sysinfo(2)` free +
//! buffer RAM on kernels that do not report it).

use std::io;
use std::sync::Mutex;

const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// One instantaneous reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostLoad {
    pub cpu_percent: f64,
    pub mem_available_gb: f64,
}

/// Source of host load readings. Implementations must be cheap to call; the
/// monitor invokes them while holding its state lock.
pub trait HostProbe: Send + Sync {
    fn measure(&self) -> io::Result<HostLoad>;
}

/// Aggregate CPU jiffies from the first line of `/proc/stat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CpuTimes {
    busy: u64,
    total: u64,
}

fn parse_cpu_line(stat: &str) -> Option<CpuTimes> {
    let line = stat.lines().find(|l| l.starts_with("cpu "))?;
    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .take(8) // user nice system idle iowait irq softirq steal
        .map(|f| f.parse().ok())
        .collect::<Option<_>>()?;
    if fields.len() < 4 {
        return None;
    }
    let total: u64 = fields.iter().sum();
    let idle = fields[3] + fields.get(4).copied().unwrap_or(0);
    Some(CpuTimes {
        busy: total.saturating_sub(idle),
        total,
    })
}

fn cpu_percent_between(prev: CpuTimes, now: CpuTimes) -> f64 {
    let total = now.total.saturating_sub(prev.total);
    if total == 0 {
        return 0.0;
    }
    let busy = now.busy.saturating_sub(prev.busy);
    (busy as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
}

/// `MemAvailable` in GiB.
fn parse_mem_available(meminfo: &str) -> Option<f64> {
    let line = meminfo.lines().find(|l| l.starts_with("MemAvailable:"))?;
    let kib: f64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some(kib * 1024.0 / BYTES_PER_GIB)
}

#[cfg(target_os = "linux")]
fn sysinfo_free_gb() -> io::Result<f64> {
    // SAFETY: sysinfo only writes into the zeroed struct we pass.
    let mut info: libc::sysinfo = unsafe { std::mem::zeroed() };
    let r = unsafe { libc::sysinfo(&mut info) };
    if r != 0 {
        return Err(io::Error::last_os_error());
    }
    let unit = info.mem_unit.max(1) as f64;
    Ok((info.freeram as f64 + info.bufferram as f64) * unit / BYTES_PER_GIB)
}

#[cfg(not(target_os = "linux"))]
fn sysinfo_free_gb() -> io::Result<f64> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "available memory is only measured on Linux",
    ))
}

/// procfs-backed probe. Construction takes the baseline CPU reading, so the
/// first measurement reports utilisation since the probe was created.
#[derive(Debug)]
pub struct ProcProbe {
    previous: Mutex<Option<CpuTimes>>,
}

impl ProcProbe {
    pub fn new() -> Self {
        let baseline = std::fs::read_to_string("/proc/stat")
            .ok()
            .and_then(|s| parse_cpu_line(&s));
        Self {
            previous: Mutex::new(baseline),
        }
    }

    fn cpu_percent(&self) -> io::Result<f64> {
        let stat = std::fs::read_to_string("/proc/stat")?;
        let now = parse_cpu_line(&stat)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "unrecognised /proc/stat"))?;
        let mut previous = match self.previous.lock() {
            Ok(p) => p,
            Err(poisoned) => poisoned.into_inner(),
        };
        let pct = previous.map(|p| cpu_percent_between(p, now)).unwrap_or(0.0);
        *previous = Some(now);
        Ok(pct)
    }

    fn mem_available_gb(&self) -> io::Result<f64> {
        match std::fs::read_to_string("/proc/meminfo") {
            Ok(info) => match parse_mem_available(&info) {
                Some(gb) => Ok(gb),
                None => sysinfo_free_gb(),
            },
            Err(_) => sysinfo_free_gb(),
        }
    }
}

impl Default for ProcProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl HostProbe for ProcProbe {
    fn measure(&self) -> io::Result<HostLoad> {
        Ok(HostLoad {
            cpu_percent: self.cpu_percent()?,
            mem_available_gb: self.mem_available_gb()?,
        })
    }
}
