//! Background resource-pressure monitor. Samples CPU/memory/disk on its own
//! loop, independent of the pipeline's worker threads, and exposes only the
//! latest snapshot plus a pressure flag — no history is retained.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use systemstat::{Platform, System};

/// A single resource sample. Memory/disk ratios are in `[0, 1]`; CPU is a
/// percentage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceUsage {
    pub total_memory_bytes: u64,
    pub available_memory_bytes: u64,
    pub used_memory_bytes: u64,
    pub memory_usage_ratio: f64,
    pub cpu_usage_percent: f64,
    pub total_disk_bytes: u64,
    pub available_disk_bytes: u64,
    pub disk_usage_ratio: f64,
    pub timestamp: u64,
}

/// Per-resource warning/critical thresholds plus the memory floor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceMonitorConfig {
    pub check_interval: Duration,
    pub memory_warning: f64,
    pub memory_critical: f64,
    pub cpu_warning: f64,
    pub cpu_critical: f64,
    pub disk_warning: f64,
    pub disk_critical: f64,
    pub memory_headroom_mb: u64,
}

impl Default for ResourceMonitorConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(30),
            memory_warning: 0.80,
            memory_critical: 0.95,
            cpu_warning: 80.0,
            cpu_critical: 95.0,
            disk_warning: 0.85,
            disk_critical: 0.95,
            memory_headroom_mb: 512,
        }
    }
}

/// Severity of the current resource condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressureLevel {
    Normal,
    Warning,
    Critical,
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// A source of raw system measurements. Production wires this to the OS;
/// tests substitute a fixed or scripted source.
pub trait SystemSampler: Send + Sync {
    fn sample(&self) -> ResourceUsage;
}

/// Reads real host metrics through `systemstat`: `/proc/meminfo`-equivalent
/// memory totals, an aggregate CPU load sampled over a short window, and
/// free space on the configured mount point. Any measurement that fails
/// (unsupported platform, missing mount) degrades to zero rather than
/// aborting the rest of the sample.
pub struct SystemStatSampler {
    system: System,
    disk_mount: String,
    cpu_sample_window: Duration,
}

impl SystemStatSampler {
    pub fn new(disk_mount: impl Into<String>) -> Self {
        Self {
            system: System::new(),
            disk_mount: disk_mount.into(),
            cpu_sample_window: Duration::from_millis(200),
        }
    }
}

impl Default for SystemStatSampler {
    fn default() -> Self {
        Self::new("/")
    }
}

impl SystemSampler for SystemStatSampler {
    fn sample(&self) -> ResourceUsage {
        let (total_memory_bytes, available_memory_bytes, used_memory_bytes, memory_usage_ratio) =
            match self.system.memory() {
                Ok(mem) => {
                    let total = mem.total.as_u64();
                    let available = mem.free.as_u64();
                    let used = total.saturating_sub(available);
                    let ratio = if total > 0 { used as f64 / total as f64 } else { 0.0 };
                    (total, available, used, ratio)
                }
                Err(e) => {
                    tracing::debug!(error = %e, "failed to read memory stats");
                    (0, 0, 0, 0.0)
                }
            };

        let cpu_usage_percent = match self.system.cpu_load_aggregate() {
            Ok(measurement) => {
                thread::sleep(self.cpu_sample_window);
                match measurement.done() {
                    Ok(load) => (1.0 - load.idle as f64) * 100.0,
                    Err(e) => {
                        tracing::debug!(error = %e, "failed to finish cpu load measurement");
                        0.0
                    }
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "failed to start cpu load measurement");
                0.0
            }
        };

        let (total_disk_bytes, available_disk_bytes, disk_usage_ratio) =
            match self.system.mount_at(&self.disk_mount) {
                Ok(mount) => {
                    let total = mount.total.as_u64();
                    let available = mount.avail.as_u64();
                    let used = total.saturating_sub(available);
                    let ratio = if total > 0 { used as f64 / total as f64 } else { 0.0 };
                    (total, available, ratio)
                }
                Err(e) => {
                    tracing::debug!(error = %e, mount = %self.disk_mount, "failed to read disk stats");
                    (0, 0, 0.0)
                }
            };

        ResourceUsage {
            total_memory_bytes,
            available_memory_bytes,
            used_memory_bytes,
            memory_usage_ratio,
            cpu_usage_percent,
            total_disk_bytes,
            available_disk_bytes,
            disk_usage_ratio,
            timestamp: now_unix(),
        }
    }
}

struct Shared {
    memory_ratio_bits: AtomicU64,
    cpu_percent_bits: AtomicU64,
    disk_ratio_bits: AtomicU64,
    available_memory_mb: AtomicU64,
    timestamp: AtomicU64,
    pressure: AtomicBool,
    critical: AtomicBool,
}

impl Shared {
    fn store(&self, usage: &ResourceUsage, level: PressureLevel) {
        self.memory_ratio_bits
            .store(usage.memory_usage_ratio.to_bits(), Ordering::Relaxed);
        self.cpu_percent_bits
            .store(usage.cpu_usage_percent.to_bits(), Ordering::Relaxed);
        self.disk_ratio_bits
            .store(usage.disk_usage_ratio.to_bits(), Ordering::Relaxed);
        self.available_memory_mb.store(
            usage.available_memory_bytes / (1024 * 1024),
            Ordering::Relaxed,
        );
        self.timestamp.store(usage.timestamp, Ordering::Relaxed);
        self.pressure
            .store(level != PressureLevel::Normal, Ordering::Relaxed);
        self.critical
            .store(level == PressureLevel::Critical, Ordering::Relaxed);
    }
}

/// A cheap, cloneable read-only view onto a [`ResourceMonitor`]'s latest
/// sample, for stage threads that only need to poll pressure state.
#[derive(Clone)]
pub struct ResourceMonitorHandle {
    shared: Arc<Shared>,
}

impl ResourceMonitorHandle {
    pub fn pressure(&self) -> bool {
        self.shared.pressure.load(Ordering::Relaxed)
    }

    pub fn critical(&self) -> bool {
        self.shared.critical.load(Ordering::Relaxed)
    }
}

/// Runs the sampling loop on its own background thread.
pub struct ResourceMonitor {
    shared: Arc<Shared>,
    exit: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ResourceMonitor {
    pub fn spawn(config: ResourceMonitorConfig, sampler: Arc<dyn SystemSampler>) -> Self {
        let shared = Arc::new(Shared {
            memory_ratio_bits: AtomicU64::new(0),
            cpu_percent_bits: AtomicU64::new(0),
            disk_ratio_bits: AtomicU64::new(0),
            available_memory_mb: AtomicU64::new(u64::MAX),
            timestamp: AtomicU64::new(0),
            pressure: AtomicBool::new(false),
            critical: AtomicBool::new(false),
        });
        let exit = Arc::new(AtomicBool::new(false));

        let loop_shared = shared.clone();
        let loop_exit = exit.clone();
        let handle = thread::Builder::new()
            .name("resource-monitor".into())
            .spawn(move || {
                while !loop_exit.load(Ordering::Relaxed) {
                    let usage = sampler.sample();
                    let level = classify(&usage, &config);
                    loop_shared.store(&usage, level);
                    if level != PressureLevel::Normal {
                        tracing::warn!(?level, memory_ratio = usage.memory_usage_ratio, "resource pressure detected");
                    }
                    thread::sleep(config.check_interval);
                }
            })
            .expect("failed to spawn resource-monitor thread");

        Self {
            shared,
            exit,
            handle: Some(handle),
        }
    }

    pub fn pressure(&self) -> bool {
        self.shared.pressure.load(Ordering::Relaxed)
    }

    pub fn critical(&self) -> bool {
        self.shared.critical.load(Ordering::Relaxed)
    }

    /// A cloneable handle other threads can poll without touching the join
    /// handle or shutdown path.
    pub fn handle(&self) -> ResourceMonitorHandle {
        ResourceMonitorHandle {
            shared: self.shared.clone(),
        }
    }

    pub fn latest(&self) -> ResourceSnapshot {
        ResourceSnapshot {
            memory_usage_ratio: f64::from_bits(self.shared.memory_ratio_bits.load(Ordering::Relaxed)),
            cpu_usage_percent: f64::from_bits(self.shared.cpu_percent_bits.load(Ordering::Relaxed)),
            disk_usage_ratio: f64::from_bits(self.shared.disk_ratio_bits.load(Ordering::Relaxed)),
            available_memory_mb: self.shared.available_memory_mb.load(Ordering::Relaxed),
            timestamp: self.shared.timestamp.load(Ordering::Relaxed),
        }
    }

    pub fn shutdown(mut self) {
        self.exit.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// A point-in-time copy of the monitor's latest reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceSnapshot {
    pub memory_usage_ratio: f64,
    pub cpu_usage_percent: f64,
    pub disk_usage_ratio: f64,
    pub available_memory_mb: u64,
    pub timestamp: u64,
}

fn classify(usage: &ResourceUsage, config: &ResourceMonitorConfig) -> PressureLevel {
    let available_mb = usage.available_memory_bytes / (1024 * 1024);
    if usage.memory_usage_ratio >= config.memory_critical
        || usage.cpu_usage_percent >= config.cpu_critical
        || usage.disk_usage_ratio >= config.disk_critical
        || available_mb < config.memory_headroom_mb
    {
        return PressureLevel::Critical;
    }
    if usage.memory_usage_ratio >= config.memory_warning
        || usage.cpu_usage_percent >= config.cpu_warning
        || usage.disk_usage_ratio >= config.disk_warning
    {
        return PressureLevel::Warning;
    }
    PressureLevel::Normal
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(memory_ratio: f64, available_mb: u64) -> ResourceUsage {
        ResourceUsage {
            total_memory_bytes: 16 * 1024 * 1024 * 1024,
            available_memory_bytes: available_mb * 1024 * 1024,
            used_memory_bytes: 0,
            memory_usage_ratio: memory_ratio,
            cpu_usage_percent: 10.0,
            total_disk_bytes: 0,
            available_disk_bytes: 0,
            disk_usage_ratio: 0.1,
            timestamp: 0,
        }
    }

    #[test]
    fn classifies_normal_below_thresholds() {
        let config = ResourceMonitorConfig::default();
        assert_eq!(classify(&usage(0.5, 8192), &config), PressureLevel::Normal);
    }

    #[test]
    fn classifies_warning_at_memory_threshold() {
        let config = ResourceMonitorConfig::default();
        assert_eq!(classify(&usage(0.85, 8192), &config), PressureLevel::Warning);
    }

    #[test]
    fn classifies_critical_below_headroom_floor_regardless_of_ratio() {
        let config = ResourceMonitorConfig::default();
        assert_eq!(classify(&usage(0.1, 100), &config), PressureLevel::Critical);
    }

    #[test]
    fn monitor_reports_pressure_after_one_tick() {
        struct Hot;
        impl SystemSampler for Hot {
            fn sample(&self) -> ResourceUsage {
                usage(0.99, 100)
            }
        }
        let config = ResourceMonitorConfig {
            check_interval: Duration::from_millis(5),
            ..ResourceMonitorConfig::default()
        };
        let monitor = ResourceMonitor::spawn(config, Arc::new(Hot));
        thread::sleep(Duration::from_millis(50));
        assert!(monitor.pressure());
        assert!(monitor.critical());
        monitor.shutdown();
    }
}
