// The sysinfo-backed readings that every machine has.
// GPU and audio live in their own gated providers; these are always present.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use log::debug;
use sysinfo::{Disk, Disks, System, MINIMUM_CPU_UPDATE_INTERVAL};

use crate::telemetry::Usage;

const BYTES_PER_MB: u64 = 1024 * 1024;
const BYTES_PER_GB: u64 = 1024 * 1024 * 1024;

/// First Windows build that ships as Windows 11
const WINDOWS_11_BUILD: u32 = 22000;

/// The always-available readings: OS, uptime, CPU, memory and system drive.
/// Each method is one provider; `None` means the reading failed this tick.
pub trait SystemSource {
    fn os_name(&mut self) -> Option<String>;
    fn uptime(&mut self) -> Option<Duration>;
    fn cpu_model(&mut self) -> Option<String>;
    fn cpu_usage(&mut self) -> Option<f32>;
    /// Used / total in MB
    fn memory(&mut self) -> Option<Usage>;
    /// Used / total of the system drive in GB
    fn disk(&mut self) -> Option<Usage>;
}

pub struct SysinfoSource {
    system: System,
    // When the CPU counters were last sampled; usage is the delta since then
    cpu_baseline: Instant,
    disks: Disks,
    system_drive: PathBuf,
    cpu_model: Option<String>,
    os_name: Option<String>,
}

impl SysinfoSource {
    pub fn new() -> Self {
        let mut system = System::new();
        // Usage is a delta between two refreshes, this is the first one
        system.refresh_cpu_usage();
        let cpu_baseline = Instant::now();
        system.refresh_memory();

        let cpu_model = system
            .cpus()
            .first()
            .map(|cpu| cpu.brand().trim().to_string())
            .filter(|brand| !brand.is_empty());
        let os_name = os_label();
        let system_drive = system_drive();
        debug!("System drive is {:?}", system_drive);

        Self {
            system,
            cpu_baseline,
            disks: Disks::new_with_refreshed_list(),
            system_drive,
            cpu_model,
            os_name,
        }
    }
}

impl Default for SysinfoSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemSource for SysinfoSource {
    fn os_name(&mut self) -> Option<String> {
        self.os_name.clone()
    }

    fn uptime(&mut self) -> Option<Duration> {
        Some(Duration::from_secs(System::uptime()))
    }

    fn cpu_model(&mut self) -> Option<String> {
        self.cpu_model.clone()
    }

    fn cpu_usage(&mut self) -> Option<f32> {
        // Too soon after the baseline the delta is noise; keep the baseline
        // and report nothing until enough time has passed
        if self.cpu_baseline.elapsed() < MINIMUM_CPU_UPDATE_INTERVAL {
            return None;
        }
        self.system.refresh_cpu_usage();
        self.cpu_baseline = Instant::now();
        let usage = self.system.global_cpu_usage();
        (usage.is_finite() && (0.0..=100.0).contains(&usage)).then_some(usage)
    }

    fn memory(&mut self) -> Option<Usage> {
        self.system.refresh_memory();
        Usage::new(
            self.system.used_memory() / BYTES_PER_MB,
            self.system.total_memory() / BYTES_PER_MB,
        )
    }

    fn disk(&mut self) -> Option<Usage> {
        let drive = self.system_drive.as_path();
        if let Some(usage) = refresh_volume(self.disks.list_mut(), drive) {
            return Some(usage);
        }
        // Re-listing queries every volume (network shares, optical drives), so
        // it only happens when the cached system drive is gone or failed
        debug!("System drive not in the cached volume list, re-listing");
        self.disks.refresh_list();
        self.disks
            .list()
            .iter()
            .find(|d| d.mount_point() == drive)
            .and_then(Volume::usage)
    }
}

/// The part of a mounted volume the disk reading needs
trait Volume {
    fn mount_point(&self) -> &Path;
    /// Re-reads the space figures; false when the volume can't be queried
    fn refresh(&mut self) -> bool;
    fn total_space(&self) -> u64;
    fn available_space(&self) -> u64;

    /// Used / total in GB
    fn usage(&self) -> Option<Usage> {
        let total = self.total_space();
        let used = total.saturating_sub(self.available_space());
        Usage::new(used / BYTES_PER_GB, total / BYTES_PER_GB)
    }
}

impl Volume for Disk {
    fn mount_point(&self) -> &Path {
        Disk::mount_point(self)
    }

    fn refresh(&mut self) -> bool {
        Disk::refresh(self)
    }

    fn total_space(&self) -> u64 {
        Disk::total_space(self)
    }

    fn available_space(&self) -> u64 {
        Disk::available_space(self)
    }
}

/// Refreshes only the volume mounted at `mount`. `None` when it isn't in the
/// list or its refresh failed.
fn refresh_volume<V: Volume>(volumes: &mut [V], mount: &Path) -> Option<Usage> {
    let volume = volumes.iter_mut().find(|v| v.mount_point() == mount)?;
    if !volume.refresh() {
        return None;
    }
    volume.usage()
}

fn system_drive() -> PathBuf {
    if cfg!(windows) {
        let drive = std::env::var("SystemDrive").unwrap_or_else(|_| "C:".to_string());
        PathBuf::from(format!("{}\\", drive.trim_end_matches('\\')))
    } else {
        PathBuf::from("/")
    }
}

fn os_label() -> Option<String> {
    let long = System::long_os_version().or_else(System::name)?;
    let build = System::kernel_version().and_then(|v| v.split('.').last().and_then(|b| b.parse().ok()));
    Some(windows_marketing_name(&long, build))
}

/// Windows 11 still reports itself as 10.0; the build number tells them apart
pub fn windows_marketing_name(long_name: &str, build: Option<u32>) -> String {
    match build {
        Some(build) if build >= WINDOWS_11_BUILD && long_name.contains("Windows 10") => {
            long_name.replacen("Windows 10", "Windows 11", 1)
        }
        _ => long_name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_windows_11_detection() {
        assert_eq!(windows_marketing_name("Windows 10 Pro", Some(22631)), "Windows 11 Pro");
        assert_eq!(windows_marketing_name("Windows 10 Pro", Some(19045)), "Windows 10 Pro");
        assert_eq!(windows_marketing_name("Linux 24.04 Ubuntu", Some(25000)), "Linux 24.04 Ubuntu");
        assert_eq!(windows_marketing_name("Windows 10 Home", None), "Windows 10 Home");
    }

    struct FakeVolume {
        mount: PathBuf,
        total_gb: u64,
        free_gb: u64,
        refreshes: u32,
        healthy: bool,
    }

    impl FakeVolume {
        fn new(mount: &str, total_gb: u64, free_gb: u64) -> Self {
            Self {
                mount: PathBuf::from(mount),
                total_gb,
                free_gb,
                refreshes: 0,
                healthy: true,
            }
        }
    }

    impl Volume for FakeVolume {
        fn mount_point(&self) -> &Path {
            &self.mount
        }
        fn refresh(&mut self) -> bool {
            self.refreshes += 1;
            self.healthy
        }
        fn total_space(&self) -> u64 {
            self.total_gb * BYTES_PER_GB
        }
        fn available_space(&self) -> u64 {
            self.free_gb * BYTES_PER_GB
        }
    }

    #[test]
    fn test_only_system_volume_is_refreshed() {
        let mut volumes = vec![
            FakeVolume::new("/mnt/share", 4000, 1000),
            FakeVolume::new("/", 512, 392),
            FakeVolume::new("/media/cdrom", 1, 0),
        ];
        assert_eq!(refresh_volume(&mut volumes, Path::new("/")), Usage::new(120, 512));
        let refreshes: Vec<u32> = volumes.iter().map(|v| v.refreshes).collect();
        assert_eq!(refreshes, vec![0, 1, 0]);
    }

    #[test]
    fn test_missing_or_failed_volume_needs_relist() {
        let mut volumes = vec![FakeVolume::new("/home", 100, 50)];
        assert_eq!(refresh_volume(&mut volumes, Path::new("/")), None);

        volumes.push(FakeVolume::new("/", 100, 50));
        volumes[1].healthy = false;
        assert_eq!(refresh_volume(&mut volumes, Path::new("/")), None);
    }

    #[test]
    fn test_first_cpu_reading_waits_for_baseline() {
        let mut source = SysinfoSource::new();
        assert_eq!(source.cpu_usage(), None);
        // Backdating the baseline stands in for waiting one update interval
        if let Some(earlier) = Instant::now().checked_sub(MINIMUM_CPU_UPDATE_INTERVAL * 2) {
            source.cpu_baseline = earlier;
            let usage = source.cpu_usage();
            assert!(usage.map_or(true, |u| (0.0..=100.0).contains(&u)));
            assert!(source.cpu_baseline.elapsed() < MINIMUM_CPU_UPDATE_INTERVAL * 2);
        }
    }

    #[test]
    fn test_system_drive_is_absolute() {
        let drive = system_drive();
        if cfg!(windows) {
            assert!(drive.to_string_lossy().ends_with(":\\"));
        } else {
            assert_eq!(drive, PathBuf::from("/"));
        }
    }
}
