//! Operating-system statistics behind an injectable interface.
//!
//! Metrics never touch procfs directly; they go through [`PlatformStats`] so
//! tests can substitute fixed values for live kernel state.

pub mod cpu;
pub mod memory;
pub mod system;

pub use cpu::CpuCoreSample;
pub use system::LoadAverage;

use crate::error::StatsError;
use std::fs;
use std::path::PathBuf;

/// Source of the raw OS figures the catalog exposes.
pub trait PlatformStats: Send + Sync {
    fn load_average(&self) -> Result<LoadAverage, StatsError>;

    /// Free physical memory in bytes.
    fn free_memory(&self) -> Result<u64, StatsError>;

    /// Total physical memory in bytes.
    fn total_memory(&self) -> Result<u64, StatsError>;

    /// System uptime in seconds.
    fn uptime(&self) -> Result<f64, StatsError>;

    /// Current tick counters of every core.
    fn cpu_cores(&self) -> Result<Vec<CpuCoreSample>, StatsError>;
}

/// [`PlatformStats`] backed by a Linux procfs mount.
#[derive(Debug, Clone)]
pub struct ProcStats {
    root: PathBuf,
}

impl ProcStats {
    /// Read from a procfs tree rooted at `root` (normally `/proc`).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn read(&self, file: &str) -> Result<(PathBuf, String), StatsError> {
        let path = self.root.join(file);
        match fs::read_to_string(&path) {
            Ok(content) => Ok((path, content)),
            Err(source) => Err(StatsError::Io { path, source }),
        }
    }
}

impl Default for ProcStats {
    fn default() -> Self {
        Self::new("/proc")
    }
}

impl PlatformStats for ProcStats {
    fn load_average(&self) -> Result<LoadAverage, StatsError> {
        let (path, content) = self.read("loadavg")?;
        system::parse_loadavg(&path, &content)
    }

    fn free_memory(&self) -> Result<u64, StatsError> {
        let (path, content) = self.read("meminfo")?;
        Ok(memory::parse_meminfo(&path, &content)?.free)
    }

    fn total_memory(&self) -> Result<u64, StatsError> {
        let (path, content) = self.read("meminfo")?;
        Ok(memory::parse_meminfo(&path, &content)?.total)
    }

    fn uptime(&self) -> Result<f64, StatsError> {
        let (path, content) = self.read("uptime")?;
        system::parse_uptime(&path, &content)
    }

    fn cpu_cores(&self) -> Result<Vec<CpuCoreSample>, StatsError> {
        let (path, content) = self.read("stat")?;
        cpu::parse_per_core(&path, &content)
    }
}
