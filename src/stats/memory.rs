//! Physical memory figures from /proc/meminfo.

use crate::error::StatsError;
use std::path::Path;

/// Memory totals in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemInfo {
    pub total: u64,
    /// `MemAvailable`, or `MemFree` on kernels that predate it.
    pub free: u64,
}

pub fn parse_meminfo(path: &Path, content: &str) -> Result<MemInfo, StatsError> {
    let mut total = None;
    let mut free = None;
    let mut available = None;

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 2 {
            continue;
        }

        let slot = match parts[0] {
            "MemTotal:" => &mut total,
            "MemFree:" => &mut free,
            "MemAvailable:" => &mut available,
            _ => continue,
        };

        let kib: u64 = parts[1]
            .parse()
            .map_err(|e| StatsError::parse(path, format!("bad value in {line:?}: {e}")))?;
        // Convert from KB to bytes
        let bytes = kib
            .checked_mul(1024)
            .ok_or_else(|| StatsError::parse(path, format!("value overflows in {line:?}")))?;
        *slot = Some(bytes);
    }

    let total = total.ok_or_else(|| StatsError::parse(path, "missing MemTotal"))?;
    let free = available
        .or(free)
        .ok_or_else(|| StatsError::parse(path, "missing MemAvailable and MemFree"))?;

    Ok(MemInfo { total, free })
}
