//! Per-core tick counters from /proc/stat.

use crate::error::StatsError;
use std::path::Path;

/// Raw CPU time values for one `cpuN` line of /proc/stat, in clock ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct CpuTimes {
    user: u64,
    nice: u64,
    system: u64,
    idle: u64,
    iowait: u64,
    irq: u64,
    softirq: u64,
    steal: u64,
}

impl CpuTimes {
    // guest and guest_nice are already folded into user and nice by the
    // kernel, so they are not counted again.
    fn busy(&self) -> Option<u64> {
        [self.nice, self.system, self.irq, self.softirq, self.steal]
            .into_iter()
            .try_fold(self.user, u64::checked_add)
    }

    fn idle(&self) -> Option<u64> {
        self.idle.checked_add(self.iowait)
    }

    /// `None` if the counters cannot be summed without overflow.
    fn sample(&self) -> Option<CpuCoreSample> {
        let sample = CpuCoreSample {
            idle: self.idle()?,
            busy: self.busy()?,
        };
        sample.checked_total().map(|_| sample)
    }
}

/// Accumulated ticks of one core at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuCoreSample {
    /// Ticks spent idle (including iowait).
    pub idle: u64,
    /// Ticks spent in every non-idle mode, summed.
    pub busy: u64,
}

impl CpuCoreSample {
    pub fn new(idle: u64, busy: u64) -> Self {
        Self { idle, busy }
    }

    /// Saturates rather than wraps; see [`checked_total`](Self::checked_total).
    pub fn total(&self) -> u64 {
        self.idle.saturating_add(self.busy)
    }

    pub fn checked_total(&self) -> Option<u64> {
        self.idle.checked_add(self.busy)
    }
}

/// Parse every per-core line (`cpu0`, `cpu1`, ...) of /proc/stat content.
/// The aggregate `cpu` line is skipped; the caller sums cores itself.
pub fn parse_per_core(path: &Path, content: &str) -> Result<Vec<CpuCoreSample>, StatsError> {
    let mut cores = Vec::new();

    for line in content.lines() {
        let Some(rest) = line.strip_prefix("cpu") else {
            continue;
        };
        // "cpu " is the aggregate line
        if !rest.starts_with(|c: char| c.is_ascii_digit()) {
            continue;
        }
        let sample = parse_cpu_line(path, line)?
            .sample()
            .ok_or_else(|| StatsError::parse(path, format!("tick counter overflow in {line:?}")))?;
        cores.push(sample);
    }

    if cores.is_empty() {
        return Err(StatsError::parse(path, "no per-core cpu lines"));
    }

    Ok(cores)
}

fn parse_cpu_line(path: &Path, line: &str) -> Result<CpuTimes, StatsError> {
    let parts = line
        .split_whitespace()
        .skip(1) // Skip "cpuN"
        .map(|s| s.parse::<u64>())
        .collect::<Result<Vec<u64>, _>>()
        .map_err(|e| StatsError::parse(path, format!("bad tick counter in {line:?}: {e}")))?;

    // user nice system idle are present on every kernel we care about
    if parts.len() < 4 {
        return Err(StatsError::parse(path, format!("truncated cpu line {line:?}")));
    }

    let field = |i: usize| parts.get(i).copied().unwrap_or(0);

    Ok(CpuTimes {
        user: field(0),
        nice: field(1),
        system: field(2),
        idle: field(3),
        iowait: field(4),
        irq: field(5),
        softirq: field(6),
        steal: field(7),
    })
}
