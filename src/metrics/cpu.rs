//! Aggregate CPU usage from two tick samples taken a short window apart.
//!
//! Tick counters are cumulative since boot, so a single read says nothing
//! about current load. [`CpuUsageSampler`] reads them, suspends for the
//! sample window, reads again and reports the busy share of the ticks that
//! elapsed in between.

use super::gauge::Refresh;
use crate::error::{MetricError, StatsError};
use crate::stats::{CpuCoreSample, PlatformStats};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Idle and total ticks summed over every core at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateCpuSample {
    pub idle: u64,
    pub total: u64,
}

impl AggregateCpuSample {
    pub fn new(idle: u64, total: u64) -> Self {
        Self { idle, total }
    }

    /// Sum every core. `None` if a sum overflows.
    pub fn from_cores(cores: &[CpuCoreSample]) -> Option<Self> {
        cores.iter().try_fold(Self::default(), |acc, core| {
            Some(Self {
                idle: acc.idle.checked_add(core.idle)?,
                total: acc.total.checked_add(core.checked_total()?)?,
            })
        })
    }
}

/// Read every core's counters and sum them.
pub fn sample_aggregate_cpu(stats: &dyn PlatformStats) -> Result<AggregateCpuSample, StatsError> {
    AggregateCpuSample::from_cores(&stats.cpu_cores()?)
        .ok_or(StatsError::Overflow("aggregate cpu ticks"))
}

/// Busy percentage between two samples, in `[0, 100]`.
///
/// A window with no elapsed ticks (or counters that went backwards) yields
/// `0.0`.
pub fn compute_usage_percent(start: AggregateCpuSample, end: AggregateCpuSample) -> f64 {
    // signed so counter resets clamp instead of wrapping
    let idle_delta = end.idle as i128 - start.idle as i128;
    let total_delta = end.total as i128 - start.total as i128;

    if total_delta <= 0 {
        return 0.0;
    }

    let usage = 100.0 * (1.0 - idle_delta as f64 / total_delta as f64);
    usage.clamp(0.0, 100.0)
}

/// [`Refresh`] implementation behind `node.os.cpu.all-cores-avg`.
pub struct CpuUsageSampler {
    stats: Arc<dyn PlatformStats>,
    sample_time: Duration,
}

impl CpuUsageSampler {
    pub fn new(stats: Arc<dyn PlatformStats>, sample_time: Duration) -> Self {
        Self { stats, sample_time }
    }
}

#[async_trait]
impl Refresh for CpuUsageSampler {
    async fn refresh(&self) -> Result<f64, MetricError> {
        let start = sample_aggregate_cpu(self.stats.as_ref())?;
        tokio::time::sleep(self.sample_time).await;
        let end = sample_aggregate_cpu(self.stats.as_ref())?;

        Ok(compute_usage_percent(start, end))
    }
}
