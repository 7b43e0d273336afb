//! Metric primitives and CPU usage sampling.

pub mod cpu;
pub mod gauge;

pub use cpu::{compute_usage_percent, sample_aggregate_cpu, AggregateCpuSample, CpuUsageSampler};
pub use gauge::{CachedGauge, Gauge, Refresh};

use crate::error::MetricError;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MetricKind {
    Gauge,
    CachedGauge,
}

/// A metric instance as handed to a registry.
#[derive(Debug)]
pub enum Metric {
    Gauge(Gauge),
    Cached(CachedGauge),
}

impl Metric {
    pub fn read(&self) -> Result<f64, MetricError> {
        match self {
            Metric::Gauge(gauge) => gauge.read(),
            Metric::Cached(gauge) => gauge.read(),
        }
    }

    pub fn kind(&self) -> MetricKind {
        match self {
            Metric::Gauge(_) => MetricKind::Gauge,
            Metric::Cached(_) => MetricKind::CachedGauge,
        }
    }

    pub fn as_cached(&self) -> Option<&CachedGauge> {
        match self {
            Metric::Cached(gauge) => Some(gauge),
            Metric::Gauge(_) => None,
        }
    }
}

impl From<Gauge> for Metric {
    fn from(gauge: Gauge) -> Self {
        Metric::Gauge(gauge)
    }
}

impl From<CachedGauge> for Metric {
    fn from(gauge: CachedGauge) -> Self {
        Metric::Cached(gauge)
    }
}
