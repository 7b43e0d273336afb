//! Operating-system health metrics for a metrics registry.
//!
//! The [`catalog`] holds seven metrics (load averages, free and total
//! memory, uptime and aggregate CPU usage). [`create_os_metrics`] builds one
//! instance of each and registers them all with the same dimensions and
//! reporting interval.

pub mod catalog;
pub mod config;
pub mod error;
pub mod metrics;
pub mod registry;
pub mod stats;

pub use catalog::{CatalogEntry, CATALOG};
pub use config::CpuAverageOptions;
pub use error::{MetricError, RegistryError, StatsError};
pub use metrics::{CachedGauge, Gauge, Metric, MetricKind, Refresh};
pub use registry::{Dimensions, MetricRegistry, Registry};
pub use stats::{PlatformStats, ProcStats};

use std::sync::Arc;
use tracing::debug;

/// Register every catalog metric, reading from `/proc`.
///
/// `dimensions` defaults to no tags and `interval_secs` to 30 when `None` or
/// `0`. The CPU usage metric always uses its default sampling; build it from
/// [`catalog::lookup`] to choose other timings. The first registry error is
/// returned and no further metrics are registered.
///
/// Must be called from within a Tokio runtime.
pub fn create_os_metrics<R>(
    registry: &R,
    dimensions: Option<Dimensions>,
    interval_secs: Option<u64>,
) -> Result<(), RegistryError>
where
    R: Registry + ?Sized,
{
    create_os_metrics_with(registry, Arc::new(ProcStats::default()), dimensions, interval_secs)
}

/// [`create_os_metrics`] with an explicit statistics source.
pub fn create_os_metrics_with<R>(
    registry: &R,
    stats: Arc<dyn PlatformStats>,
    dimensions: Option<Dimensions>,
    interval_secs: Option<u64>,
) -> Result<(), RegistryError>
where
    R: Registry + ?Sized,
{
    let dimensions = Arc::new(dimensions.unwrap_or_default());
    let interval = config::resolve_report_interval(interval_secs);

    for entry in CATALOG.iter() {
        registry.register(entry.name, entry.build(&stats), Arc::clone(&dimensions), interval)?;
    }

    debug!(count = CATALOG.len(), ?interval, "registered os metrics");
    Ok(())
}
