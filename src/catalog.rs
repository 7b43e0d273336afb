//! The fixed table of OS metrics and the factories that build them.

use crate::config::CpuAverageOptions;
use crate::error::{MetricError, StatsError};
use crate::metrics::{CachedGauge, CpuUsageSampler, Gauge, Metric, MetricKind};
use crate::stats::PlatformStats;
use std::fmt;
use std::sync::Arc;

pub const LOADAVG_1M: &str = "node.os.loadavg.1m";
pub const LOADAVG_5M: &str = "node.os.loadavg.5m";
pub const LOADAVG_15M: &str = "node.os.loadavg.15m";
pub const FREEMEM: &str = "node.os.freemem";
pub const TOTALMEM: &str = "node.os.totalmem";
pub const UPTIME: &str = "node.os.uptime";
pub const CPU_ALL_CORES_AVG: &str = "node.os.cpu.all-cores-avg";

/// Builds one metric instance. Options only affect the CPU usage metric.
pub type Factory = fn(&Arc<dyn PlatformStats>, &CpuAverageOptions) -> Metric;

pub struct CatalogEntry {
    pub name: &'static str,
    pub kind: MetricKind,
    factory: Factory,
}

impl CatalogEntry {
    /// Build with default options.
    pub fn build(&self, stats: &Arc<dyn PlatformStats>) -> Metric {
        self.build_with(stats, &CpuAverageOptions::default())
    }

    pub fn build_with(&self, stats: &Arc<dyn PlatformStats>, options: &CpuAverageOptions) -> Metric {
        (self.factory)(stats, options)
    }
}

impl fmt::Debug for CatalogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogEntry")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

pub static CATALOG: [CatalogEntry; 7] = [
    CatalogEntry {
        name: LOADAVG_1M,
        kind: MetricKind::Gauge,
        factory: loadavg_1m,
    },
    CatalogEntry {
        name: LOADAVG_5M,
        kind: MetricKind::Gauge,
        factory: loadavg_5m,
    },
    CatalogEntry {
        name: LOADAVG_15M,
        kind: MetricKind::Gauge,
        factory: loadavg_15m,
    },
    CatalogEntry {
        name: FREEMEM,
        kind: MetricKind::Gauge,
        factory: freemem,
    },
    CatalogEntry {
        name: TOTALMEM,
        kind: MetricKind::Gauge,
        factory: totalmem,
    },
    CatalogEntry {
        name: UPTIME,
        kind: MetricKind::Gauge,
        factory: uptime,
    },
    CatalogEntry {
        name: CPU_ALL_CORES_AVG,
        kind: MetricKind::CachedGauge,
        factory: cpu_all_cores_avg,
    },
];

pub fn lookup(name: &str) -> Option<&'static CatalogEntry> {
    CATALOG.iter().find(|entry| entry.name == name)
}

fn gauge<F>(stats: &Arc<dyn PlatformStats>, read: F) -> Metric
where
    F: Fn(&dyn PlatformStats) -> Result<f64, StatsError> + Send + Sync + 'static,
{
    let stats = Arc::clone(stats);
    Gauge::new(move || read(stats.as_ref()).map_err(MetricError::from)).into()
}

fn loadavg_1m(stats: &Arc<dyn PlatformStats>, _: &CpuAverageOptions) -> Metric {
    gauge(stats, |s| Ok(s.load_average()?.one))
}

fn loadavg_5m(stats: &Arc<dyn PlatformStats>, _: &CpuAverageOptions) -> Metric {
    gauge(stats, |s| Ok(s.load_average()?.five))
}

fn loadavg_15m(stats: &Arc<dyn PlatformStats>, _: &CpuAverageOptions) -> Metric {
    gauge(stats, |s| Ok(s.load_average()?.fifteen))
}

fn freemem(stats: &Arc<dyn PlatformStats>, _: &CpuAverageOptions) -> Metric {
    gauge(stats, |s| Ok(s.free_memory()? as f64))
}

fn totalmem(stats: &Arc<dyn PlatformStats>, _: &CpuAverageOptions) -> Metric {
    gauge(stats, |s| Ok(s.total_memory()? as f64))
}

fn uptime(stats: &Arc<dyn PlatformStats>, _: &CpuAverageOptions) -> Metric {
    gauge(stats, |s| s.uptime())
}

fn cpu_all_cores_avg(stats: &Arc<dyn PlatformStats>, options: &CpuAverageOptions) -> Metric {
    let sampler = CpuUsageSampler::new(Arc::clone(stats), options.sample_time());
    CachedGauge::new(sampler, options.update_interval()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{CpuCoreSample, LoadAverage};
    use parking_lot::Mutex;
    use std::collections::HashSet;
    use std::time::Duration;
    use tokio::time::Instant;

    /// Fixed figures, except for CPU ticks which advance on every read.
    #[derive(Default)]
    struct Fixture {
        free: Mutex<u64>,
        cpu_reads: Mutex<Vec<Instant>>,
    }

    impl PlatformStats for Fixture {
        fn load_average(&self) -> Result<LoadAverage, StatsError> {
            Ok(LoadAverage {
                one: 1.5,
                five: 0.75,
                fifteen: 0.25,
            })
        }
        fn free_memory(&self) -> Result<u64, StatsError> {
            Ok(*self.free.lock())
        }
        fn total_memory(&self) -> Result<u64, StatsError> {
            Ok(8 << 30)
        }
        fn uptime(&self) -> Result<f64, StatsError> {
            Ok(4321.5)
        }
        fn cpu_cores(&self) -> Result<Vec<CpuCoreSample>, StatsError> {
            let mut reads = self.cpu_reads.lock();
            reads.push(Instant::now());
            let n = reads.len() as u64;
            // each read: +100 idle, +300 busy
            Ok(vec![CpuCoreSample::new(n * 100, n * 300)])
        }
    }

    fn fixture() -> (Arc<Fixture>, Arc<dyn PlatformStats>) {
        let fixture = Arc::new(Fixture::default());
        let stats: Arc<dyn PlatformStats> = fixture.clone();
        (fixture, stats)
    }

    #[test]
    fn catalog_has_seven_unique_names() {
        let names: HashSet<_> = CATALOG.iter().map(|e| e.name).collect();
        assert_eq!(names.len(), 7);
        assert_eq!(lookup(CPU_ALL_CORES_AVG).unwrap().kind, MetricKind::CachedGauge);
        assert_eq!(lookup(UPTIME).unwrap().kind, MetricKind::Gauge);
        assert!(lookup("node.os.swap").is_none());
    }

    #[test]
    fn gauges_read_platform_values_unchanged() {
        let (fixture, stats) = fixture();
        let read = |name: &str| lookup(name).unwrap().build(&stats).read().unwrap();

        assert_eq!(read(LOADAVG_1M), 1.5);
        assert_eq!(read(LOADAVG_5M), 0.75);
        assert_eq!(read(LOADAVG_15M), 0.25);
        assert_eq!(read(TOTALMEM), (8u64 << 30) as f64);
        assert_eq!(read(UPTIME), 4321.5);

        let freemem = lookup(FREEMEM).unwrap().build(&stats);
        *fixture.free.lock() = 1024;
        assert_eq!(freemem.read().unwrap(), 1024.0);
        *fixture.free.lock() = 4096;
        assert_eq!(freemem.read().unwrap(), 4096.0);
    }

    #[test]
    fn gauge_kinds_match_table() {
        let (_, stats) = fixture();
        for entry in CATALOG.iter().filter(|e| e.kind == MetricKind::Gauge) {
            assert_eq!(entry.build(&stats).kind(), MetricKind::Gauge);
        }
    }

    async fn cpu_read_gaps(options: CpuAverageOptions, wait: Duration) -> (Metric, Vec<Duration>) {
        let (fixture, stats) = fixture();
        let metric = lookup(CPU_ALL_CORES_AVG).unwrap().build_with(&stats, &options);
        tokio::time::sleep(wait).await;

        let reads = fixture.cpu_reads.lock();
        let gaps = reads.windows(2).map(|w| w[1] - w[0]).collect();
        (metric, gaps)
    }

    #[tokio::test(start_paused = true)]
    async fn cpu_metric_uses_default_timing() {
        let (metric, gaps) =
            cpu_read_gaps(CpuAverageOptions::default(), Duration::from_secs(36)).await;

        let cached = metric.as_cached().unwrap();
        assert_eq!(cached.update_interval(), Duration::from_secs(30));
        // refresh at 0s samples at 0s and 5s, refresh at 30s samples at 30s and 35s
        assert_eq!(
            gaps,
            vec![
                Duration::from_secs(5),
                Duration::from_secs(25),
                Duration::from_secs(5)
            ]
        );
        // +100 idle out of +400 total
        assert_eq!(metric.read().unwrap(), 75.0);
    }

    #[tokio::test(start_paused = true)]
    async fn cpu_metric_honours_custom_timing() {
        let options = CpuAverageOptions::new(60.0, 10.0);
        let (metric, gaps) = cpu_read_gaps(options, Duration::from_secs(71)).await;

        assert_eq!(metric.as_cached().unwrap().update_interval(), Duration::from_secs(60));
        assert_eq!(
            gaps,
            vec![
                Duration::from_secs(10),
                Duration::from_secs(50),
                Duration::from_secs(10)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cpu_metric_pending_until_first_window_closes() {
        let (_, stats) = fixture();
        let metric = lookup(CPU_ALL_CORES_AVG).unwrap().build(&stats);

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(matches!(metric.read(), Err(MetricError::Pending)));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(metric.read().unwrap(), 75.0);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_cpu_metric_cancels_window_in_flight() {
        let (fixture, stats) = fixture();
        let metric = lookup(CPU_ALL_CORES_AVG).unwrap().build(&stats);

        // inside the first 5s window
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fixture.cpu_reads.lock().len(), 1);

        drop(metric);
        tokio::time::sleep(Duration::from_secs(60)).await;

        // the closing sample was never taken
        assert_eq!(fixture.cpu_reads.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_window_in_flight() {
        let (fixture, stats) = fixture();
        let metric = lookup(CPU_ALL_CORES_AVG).unwrap().build(&stats);
        tokio::time::sleep(Duration::from_secs(2)).await;

        let cached = metric.as_cached().unwrap();
        cached.shutdown();
        while !cached.is_stopped() {
            tokio::task::yield_now().await;
        }
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(fixture.cpu_reads.lock().len(), 1);
        assert!(matches!(metric.read(), Err(MetricError::Stopped)));
    }
}
