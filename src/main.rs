//! os-metrics - report operating-system health gauges as JSON lines.
//!
//! Registers the OS metric catalog into an in-process registry and prints
//! every reading to stdout. Logs go to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use os_metrics::catalog::CATALOG;
use os_metrics::config::{resolve_report_interval, CpuAverageOptions};
use os_metrics::{create_os_metrics_with, Dimensions, MetricRegistry, PlatformStats, ProcStats, Registry};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Operating-system health metrics reporter
#[derive(Parser, Debug)]
#[command(name = "os-metrics")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Reporting interval in seconds (0 means the default of 30)
    #[arg(short, long)]
    interval: Option<u64>,

    /// Dimension attached to every metric, as key=value (repeatable)
    #[arg(short = 'D', long = "dimension", value_parser = parse_dimension)]
    dimensions: Vec<(String, String)>,

    /// Run for specified duration (seconds), then exit
    #[arg(short, long)]
    duration: Option<u64>,

    /// procfs mount to read statistics from
    #[arg(long, default_value = "/proc")]
    proc_root: PathBuf,

    /// How often the CPU usage gauge recomputes (seconds)
    #[arg(long)]
    cpu_update_interval: Option<f64>,

    /// Window between the two CPU samples (seconds)
    #[arg(long)]
    cpu_sample_time: Option<f64>,

    /// Print a single snapshot of every metric and exit
    #[arg(long)]
    once: bool,
}

fn parse_dimension(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {s:?}"))?;
    if key.is_empty() {
        return Err(format!("empty dimension name in {s:?}"));
    }
    Ok((key.to_string(), value.to_string()))
}

impl Args {
    fn cpu_options(&self) -> Option<CpuAverageOptions> {
        if self.cpu_update_interval.is_none() && self.cpu_sample_time.is_none() {
            return None;
        }
        Some(CpuAverageOptions {
            update_interval_secs: self.cpu_update_interval,
            sample_time_secs: self.cpu_sample_time,
        })
    }
}

/// Register the catalog. The driver only knows default CPU sampling, so
/// custom timings go through the catalog directly.
fn register(registry: &MetricRegistry, stats: Arc<dyn PlatformStats>, args: &Args) -> Result<()> {
    let dimensions: Dimensions = args.dimensions.iter().cloned().collect();

    match args.cpu_options() {
        None => create_os_metrics_with(registry, stats, Some(dimensions), args.interval)?,
        Some(options) => {
            let dimensions = Arc::new(dimensions);
            let interval = resolve_report_interval(args.interval);
            for entry in CATALOG.iter() {
                let metric = entry.build_with(&stats, &options);
                registry.register(entry.name, metric, Arc::clone(&dimensions), interval)?;
            }
        }
    }

    Ok(())
}

fn print_reading(reading: &os_metrics::registry::Reading) -> Result<()> {
    let json = serde_json::to_string(reading).context("Failed to serialize reading")?;
    println!("{}", json);
    Ok(())
}

async fn until(limit: Option<Duration>) {
    match limit {
        Some(limit) => tokio::time::sleep(limit).await,
        None => std::future::pending().await,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let stats: Arc<dyn PlatformStats> = Arc::new(ProcStats::new(&args.proc_root));
    // fail early on an unreadable procfs instead of streaming errors
    stats
        .cpu_cores()
        .with_context(|| format!("Failed to read CPU counters under {}", args.proc_root.display()))?;

    let registry = MetricRegistry::new();
    register(&registry, stats, &args)?;
    info!(metrics = registry.len(), proc_root = %args.proc_root.display(), "registered os metrics");

    if args.once {
        // give the CPU gauge one full sample window
        let window = args.cpu_options().unwrap_or_default().sample_time();
        tokio::time::sleep(window + Duration::from_millis(100)).await;
        for reading in registry.snapshot() {
            print_reading(&reading)?;
        }
        return Ok(());
    }

    let mut reporter = registry.spawn_reporter();
    let stream = async {
        while let Some(reading) = reporter.recv().await {
            print_reading(&reading)?;
        }
        warn!("all reporting tasks stopped");
        Ok::<_, anyhow::Error>(())
    };

    tokio::select! {
        result = stream => result?,
        _ = tokio::signal::ctrl_c() => info!("interrupted, shutting down"),
        _ = until(args.duration.map(Duration::from_secs)) => info!("duration elapsed, shutting down"),
    }

    reporter.shutdown();
    Ok(())
}
