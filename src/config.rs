//! Reporting and sampling defaults, and resolution of optional settings.

use std::time::Duration;

/// Reporting interval used when the caller gives none.
pub const DEFAULT_REPORT_INTERVAL_SECS: u64 = 30;
/// How often the CPU usage gauge recomputes its value.
pub const DEFAULT_CPU_UPDATE_INTERVAL_SECS: f64 = 30.0;
/// Width of the window between the two CPU samples.
pub const DEFAULT_CPU_SAMPLE_TIME_SECS: f64 = 5.0;

/// Resolve the reporting interval handed to the registry. `None` and `0`
/// both mean "use the default".
pub fn resolve_report_interval(interval_secs: Option<u64>) -> Duration {
    match interval_secs {
        Some(secs) if secs > 0 => Duration::from_secs(secs),
        _ => Duration::from_secs(DEFAULT_REPORT_INTERVAL_SECS),
    }
}

/// Sampling options for `node.os.cpu.all-cores-avg`.
///
/// Both values are in seconds. Missing, zero, negative or non-finite values
/// fall back to the defaults instead of being rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CpuAverageOptions {
    pub update_interval_secs: Option<f64>,
    pub sample_time_secs: Option<f64>,
}

impl CpuAverageOptions {
    pub fn new(update_interval_secs: f64, sample_time_secs: f64) -> Self {
        Self {
            update_interval_secs: Some(update_interval_secs),
            sample_time_secs: Some(sample_time_secs),
        }
    }

    pub fn update_interval(&self) -> Duration {
        positive_secs(self.update_interval_secs, DEFAULT_CPU_UPDATE_INTERVAL_SECS)
    }

    pub fn sample_time(&self) -> Duration {
        positive_secs(self.sample_time_secs, DEFAULT_CPU_SAMPLE_TIME_SECS)
    }
}

fn positive_secs(value: Option<f64>, default: f64) -> Duration {
    let default = Duration::from_secs_f64(default);
    match value {
        Some(secs) if secs > 0.0 => Duration::try_from_secs_f64(secs).unwrap_or(default),
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_interval_falls_back_on_missing_or_zero() {
        assert_eq!(resolve_report_interval(None), Duration::from_secs(30));
        assert_eq!(resolve_report_interval(Some(0)), Duration::from_secs(30));
        assert_eq!(resolve_report_interval(Some(10)), Duration::from_secs(10));
    }

    #[test]
    fn cpu_options_default() {
        let options = CpuAverageOptions::default();
        assert_eq!(options.update_interval(), Duration::from_secs(30));
        assert_eq!(options.sample_time(), Duration::from_secs(5));
    }

    #[test]
    fn cpu_options_custom() {
        let options = CpuAverageOptions::new(60.0, 10.0);
        assert_eq!(options.update_interval(), Duration::from_secs(60));
        assert_eq!(options.sample_time(), Duration::from_secs(10));
    }

    #[test]
    fn cpu_options_invalid_values_use_defaults() {
        let options = CpuAverageOptions::new(-1.0, 0.0);
        assert_eq!(options.update_interval(), Duration::from_secs(30));
        assert_eq!(options.sample_time(), Duration::from_secs(5));

        let options = CpuAverageOptions::new(f64::NAN, f64::INFINITY);
        assert_eq!(options.update_interval(), Duration::from_secs(30));
        assert_eq!(options.sample_time(), Duration::from_secs(5));

        let options = CpuAverageOptions::new(1e300, 1e300);
        assert_eq!(options.update_interval(), Duration::from_secs(30));
    }
}
