//! Load average and uptime from /proc/loadavg and /proc/uptime.

use crate::error::StatsError;
use std::path::Path;

/// The three kernel load averages.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoadAverage {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

pub fn parse_loadavg(path: &Path, content: &str) -> Result<LoadAverage, StatsError> {
    let parts = content
        .split_whitespace()
        .take(3)
        .map(|s| s.parse::<f64>())
        .collect::<Result<Vec<f64>, _>>()
        .map_err(|e| StatsError::parse(path, e.to_string()))?;

    match parts[..] {
        [one, five, fifteen] => Ok(LoadAverage { one, five, fifteen }),
        _ => Err(StatsError::parse(path, "expected three load averages")),
    }
}

/// Seconds since boot, the first field of /proc/uptime.
pub fn parse_uptime(path: &Path, content: &str) -> Result<f64, StatsError> {
    content
        .split_whitespace()
        .next()
        .ok_or_else(|| StatsError::parse(path, "empty file"))?
        .parse()
        .map_err(|e: std::num::ParseFloatError| StatsError::parse(path, e.to_string()))
}
