//! Error types shared across the platform, metric and registry layers.

use std::path::PathBuf;
use thiserror::Error;

/// Failure reading or parsing an OS statistic.
#[derive(Debug, Error)]
pub enum StatsError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {detail}", .path.display())]
    Parse { path: PathBuf, detail: String },
    #[error("{0} overflowed")]
    Overflow(&'static str),
}

impl StatsError {
    pub(crate) fn parse(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            detail: detail.into(),
        }
    }
}

/// Failure producing a metric value.
#[derive(Debug, Error)]
pub enum MetricError {
    #[error(transparent)]
    Stats(#[from] StatsError),
    /// A cached gauge has not completed its first refresh yet.
    #[error("no value computed yet")]
    Pending,
    /// The refresh task of a cached gauge is gone.
    #[error("metric refresh stopped")]
    Stopped,
}

/// Failure registering a metric.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("metric {0:?} is already registered")]
    Duplicate(String),
    #[error("invalid metric name {0:?}")]
    InvalidName(String),
}
