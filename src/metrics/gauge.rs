//! Pull-based and timer-refreshed gauges.

use crate::error::MetricError;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

type ValueFn = dyn Fn() -> Result<f64, MetricError> + Send + Sync;

/// A metric whose value is computed on every read.
pub struct Gauge {
    value: Box<ValueFn>,
}

impl Gauge {
    pub fn new<F>(value: F) -> Self
    where
        F: Fn() -> Result<f64, MetricError> + Send + Sync + 'static,
    {
        Self {
            value: Box::new(value),
        }
    }

    pub fn read(&self) -> Result<f64, MetricError> {
        (self.value)()
    }
}

impl fmt::Debug for Gauge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gauge").finish_non_exhaustive()
    }
}

/// Computation behind a [`CachedGauge`]. May suspend.
#[async_trait]
pub trait Refresh: Send + Sync + 'static {
    async fn refresh(&self) -> Result<f64, MetricError>;
}

// tokio::time::interval rejects a zero period
const MIN_UPDATE_INTERVAL: Duration = Duration::from_millis(1);

/// A metric recomputed on a fixed interval by a background task. Readers get
/// the most recently completed value and never wait on a refresh in flight.
///
/// The first refresh starts immediately. A failed refresh is logged and the
/// previous value is kept. Dropping the gauge aborts the task, cancelling
/// any refresh that is suspended mid-way.
///
/// Must be created from within a Tokio runtime.
pub struct CachedGauge {
    value: watch::Receiver<Option<f64>>,
    update_interval: Duration,
    task: JoinHandle<()>,
}

impl CachedGauge {
    pub fn new<R: Refresh>(refresher: R, update_interval: Duration) -> Self {
        let update_interval = update_interval.max(MIN_UPDATE_INTERVAL);
        let (tx, value) = watch::channel(None);
        let task = tokio::spawn(refresh_loop(refresher, update_interval, tx));

        Self {
            value,
            update_interval,
            task,
        }
    }

    pub fn read(&self) -> Result<f64, MetricError> {
        if self.is_stopped() {
            return Err(MetricError::Stopped);
        }
        (*self.value.borrow()).ok_or(MetricError::Pending)
    }

    pub fn update_interval(&self) -> Duration {
        self.update_interval
    }

    /// Cancel the refresh task. Reads report [`MetricError::Stopped`] once
    /// the task has been torn down.
    pub fn shutdown(&self) {
        self.task.abort();
    }

    pub fn is_stopped(&self) -> bool {
        // the sender lives in the task, so a closed channel means it is gone
        self.value.has_changed().is_err()
    }
}

impl Drop for CachedGauge {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl fmt::Debug for CachedGauge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedGauge")
            .field("value", &*self.value.borrow())
            .field("update_interval", &self.update_interval)
            .finish()
    }
}

async fn refresh_loop<R: Refresh>(
    refresher: R,
    update_interval: Duration,
    tx: watch::Sender<Option<f64>>,
) {
    let mut ticker = tokio::time::interval(update_interval);
    // a slow refresh pushes the schedule back rather than bursting
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        match refresher.refresh().await {
            Ok(value) => {
                debug!(value, "cached gauge refreshed");
                tx.send_replace(Some(value));
            }
            Err(e) => {
                warn!(error = %e, "cached gauge refresh failed, keeping previous value");
            }
        }
    }
}
