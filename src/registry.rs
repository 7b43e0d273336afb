//! Registry interface and an in-process implementation that reports each
//! metric on its own cadence.

use crate::error::RegistryError;
use crate::metrics::{Metric, MetricKind};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Tags attached to every metric of one registration call.
pub type Dimensions = BTreeMap<String, String>;

/// Anything that accepts metrics for scheduled reporting.
pub trait Registry {
    fn register(
        &self,
        name: &str,
        metric: Metric,
        dimensions: Arc<Dimensions>,
        interval: Duration,
    ) -> Result<(), RegistryError>;
}

impl<R: Registry + ?Sized> Registry for Arc<R> {
    fn register(
        &self,
        name: &str,
        metric: Metric,
        dimensions: Arc<Dimensions>,
        interval: Duration,
    ) -> Result<(), RegistryError> {
        (**self).register(name, metric, dimensions, interval)
    }
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub metric: Arc<Metric>,
    pub dimensions: Arc<Dimensions>,
    pub interval: Duration,
}

impl Registration {
    pub fn read(&self) -> Reading {
        let (value, error) = match self.metric.read() {
            Ok(value) => (Some(value), None),
            Err(e) => (None, Some(e.to_string())),
        };

        Reading {
            timestamp: Utc::now(),
            name: self.name.clone(),
            kind: self.metric.kind(),
            value,
            error,
            dimensions: (*self.dimensions).clone(),
        }
    }
}

/// One reported value.
#[derive(Debug, Clone, Serialize)]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    pub name: String,
    pub kind: MetricKind,
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub dimensions: Dimensions,
}

/// In-process registry. Names are unique; registration order is kept.
#[derive(Debug, Default)]
pub struct MetricRegistry {
    entries: Mutex<Vec<Registration>>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.lock().iter().map(|r| r.name.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<Registration> {
        self.entries.lock().iter().find(|r| r.name == name).cloned()
    }

    /// Read every metric once, in registration order.
    pub fn snapshot(&self) -> Vec<Reading> {
        // read outside the lock, gauges may hit the filesystem
        let entries = self.entries.lock().clone();
        entries.iter().map(Registration::read).collect()
    }

    /// Start one reporting task per registered metric. Each task emits a
    /// reading every `interval`, starting one interval from now.
    pub fn spawn_reporter(&self) -> Reporter {
        let (tx, rx) = mpsc::channel(REPORT_CHANNEL_CAPACITY);
        let tasks = self
            .entries
            .lock()
            .iter()
            .cloned()
            .map(|registration| tokio::spawn(report_loop(registration, tx.clone())))
            .collect();

        Reporter { rx, tasks }
    }
}

impl Registry for MetricRegistry {
    fn register(
        &self,
        name: &str,
        metric: Metric,
        dimensions: Arc<Dimensions>,
        interval: Duration,
    ) -> Result<(), RegistryError> {
        if name.trim().is_empty() {
            return Err(RegistryError::InvalidName(name.to_string()));
        }

        let mut entries = self.entries.lock();
        if entries.iter().any(|r| r.name == name) {
            return Err(RegistryError::Duplicate(name.to_string()));
        }

        debug!(name, ?interval, kind = ?metric.kind(), "registered metric");
        entries.push(Registration {
            name: name.to_string(),
            metric: Arc::new(metric),
            dimensions,
            interval,
        });

        Ok(())
    }
}

const REPORT_CHANNEL_CAPACITY: usize = 64;

/// Receiving end of [`MetricRegistry::spawn_reporter`].
pub struct Reporter {
    rx: mpsc::Receiver<Reading>,
    tasks: Vec<JoinHandle<()>>,
}

impl Reporter {
    /// Next reading from any metric. `None` once every task has stopped.
    pub async fn recv(&mut self) -> Option<Reading> {
        self.rx.recv().await
    }

    pub fn shutdown(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

impl Drop for Reporter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn report_loop(registration: Registration, tx: mpsc::Sender<Reading>) {
    let mut ticker = tokio::time::interval(registration.interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // the first tick completes immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;

        let reading = registration.read();
        if let Some(error) = &reading.error {
            warn!(name = %reading.name, %error, "metric read failed");
        }
        if tx.send(reading).await.is_err() {
            break;
        }
    }
}
