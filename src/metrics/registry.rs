//! Application-side metric instruments and the registry the exporter reads.
//!
//! Instruments are updated by application threads at any time; the exporter
//! only ever reads them, one metric at a time.

use crate::core::{ExportError, MetricIdentity, Result};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Default number of samples a histogram keeps
pub const DEFAULT_RESERVOIR_SIZE: usize = 1028;

/// Current value of a gauge, integer or floating point
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GaugeValue {
    Int(i64),
    Float(f64),
}

impl From<i64> for GaugeValue {
    fn from(value: i64) -> Self {
        GaugeValue::Int(value)
    }
}

impl From<f64> for GaugeValue {
    fn from(value: f64) -> Self {
        GaugeValue::Float(value)
    }
}

type GaugeCallback = Box<dyn Fn() -> Result<GaugeValue> + Send + Sync>;

enum GaugeSource {
    Stored(RwLock<GaugeValue>),
    Callback(GaugeCallback),
}

/// Point-in-time measurement, either set explicitly or computed on read
pub struct Gauge {
    source: GaugeSource,
}

impl Gauge {
    pub fn new(initial: impl Into<GaugeValue>) -> Self {
        Self {
            source: GaugeSource::Stored(RwLock::new(initial.into())),
        }
    }

    /// Gauge whose value is computed by `f` each time it is read
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn() -> Result<GaugeValue> + Send + Sync + 'static,
    {
        Self {
            source: GaugeSource::Callback(Box::new(f)),
        }
    }

    /// Replace the stored value. No-op for callback gauges.
    pub fn set(&self, value: impl Into<GaugeValue>) {
        if let GaugeSource::Stored(current) = &self.source {
            *current.write() = value.into();
        }
    }

    pub fn read(&self) -> Result<GaugeValue> {
        match &self.source {
            GaugeSource::Stored(current) => Ok(*current.read()),
            GaugeSource::Callback(f) => f(),
        }
    }
}

impl fmt::Debug for Gauge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            GaugeSource::Stored(value) => f.debug_tuple("Gauge").field(&*value.read()).finish(),
            GaugeSource::Callback(_) => f.write_str("Gauge(<callback>)"),
        }
    }
}

/// Monotonically increasing count
#[derive(Debug, Default)]
pub struct Counter {
    count: AtomicI64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self) {
        self.add(1);
    }

    /// Add `n` to the count; negative increments are ignored
    pub fn add(&self, n: i64) {
        if n > 0 {
            self.count.fetch_add(n, Ordering::Relaxed);
        }
    }

    pub fn count(&self) -> i64 {
        self.count.load(Ordering::Relaxed)
    }
}

/// Number of operations currently in flight
#[derive(Debug, Default)]
pub struct ConcurrentGauge {
    active: AtomicI64,
}

impl ConcurrentGauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self) {
        self.active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec(&self) {
        self.active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Track one operation for the lifetime of the returned guard
    pub fn track(self: &Arc<Self>) -> ConcurrentGuard {
        self.inc();
        ConcurrentGuard {
            gauge: Arc::clone(self),
        }
    }

    pub fn value(&self) -> i64 {
        self.active.load(Ordering::Relaxed)
    }
}

/// Decrements its gauge when dropped
pub struct ConcurrentGuard {
    gauge: Arc<ConcurrentGauge>,
}

impl Drop for ConcurrentGuard {
    fn drop(&mut self) {
        self.gauge.dec();
    }
}

/// Distribution of integer samples kept in a bounded reservoir
#[derive(Debug)]
pub struct Histogram {
    samples: Mutex<VecDeque<i64>>,
    capacity: usize,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_RESERVOIR_SIZE)
    }
}

impl Histogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_RESERVOIR_SIZE))),
            capacity,
        }
    }

    /// Record a sample, evicting the oldest once the reservoir is full
    pub fn record(&self, value: i64) {
        let mut samples = self.samples.lock();
        if samples.len() == self.capacity {
            samples.pop_front();
        }
        samples.push_back(value);
    }

    /// Copy of the current samples, oldest first
    pub fn samples(&self) -> Vec<i64> {
        self.samples.lock().iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A registered metric instrument
#[derive(Debug, Clone)]
pub enum Metric {
    Gauge(Arc<Gauge>),
    Counter(Arc<Counter>),
    ConcurrentGauge(Arc<ConcurrentGauge>),
    Histogram(Arc<Histogram>),
    /// Instrument kind the exporter has no encoding for
    Unsupported { kind: String },
}

impl Metric {
    pub fn kind(&self) -> &str {
        match self {
            Metric::Gauge(_) => "gauge",
            Metric::Counter(_) => "counter",
            Metric::ConcurrentGauge(_) => "concurrent_gauge",
            Metric::Histogram(_) => "histogram",
            Metric::Unsupported { kind } => kind,
        }
    }
}

/// Read-only view of one registry partition
pub trait MetricRegistry: Send + Sync {
    /// Partition name used in logs
    fn name(&self) -> &str;

    /// Call `visitor` once for every registered metric
    fn enumerate(&self, visitor: &mut dyn FnMut(&MetricIdentity, &Metric));
}

/// Registry partition backed by a concurrent map
#[derive(Debug)]
pub struct InMemoryRegistry {
    name: String,
    metrics: DashMap<MetricIdentity, Metric>,
    reservoir_size: usize,
}

impl InMemoryRegistry {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self::with_reservoir_size(name, DEFAULT_RESERVOIR_SIZE)
    }

    pub fn with_reservoir_size<S: Into<String>>(name: S, reservoir_size: usize) -> Self {
        Self {
            name: name.into(),
            metrics: DashMap::new(),
            reservoir_size,
        }
    }

    /// Register or replace a metric under `identity`
    pub fn register(&self, identity: MetricIdentity, metric: Metric) {
        self.metrics.insert(identity, metric);
    }

    pub fn remove(&self, identity: &MetricIdentity) -> Option<Metric> {
        self.metrics.remove(identity).map(|(_, metric)| metric)
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Get or create a stored gauge
    pub fn gauge(&self, identity: MetricIdentity) -> Result<Arc<Gauge>> {
        self.get_or_insert(identity, || Metric::Gauge(Arc::new(Gauge::new(0i64))), |m| match m {
            Metric::Gauge(g) => Some(Arc::clone(g)),
            _ => None,
        })
    }

    pub fn counter(&self, identity: MetricIdentity) -> Result<Arc<Counter>> {
        self.get_or_insert(identity, || Metric::Counter(Arc::new(Counter::new())), |m| match m {
            Metric::Counter(c) => Some(Arc::clone(c)),
            _ => None,
        })
    }

    pub fn concurrent_gauge(&self, identity: MetricIdentity) -> Result<Arc<ConcurrentGauge>> {
        self.get_or_insert(
            identity,
            || Metric::ConcurrentGauge(Arc::new(ConcurrentGauge::new())),
            |m| match m {
                Metric::ConcurrentGauge(g) => Some(Arc::clone(g)),
                _ => None,
            },
        )
    }

    pub fn histogram(&self, identity: MetricIdentity) -> Result<Arc<Histogram>> {
        let capacity = self.reservoir_size;
        self.get_or_insert(
            identity,
            || Metric::Histogram(Arc::new(Histogram::with_capacity(capacity))),
            |m| match m {
                Metric::Histogram(h) => Some(Arc::clone(h)),
                _ => None,
            },
        )
    }

    fn get_or_insert<T>(
        &self,
        identity: MetricIdentity,
        create: impl FnOnce() -> Metric,
        extract: impl Fn(&Metric) -> Option<T>,
    ) -> Result<T> {
        match self.metrics.entry(identity) {
            Entry::Occupied(entry) => extract(entry.get()).ok_or_else(|| {
                ExportError::config(format!(
                    "Metric '{}' is already registered as a {}",
                    entry.key(),
                    entry.get().kind()
                ))
            }),
            Entry::Vacant(entry) => {
                let metric = create();
                let handle = extract(&metric)
                    .ok_or_else(|| ExportError::config("Created metric has unexpected kind"))?;
                entry.insert(metric);
                Ok(handle)
            },
        }
    }
}

impl MetricRegistry for InMemoryRegistry {
    fn name(&self) -> &str {
        &self.name
    }

    fn enumerate(&self, visitor: &mut dyn FnMut(&MetricIdentity, &Metric)) {
        // Clone handles out first so visitors never run under a shard lock.
        let entries: Vec<(MetricIdentity, Metric)> = self
            .metrics
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        for (identity, metric) in &entries {
            visitor(identity, metric);
        }
    }
}
