//! Common test utilities and fixtures.

#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use metric_bridge::core::{Clock, ConfigBuilder, ExportError, ManualClock, MonitoredScope, Result};
use metric_bridge::export::{
    DescriptorService, MetricDescriptor, MetricsExporter, TimeSeries, TimeSeriesService,
};
use metric_bridge::metrics::{InMemoryRegistry, MetricRegistry};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Fake backend recording every call, with failure injection.
#[derive(Default)]
pub struct RecordingBackend {
    descriptor_calls: Mutex<HashMap<String, usize>>,
    failing_descriptors: Mutex<HashSet<String>>,
    batches: Mutex<Vec<Vec<TimeSeries>>>,
    write_calls: AtomicUsize,
    fail_writes: AtomicBool,
    fail_after_writes: Mutex<Option<usize>>,
    write_gate: Mutex<Option<Arc<Semaphore>>>,
}

impl RecordingBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Remote create calls seen for a metric type
    pub fn descriptor_calls(&self, metric_type: &str) -> usize {
        self.descriptor_calls
            .lock()
            .get(metric_type)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_descriptor_calls(&self) -> usize {
        self.descriptor_calls.lock().values().sum()
    }

    pub fn fail_descriptor(&self, metric_type: &str, fail: bool) {
        let mut failing = self.failing_descriptors.lock();
        if fail {
            failing.insert(metric_type.to_string());
        } else {
            failing.remove(metric_type);
        }
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Let `n` more writes succeed, then fail the rest
    pub fn fail_after(&self, n: usize) {
        *self.fail_after_writes.lock() = Some(self.write_calls.load(Ordering::SeqCst) + n);
    }

    /// Make every write wait for a permit on the returned semaphore
    pub fn gate_writes(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.write_gate.lock() = Some(Arc::clone(&gate));
        gate
    }

    pub fn write_calls(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }

    /// Successfully written batches
    pub fn batches(&self) -> Vec<Vec<TimeSeries>> {
        self.batches.lock().clone()
    }

    /// Successfully written series, in write order
    pub fn written(&self) -> Vec<TimeSeries> {
        self.batches.lock().iter().flatten().cloned().collect()
    }

    pub fn clear_written(&self) {
        self.batches.lock().clear();
    }
}

#[async_trait::async_trait]
impl DescriptorService for RecordingBackend {
    async fn create_or_get(
        &self,
        _scope: &MonitoredScope,
        draft: MetricDescriptor,
    ) -> Result<MetricDescriptor> {
        *self
            .descriptor_calls
            .lock()
            .entry(draft.metric_type.clone())
            .or_insert(0) += 1;

        if self.failing_descriptors.lock().contains(&draft.metric_type) {
            return Err(ExportError::network(format!(
                "create {} refused",
                draft.metric_type
            )));
        }
        Ok(draft)
    }
}

#[async_trait::async_trait]
impl TimeSeriesService for RecordingBackend {
    async fn write(&self, _scope: &MonitoredScope, batch: &[TimeSeries]) -> Result<()> {
        let gate = self.write_gate.lock().clone();
        if let Some(gate) = gate {
            gate.acquire()
                .await
                .map_err(|_| ExportError::network("gate closed"))?
                .forget();
        }

        let call = self.write_calls.fetch_add(1, Ordering::SeqCst);
        let over_budget = self
            .fail_after_writes
            .lock()
            .map_or(false, |limit| call >= limit);
        if self.fail_writes.load(Ordering::SeqCst) || over_budget {
            return Err(ExportError::write("backend unavailable"));
        }

        self.batches.lock().push(batch.to_vec());
        Ok(())
    }
}

pub fn start_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

pub fn metric_type(name: &str) -> String {
    format!("custom.googleapis.com/test/{}", name)
}

/// Exporter wired to a recording backend and a manual clock.
pub struct Harness {
    pub exporter: Arc<MetricsExporter>,
    pub backend: Arc<RecordingBackend>,
    pub clock: Arc<ManualClock>,
    pub registry: Arc<InMemoryRegistry>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_batch_size(200)
    }

    pub fn with_batch_size(max_batch_size: usize) -> Self {
        let registry = Arc::new(InMemoryRegistry::new("app"));
        Self::with_registries(max_batch_size, vec![Arc::clone(&registry) as Arc<dyn MetricRegistry>], registry)
    }

    pub fn with_registries(
        max_batch_size: usize,
        registries: Vec<Arc<dyn MetricRegistry>>,
        registry: Arc<InMemoryRegistry>,
    ) -> Self {
        let config = ConfigBuilder::new()
            .project_id("test-project")
            .metric_prefix("custom.googleapis.com/test")
            .max_batch_size(max_batch_size)
            .build()
            .unwrap();
        let backend = RecordingBackend::new();
        let clock = Arc::new(ManualClock::new(start_time()));

        let mut builder = MetricsExporter::builder(&config)
            .descriptor_service(Arc::clone(&backend) as Arc<dyn DescriptorService>)
            .time_series_service(Arc::clone(&backend) as Arc<dyn TimeSeriesService>)
            .clock(Arc::clone(&clock) as Arc<dyn Clock>);
        for registry in registries {
            builder = builder.registry(registry);
        }

        Self {
            exporter: Arc::new(builder.build().unwrap()),
            backend,
            clock,
            registry,
        }
    }

    /// Move the clock forward one minute
    pub fn advance(&self) {
        self.clock.advance(Duration::seconds(60));
    }
}
