//! Export cycle controller.
//!
//! One cycle per scheduler tick:
//! collect snapshots -> resolve descriptors -> build series -> send batches.
//! Per-metric failures only drop that metric for the cycle. A failed write
//! aborts the cycle and leaves the checkpoint where it was, so the next
//! successful cycle covers the missed window.

use crate::core::{
    Clock, Config, ExportError, MetadataLookup, MetricIdentity, MonitoredScope, ResourceIdentity,
    Result, SystemClock, TimeInterval,
};
use crate::export::batch::partition;
use crate::export::checkpoint::ExportCheckpoint;
use crate::export::descriptor::{DescriptorCache, MetricDescriptor};
use crate::export::remote::{DescriptorService, TimeSeriesService};
use crate::export::series::{self, SeriesContext, TimeSeries};
use crate::metrics::{classify, BucketLayout, Metric, MetricRegistry, Snapshot};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Where the exporter currently is within a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    Collecting,
    ResolvingDescriptors,
    Building,
    Sending,
}

/// Summary of one completed cycle
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// Window covered by this cycle
    pub interval: TimeInterval,
    /// Metrics with a snapshot
    pub collected: usize,
    /// Metrics dropped because of read or descriptor errors
    pub skipped: usize,
    /// Series written
    pub written: usize,
    /// Write calls issued
    pub batches: usize,
}

/// Result of a scheduler tick
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Completed(CycleReport),
    /// A previous cycle was still running
    Skipped,
}

/// Periodic exporter from registries to the monitoring backend
pub struct MetricsExporter {
    registries: Vec<Arc<dyn MetricRegistry>>,
    metadata: Arc<dyn MetadataLookup>,
    descriptors: DescriptorCache,
    series: Arc<dyn TimeSeriesService>,
    scope: MonitoredScope,
    resource: ResourceIdentity,
    checkpoint: ExportCheckpoint,
    clock: Arc<dyn Clock>,
    max_batch_size: usize,
    in_flight: AtomicBool,
    phase: Mutex<CyclePhase>,
}

/// Releases the overlap guard and resets the phase when a cycle ends
struct CycleGuard<'a> {
    exporter: &'a MetricsExporter,
}

impl<'a> CycleGuard<'a> {
    fn acquire(exporter: &'a MetricsExporter) -> Option<Self> {
        exporter
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CycleGuard { exporter })
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        *self.exporter.phase.lock() = CyclePhase::Idle;
        self.exporter.in_flight.store(false, Ordering::Release);
    }
}

impl MetricsExporter {
    pub fn builder(config: &Config) -> ExporterBuilder {
        ExporterBuilder::new(config)
    }

    pub fn phase(&self) -> CyclePhase {
        *self.phase.lock()
    }

    pub fn checkpoint(&self) -> &ExportCheckpoint {
        &self.checkpoint
    }

    pub fn descriptors(&self) -> &DescriptorCache {
        &self.descriptors
    }

    pub fn resource(&self) -> &ResourceIdentity {
        &self.resource
    }

    fn set_phase(&self, phase: CyclePhase) {
        *self.phase.lock() = phase;
    }

    /// Run one export cycle unless another is still in flight.
    ///
    /// Errors are logged here; the caller only needs them for reporting.
    pub async fn tick(&self) -> Result<TickOutcome> {
        let Some(_guard) = CycleGuard::acquire(self) else {
            tracing::debug!("Previous export cycle still running, skipping tick");
            return Ok(TickOutcome::Skipped);
        };

        match self.run_cycle().await {
            Ok(report) => {
                tracing::debug!(
                    collected = report.collected,
                    skipped = report.skipped,
                    written = report.written,
                    batches = report.batches,
                    "Export cycle complete"
                );
                Ok(TickOutcome::Completed(report))
            },
            Err(e) => {
                tracing::warn!(
                    category = e.category(),
                    interval_start = %self.checkpoint.interval_start(),
                    "Export cycle failed, window will be retried next cycle: {}",
                    e
                );
                Err(e)
            },
        }
    }

    async fn run_cycle(&self) -> Result<CycleReport> {
        let interval_end = self.clock.now();
        let interval = self.checkpoint.window(interval_end);

        self.set_phase(CyclePhase::Collecting);
        let (snapshots, mut skipped) = self.collect();
        let collected = snapshots.len();

        self.set_phase(CyclePhase::ResolvingDescriptors);
        let (resolved, failed) = self.resolve(&snapshots).await;
        skipped += failed;

        self.set_phase(CyclePhase::Building);
        let ctx = SeriesContext {
            resource: self.resource.clone(),
            process_start: self.checkpoint.process_start(),
            interval,
            snapshots,
        };
        let points: Vec<TimeSeries> = resolved
            .iter()
            .filter_map(|(identity, descriptor, layout)| {
                series::build(&ctx, identity, descriptor, layout)
            })
            .collect();
        drop(ctx);

        self.set_phase(CyclePhase::Sending);
        let batches = partition(points, self.max_batch_size);
        let batch_count = batches.len();
        let mut written = 0;
        for (index, batch) in batches.iter().enumerate() {
            if let Err(e) = self.series.write(&self.scope, batch).await {
                tracing::warn!(
                    batch = index,
                    of = batch_count,
                    size = batch.len(),
                    "Time series write failed, aborting remaining batches"
                );
                return Err(e);
            }
            written += batch.len();
        }

        self.checkpoint.advance(interval_end);

        Ok(CycleReport {
            interval,
            collected,
            skipped,
            written,
            batches: batch_count,
        })
    }

    fn collect(&self) -> (HashMap<MetricIdentity, Snapshot>, usize) {
        let mut snapshots = HashMap::new();
        let mut failed = 0;

        for registry in &self.registries {
            registry.enumerate(&mut |identity, metric| match read_metric(identity, metric) {
                Ok(Some(snapshot)) => {
                    if snapshots.insert(identity.clone(), snapshot).is_some() {
                        tracing::debug!(
                            metric = %identity,
                            registry = registry.name(),
                            "Metric registered in more than one registry, keeping the last"
                        );
                    }
                },
                Ok(None) => {
                    tracing::trace!(metric = %identity, kind = metric.kind(), "Unsupported metric kind");
                },
                Err(e) => {
                    failed += 1;
                    tracing::warn!(
                        metric = %identity,
                        registry = registry.name(),
                        "Failed to read metric, skipping this cycle: {}",
                        e
                    );
                },
            });
        }

        (snapshots, failed)
    }

    async fn resolve(
        &self,
        snapshots: &HashMap<MetricIdentity, Snapshot>,
    ) -> (Vec<(MetricIdentity, Arc<MetricDescriptor>, BucketLayout)>, usize) {
        let mut identities: Vec<&MetricIdentity> = snapshots.keys().collect();
        identities.sort();

        let mut resolved = Vec::with_capacity(identities.len());
        let mut failed = 0;
        for identity in identities {
            let metadata = self.metadata.metadata(identity);
            let snapshot = &snapshots[identity];
            match self.descriptors.descriptor_for(identity, &metadata, snapshot).await {
                Ok(descriptor) => resolved.push((identity.clone(), descriptor, metadata.buckets)),
                Err(e) => {
                    failed += 1;
                    tracing::warn!(metric = %identity, "Skipping metric this cycle: {}", e);
                },
            }
        }

        (resolved, failed)
    }

    /// Start ticking every `period` on the current tokio runtime.
    ///
    /// Each tick runs on its own task so a stuck backend call cannot stop
    /// the timer; overlapping ticks are skipped. Stopping (or dropping the
    /// handle) cancels future ticks only. There is no final flush.
    pub fn start(self: Arc<Self>, period: Duration) -> ExporterHandle {
        let (shutdown, mut stopped) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            tracing::info!(
                period = ?period,
                scope = %self.scope,
                "Metrics exporter started"
            );

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let exporter = Arc::clone(&self);
                        tokio::spawn(async move {
                            // Failures are logged by tick().
                            let _ = exporter.tick().await;
                        });
                    }
                    _ = stopped.changed() => break,
                }
            }

            tracing::info!("Metrics exporter stopped");
        });

        ExporterHandle { shutdown, task }
    }
}

/// Classify `metric`, turning a panicking instrument into a read error.
fn read_metric(identity: &MetricIdentity, metric: &Metric) -> Result<Option<Snapshot>> {
    catch_unwind(AssertUnwindSafe(|| classify(metric))).unwrap_or_else(|panic| {
        let message = panic
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "instrument panicked".to_string());
        Err(ExportError::metric_read(identity.to_string(), message))
    })
}

/// Handle to a running exporter schedule
pub struct ExporterHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ExporterHandle {
    /// Stop scheduling new ticks; an in-flight cycle still completes
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.shutdown.send(true);
        self.task.await?;
        Ok(())
    }
}

/// Wires an exporter from config and its collaborators
pub struct ExporterBuilder {
    config: Config,
    registries: Vec<Arc<dyn MetricRegistry>>,
    metadata: Option<Arc<dyn MetadataLookup>>,
    descriptor_service: Option<Arc<dyn DescriptorService>>,
    series_service: Option<Arc<dyn TimeSeriesService>>,
    clock: Arc<dyn Clock>,
}

impl ExporterBuilder {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
            registries: Vec::new(),
            metadata: None,
            descriptor_service: None,
            series_service: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// Add a registry partition to export
    pub fn registry(mut self, registry: Arc<dyn MetricRegistry>) -> Self {
        self.registries.push(registry);
        self
    }

    /// Metadata source; defaults to the `metrics` config section
    pub fn metadata(mut self, metadata: Arc<dyn MetadataLookup>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn descriptor_service(mut self, service: Arc<dyn DescriptorService>) -> Self {
        self.descriptor_service = Some(service);
        self
    }

    pub fn time_series_service(mut self, service: Arc<dyn TimeSeriesService>) -> Self {
        self.series_service = Some(service);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Validate config, resolve the monitored resource and build.
    ///
    /// Any error here means the exporter must not start.
    pub fn build(self) -> Result<MetricsExporter> {
        self.config.validate()?;
        let (scope, resource) = ResourceIdentity::resolve(&self.config)?;

        let descriptor_service = self
            .descriptor_service
            .ok_or_else(|| ExportError::config("No descriptor service configured"))?;
        let series_service = self
            .series_service
            .ok_or_else(|| ExportError::config("No time series service configured"))?;
        if self.registries.is_empty() {
            tracing::warn!("Metrics exporter built without any registry");
        }

        let metadata = self
            .metadata
            .unwrap_or_else(|| Arc::new(self.config.metrics.clone()));
        let process_start = self.clock.now();

        Ok(MetricsExporter {
            registries: self.registries,
            metadata,
            descriptors: DescriptorCache::new(
                descriptor_service,
                scope.clone(),
                self.config.exporter.metric_prefix.clone(),
            ),
            series: series_service,
            scope,
            resource,
            checkpoint: ExportCheckpoint::new(process_start),
            clock: self.clock,
            max_batch_size: self.config.exporter.max_batch_size,
            in_flight: AtomicBool::new(false),
            phase: Mutex::new(CyclePhase::Idle),
        })
    }
}
