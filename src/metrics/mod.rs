//! Application-side metrics: instruments, registries, snapshots and
//! bucket mapping.
//!
//! Everything here is synchronous and free of I/O; the export pipeline in
//! [`crate::export`] drives it once per cycle.

pub mod buckets;
pub mod registry;
pub mod snapshot;

pub use buckets::{bucket_counts, BucketLayout, MAX_FINITE_BUCKETS};
pub use registry::{
    ConcurrentGauge, Counter, Gauge, GaugeValue, Histogram, InMemoryRegistry, Metric,
    MetricRegistry,
};
pub use snapshot::{classify, Snapshot, SnapshotShape, SummaryStats};
