//! Export pipeline to the remote monitoring backend.
//!
//! - `descriptor`: backend metric descriptors, created once per identity
//! - `series`: wire-ready time series built from snapshots
//! - `batch`: write-sized chunking
//! - `checkpoint`: last successfully exported window
//! - `controller`: the periodic collect/resolve/build/send cycle
//! - `remote`: traits the backend client implements
//! - `console`: a dry-run backend printing JSON

pub mod batch;
pub mod checkpoint;
pub mod console;
pub mod controller;
pub mod descriptor;
pub mod remote;
pub mod series;

pub use batch::partition;
pub use checkpoint::ExportCheckpoint;
pub use console::ConsoleBackend;
pub use controller::{
    CyclePhase, CycleReport, ExporterBuilder, ExporterHandle, MetricsExporter, TickOutcome,
};
pub use descriptor::{DescriptorCache, LabelDescriptor, MetricDescriptor, MetricKind, ValueKind};
pub use remote::{DescriptorService, TimeSeriesService};
pub use series::{Distribution, Point, SeriesContext, TimeSeries, TypedValue};
