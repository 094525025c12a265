//! metric-bridge - periodic metrics export to a time-series backend.
//!
//! The exporter reads an application-local metrics registry on a fixed
//! schedule and writes the values to a remote monitoring backend that
//! organizes data as metric descriptors plus batched time series writes.
//!
//! # Architecture
//!
//! - `metrics`: instruments, registries, snapshots and bucket mapping
//! - `export`: descriptor cache, series builder, batching and the cycle
//!   controller
//! - `core`: configuration, errors and shared identity types
//! - `cli`: command-line interface with a console backend
//!
//! # Example
//!
//! ```no_run
//! use metric_bridge::core::{ConfigBuilder, MetricIdentity};
//! use metric_bridge::export::{ConsoleBackend, MetricsExporter};
//! use metric_bridge::metrics::InMemoryRegistry;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigBuilder::new().project_id("my-project").build()?;
//!     let registry = Arc::new(InMemoryRegistry::new("app"));
//!     registry.counter(MetricIdentity::new("requests")?)?.inc();
//!
//!     let backend = Arc::new(ConsoleBackend::stdout(false));
//!     let exporter = MetricsExporter::builder(&config)
//!         .registry(registry)
//!         .descriptor_service(backend.clone())
//!         .time_series_service(backend)
//!         .build()?;
//!
//!     let handle = Arc::new(exporter).start(config.exporter.export_interval);
//!     tokio::signal::ctrl_c().await?;
//!     handle.shutdown().await?;
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod cli;
pub mod core;
pub mod export;
pub mod metrics;

// Re-export core types for convenience
pub use crate::core::{Config, ExportError, Result};
pub use crate::export::MetricsExporter;
