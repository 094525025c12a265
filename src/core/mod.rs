//! Core types shared by the collection and export pipeline.
//!
//! This module contains configuration, errors, identities and the clock
//! abstraction used to stamp export intervals.

pub mod clock;
pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, ConfigBuilder, MetadataLookup, MetricMetadata, MetricOverride};
pub use error::{ExportError, Result};
pub use types::{MetricIdentity, MonitoredScope, ResourceIdentity, TimeInterval};
