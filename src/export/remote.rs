//! Remote backend collaborators.
//!
//! The exporter talks to the monitoring backend through these two traits
//! only. Implementations own transport, authentication and timeouts.

use crate::core::{MonitoredScope, Result};
use crate::export::descriptor::MetricDescriptor;
use crate::export::series::TimeSeries;

/// Creates backend metric descriptors.
#[async_trait::async_trait]
pub trait DescriptorService: Send + Sync {
    /// Create `draft`, or return the existing descriptor for its type.
    ///
    /// Must be idempotent: creating an already existing descriptor is
    /// harmless.
    async fn create_or_get(
        &self,
        scope: &MonitoredScope,
        draft: MetricDescriptor,
    ) -> Result<MetricDescriptor>;
}

/// Writes batches of time series.
#[async_trait::async_trait]
pub trait TimeSeriesService: Send + Sync {
    /// Write one batch. The exporter never sends more than its configured
    /// batch size in a single call and never retries within a cycle.
    async fn write(&self, scope: &MonitoredScope, batch: &[TimeSeries]) -> Result<()>;
}
