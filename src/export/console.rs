//! Dry-run backend that prints everything it would send.

use crate::core::config::MAX_TIME_SERIES_PER_REQUEST;
use crate::core::{ExportError, MonitoredScope, Result};
use crate::export::descriptor::MetricDescriptor;
use crate::export::remote::{DescriptorService, TimeSeriesService};
use crate::export::series::TimeSeries;
use parking_lot::Mutex;
use std::io::Write;

/// Backend that accepts every request and writes it as JSON lines.
pub struct ConsoleBackend {
    out: Mutex<Box<dyn Write + Send>>,
    pretty: bool,
}

impl ConsoleBackend {
    /// Print to stdout
    pub fn stdout(pretty: bool) -> Self {
        Self::new(Box::new(std::io::stdout()), pretty)
    }

    pub fn new(out: Box<dyn Write + Send>, pretty: bool) -> Self {
        Self {
            out: Mutex::new(out),
            pretty,
        }
    }

    fn emit(&self, kind: &str, scope: &MonitoredScope, body: &serde_json::Value) -> Result<()> {
        let record = serde_json::json!({
            "kind": kind,
            "name": scope.name(),
            "body": body,
        });
        let line = if self.pretty {
            serde_json::to_string_pretty(&record)?
        } else {
            serde_json::to_string(&record)?
        };

        let mut out = self.out.lock();
        writeln!(out, "{}", line)?;
        out.flush()?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl DescriptorService for ConsoleBackend {
    async fn create_or_get(
        &self,
        scope: &MonitoredScope,
        draft: MetricDescriptor,
    ) -> Result<MetricDescriptor> {
        self.emit("metricDescriptors.create", scope, &serde_json::to_value(&draft)?)?;
        Ok(draft)
    }
}

#[async_trait::async_trait]
impl TimeSeriesService for ConsoleBackend {
    async fn write(&self, scope: &MonitoredScope, batch: &[TimeSeries]) -> Result<()> {
        if batch.len() > MAX_TIME_SERIES_PER_REQUEST {
            return Err(ExportError::BatchTooLarge {
                size: batch.len(),
                limit: MAX_TIME_SERIES_PER_REQUEST,
            });
        }
        tracing::debug!(size = batch.len(), "Writing time series batch to console");
        self.emit(
            "timeSeries.create",
            scope,
            &serde_json::json!({ "timeSeries": batch }),
        )
    }
}
