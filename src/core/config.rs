//! Configuration management for the exporter.
//!
//! This module provides configuration handling with:
//! - YAML file support
//! - Per-metric metadata overrides
//! - Validation and defaults

use crate::core::error::{ExportError, Result};
use crate::core::types::MetricIdentity;
use crate::metrics::buckets::BucketLayout;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Duration;

/// Hard ceiling on time series per write request imposed by the backend
pub const MAX_TIME_SERIES_PER_REQUEST: usize = 200;

/// Complete configuration for the exporter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Export loop configuration
    pub exporter: ExporterConfig,
    /// Monitored resource configuration
    pub resource: ResourceConfig,
    /// Metric metadata and bucket layouts
    pub metrics: MetricsConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Debug mode
    #[serde(skip)]
    pub debug: bool,
}

/// Export loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExporterConfig {
    /// Backend project owning descriptors and series
    pub project_id: String,
    /// Time between export cycles
    #[serde(with = "humantime_serde")]
    pub export_interval: Duration,
    /// Maximum time series per write request
    pub max_batch_size: usize,
    /// Prefix prepended to every metric name to form the backend metric type
    pub metric_prefix: String,
}

/// Monitored resource configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    /// Monitored resource type
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Resource labels
    pub labels: BTreeMap<String, String>,
}

/// Metric metadata configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Layout used for distributions without an override
    #[serde(with = "serde_yaml::with::singleton_map")]
    pub default_buckets: BucketLayout,
    /// Samples retained per histogram
    pub reservoir_size: usize,
    /// Per-metric overrides keyed by metric name
    pub overrides: HashMap<String, MetricOverride>,
}

/// Presentation overrides for a single metric
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricOverride {
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub unit: Option<String>,
    #[serde(with = "serde_yaml::with::singleton_map_recursive")]
    pub buckets: Option<BucketLayout>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: LogLevel,
    /// Structured logging format
    pub structured: bool,
}

/// Log levels
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        ExporterConfig {
            project_id: String::new(),
            export_interval: Duration::from_secs(60),
            max_batch_size: MAX_TIME_SERIES_PER_REQUEST,
            metric_prefix: "custom.googleapis.com/app".to_string(),
        }
    }
}

impl Default for ResourceConfig {
    fn default() -> Self {
        ResourceConfig {
            resource_type: "global".to_string(),
            labels: BTreeMap::new(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        MetricsConfig {
            default_buckets: BucketLayout::Exponential {
                count: 20,
                scale: 1.0,
                growth: 2.0,
            },
            reservoir_size: 1028,
            overrides: HashMap::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: LogLevel::Info,
            structured: false,
        }
    }
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.exporter.export_interval.is_zero() {
            return Err(ExportError::config("export_interval must be greater than 0"));
        }

        if self.exporter.max_batch_size == 0
            || self.exporter.max_batch_size > MAX_TIME_SERIES_PER_REQUEST
        {
            return Err(ExportError::config(format!(
                "max_batch_size must be between 1 and {}, got {}",
                MAX_TIME_SERIES_PER_REQUEST, self.exporter.max_batch_size
            )));
        }

        if self.exporter.metric_prefix.trim_matches('/').is_empty() {
            return Err(ExportError::config("metric_prefix cannot be empty"));
        }

        if self.metrics.reservoir_size == 0 {
            return Err(ExportError::config("reservoir_size must be greater than 0"));
        }

        self.metrics.default_buckets.validate()?;

        for (name, metric) in &self.metrics.overrides {
            if let Some(layout) = &metric.buckets {
                layout.validate().map_err(|e| {
                    ExportError::config(format!("Invalid buckets for metric '{}': {}", name, e))
                })?;
            }
        }

        Ok(())
    }
}

impl LogLevel {
    /// Convert to tracing filter string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Descriptor presentation data for one metric
#[derive(Debug, Clone, PartialEq)]
pub struct MetricMetadata {
    pub display_name: String,
    pub description: String,
    pub unit: String,
    pub buckets: BucketLayout,
}

/// Read-only metadata source consulted when a descriptor is first created
pub trait MetadataLookup: Send + Sync {
    fn metadata(&self, identity: &MetricIdentity) -> MetricMetadata;
}

impl MetadataLookup for MetricsConfig {
    fn metadata(&self, identity: &MetricIdentity) -> MetricMetadata {
        let metric = self.overrides.get(identity.name());

        MetricMetadata {
            display_name: metric
                .and_then(|m| m.display_name.clone())
                .unwrap_or_else(|| identity.name().to_string()),
            description: metric
                .and_then(|m| m.description.clone())
                .unwrap_or_default(),
            unit: metric
                .and_then(|m| m.unit.clone())
                .unwrap_or_else(|| "1".to_string()),
            buckets: metric
                .and_then(|m| m.buckets.clone())
                .unwrap_or_else(|| self.default_buckets.clone()),
        }
    }
}

/// Configuration builder for programmatic construction
pub struct ConfigBuilder {
    config: Config,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    /// Create a new builder with defaults
    pub fn new() -> Self {
        ConfigBuilder {
            config: Config::default(),
        }
    }

    /// Load configuration from YAML string
    pub fn from_yaml(mut self, yaml: &str) -> Result<Self> {
        self.config = serde_yaml::from_str(yaml)
            .map_err(|e| ExportError::config(format!("Failed to parse YAML config: {}", e)))?;
        Ok(self)
    }

    /// Load configuration from a YAML file
    pub async fn from_file(self, path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            ExportError::config(format!("Failed to read config file {:?}: {}", path, e))
        })?;
        self.from_yaml(&content)
    }

    /// Set the backend project
    pub fn project_id<S: Into<String>>(mut self, project_id: S) -> Self {
        self.config.exporter.project_id = project_id.into();
        self
    }

    /// Set the export interval
    pub fn export_interval(mut self, interval: Duration) -> Self {
        self.config.exporter.export_interval = interval;
        self
    }

    /// Set max time series per write request
    pub fn max_batch_size(mut self, size: usize) -> Self {
        self.config.exporter.max_batch_size = size;
        self
    }

    /// Set the metric type prefix
    pub fn metric_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.config.exporter.metric_prefix = prefix.into();
        self
    }

    /// Set the default bucket layout
    pub fn default_buckets(mut self, layout: BucketLayout) -> Self {
        self.config.metrics.default_buckets = layout;
        self
    }

    /// Add a per-metric override
    pub fn metric_override<S: Into<String>>(mut self, name: S, metric: MetricOverride) -> Self {
        self.config.metrics.overrides.insert(name.into(), metric);
        self
    }

    /// Set debug mode
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
