//! Command-line interface for the exporter.
//!
//! Runs the exporter against the console backend, which prints every
//! descriptor and write request as JSON. Useful to check a configuration
//! and see exactly what would be sent.

use crate::core::{Config, ConfigBuilder, ExportError, MetricIdentity, Result};
use crate::export::{ConsoleBackend, DescriptorService, MetricsExporter, TimeSeriesService};
use crate::metrics::{InMemoryRegistry, MetricRegistry};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Export in-process metrics to a time-series monitoring backend
#[derive(Parser, Debug)]
#[command(name = "metric-bridge")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path (default: ~/.config/metric-bridge/config.yaml)
    #[arg(short, long, env = "METRIC_BRIDGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Backend project id
    #[arg(long, env = "METRIC_BRIDGE_PROJECT_ID")]
    pub project_id: Option<String>,

    /// Export interval, e.g. "60s" or "1m"
    #[arg(long, env = "METRIC_BRIDGE_INTERVAL", value_parser = humantime_serde::re::humantime::parse_duration)]
    pub interval: Option<Duration>,

    /// Maximum time series per write request
    #[arg(long, env = "METRIC_BRIDGE_MAX_BATCH_SIZE")]
    pub max_batch_size: Option<usize>,

    /// Populate a registry with synthetic metrics
    #[arg(long)]
    pub demo: bool,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Enable debug logging
    #[arg(short, long, env = "METRIC_BRIDGE_DEBUG")]
    pub debug: bool,

    /// Validate configuration and exit
    #[arg(long)]
    pub check_config: bool,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Load configuration with proper precedence:
    /// 1. CLI arguments and environment (highest priority)
    /// 2. Config file
    /// 3. Defaults (lowest priority)
    pub async fn load_config(&self) -> Result<Config> {
        let builder = ConfigBuilder::new();

        let config_path = match &self.config {
            Some(path) => path.clone(),
            None => {
                let default_path = dirs::config_dir()
                    .map(|d| d.join("metric-bridge").join("config.yaml"))
                    .unwrap_or_else(|| PathBuf::from("~/.config/metric-bridge/config.yaml"));

                if !default_path.exists() {
                    tracing::debug!("No config file found at {:?}, using defaults", default_path);
                    return self.apply_overrides(builder);
                }
                default_path
            },
        };

        let builder = builder.from_file(&config_path).await?;
        tracing::info!("Loaded configuration from: {:?}", config_path);

        self.apply_overrides(builder)
    }

    fn apply_overrides(&self, mut builder: ConfigBuilder) -> Result<Config> {
        if let Some(project_id) = &self.project_id {
            builder = builder.project_id(project_id.clone());
        }
        if let Some(interval) = self.interval {
            builder = builder.export_interval(interval);
        }
        if let Some(size) = self.max_batch_size {
            builder = builder.max_batch_size(size);
        }

        builder.debug(self.debug).build()
    }

    /// Initialize logging based on configuration.
    pub fn init_logging(&self, config: &Config) -> Result<()> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

        let level = if self.debug {
            "debug"
        } else {
            config.logging.level.as_str()
        };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

        // Logs go to stderr; stdout carries the exported JSON.
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(config.logging.structured)
            .with_thread_ids(config.logging.structured)
            .compact();

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| ExportError::config(format!("Failed to initialize logging: {}", e)))?;

        Ok(())
    }
}

/// Execute the exporter.
pub async fn execute(cli: Cli) -> Result<()> {
    let config = cli.load_config().await?;
    cli.init_logging(&config)?;

    if cli.check_config {
        let (scope, resource) = crate::core::ResourceIdentity::resolve(&config)?;
        println!("Configuration is valid!");
        println!("  Project: {}", scope.name());
        println!("  Resource: {}", resource.resource_type);
        println!("  Interval: {:?}", config.exporter.export_interval);
        println!("  Max batch size: {}", config.exporter.max_batch_size);
        return Ok(());
    }

    let registry = Arc::new(InMemoryRegistry::with_reservoir_size(
        "default",
        config.metrics.reservoir_size,
    ));
    let backend = Arc::new(ConsoleBackend::stdout(cli.pretty));

    let exporter = MetricsExporter::builder(&config)
        .registry(Arc::clone(&registry) as Arc<dyn MetricRegistry>)
        .descriptor_service(Arc::clone(&backend) as Arc<dyn DescriptorService>)
        .time_series_service(backend as Arc<dyn TimeSeriesService>)
        .build()
        .map_err(|e| {
            tracing::error!("Exporter cannot start: {}", e);
            e
        })?;

    let demo = if cli.demo {
        Some(tokio::spawn(run_demo(Arc::clone(&registry))))
    } else {
        None
    };

    let handle = Arc::new(exporter).start(config.exporter.export_interval);

    tokio::signal::ctrl_c().await?;
    tracing::info!("Received shutdown signal, stopping...");

    if let Some(demo) = demo {
        demo.abort();
    }
    handle.shutdown().await
}

/// Keep a handful of synthetic metrics moving.
async fn run_demo(registry: Arc<InMemoryRegistry>) -> Result<()> {
    let requests = registry.counter(MetricIdentity::new("requests")?.tagged("route", "/api"))?;
    let errors = registry.counter(MetricIdentity::new("errors")?.tagged("route", "/api"))?;
    let in_flight = registry.concurrent_gauge(MetricIdentity::new("in_flight")?)?;
    let load = registry.gauge(MetricIdentity::new("load")?)?;
    let latency = registry.histogram(MetricIdentity::new("request_latency")?)?;

    let mut ticker = tokio::time::interval(Duration::from_millis(250));
    let mut step: i64 = 0;
    let mut active = Vec::new();
    loop {
        ticker.tick().await;
        step += 1;

        // Requests stay in flight across ticks; finish them in waves.
        active.push(in_flight.track());
        if step % 8 == 0 {
            active.clear();
        }
        requests.inc();
        if step % 17 == 0 {
            errors.inc();
        }
        latency.record(5 + (step * 37) % 400);
        #[allow(clippy::cast_precision_loss)]
        load.set((step % 100) as f64 / 100.0);
    }
}
