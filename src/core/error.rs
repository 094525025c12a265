use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid bucket layout: {0}")]
    InvalidLayout(String),

    #[error("Failed to read metric '{metric}': {message}")]
    MetricRead { metric: String, message: String },

    #[error("Descriptor creation failed for '{metric}': {message}")]
    Descriptor { metric: String, message: String },

    #[error("Time series write failed: {0}")]
    Write(String),

    #[error("Monitored resource could not be resolved: {0}")]
    Resource(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Batch of {size} series exceeds the per-request limit of {limit}")]
    BatchTooLarge { size: usize, limit: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Async task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Result type alias for exporter operations
pub type Result<T> = std::result::Result<T, ExportError>;

impl ExportError {
    /// Creates a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a new bucket layout error
    pub fn layout<S: Into<String>>(msg: S) -> Self {
        Self::InvalidLayout(msg.into())
    }

    /// Creates a new metric read error
    pub fn metric_read<M: Into<String>, S: Into<String>>(metric: M, msg: S) -> Self {
        Self::MetricRead {
            metric: metric.into(),
            message: msg.into(),
        }
    }

    /// Creates a new descriptor error
    pub fn descriptor<M: Into<String>, S: Into<String>>(metric: M, msg: S) -> Self {
        Self::Descriptor {
            metric: metric.into(),
            message: msg.into(),
        }
    }

    /// Creates a new write error
    pub fn write<S: Into<String>>(msg: S) -> Self {
        Self::Write(msg.into())
    }

    /// Creates a new resource resolution error
    pub fn resource<S: Into<String>>(msg: S) -> Self {
        Self::Resource(msg.into())
    }

    /// Creates a new network error
    pub fn network<S: Into<String>>(msg: S) -> Self {
        Self::Network(msg.into())
    }

    /// Returns true if the next cycle may succeed where this one failed
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Write(_) => true,
            Self::Descriptor { .. } | Self::MetricRead { .. } => true,
            _ => false,
        }
    }

    /// Returns the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) | Self::InvalidLayout(_) => "config",
            Self::MetricRead { .. } => "collect",
            Self::Descriptor { .. } => "descriptor",
            Self::Write(_) | Self::BatchTooLarge { .. } => "write",
            Self::Resource(_) => "resource",
            Self::Network(_) => "network",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
            Self::Join(_) => "async",
        }
    }
}
