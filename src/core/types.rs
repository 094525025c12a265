use crate::core::config::Config;
use crate::core::error::{ExportError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Name plus tag set identifying one metric.
///
/// Tags live in a `BTreeMap`, so two identities built with the same tags in
/// a different insertion order compare and hash equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MetricIdentity {
    name: String,
    tags: BTreeMap<String, String>,
}

impl MetricIdentity {
    /// Creates a new untagged identity after validation
    pub fn new<S: Into<String>>(name: S) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(ExportError::config("Metric name cannot be empty"));
        }
        if name.len() > 255 {
            return Err(ExportError::config(format!(
                "Metric name cannot exceed 255 characters, got {}",
                name.len()
            )));
        }
        Ok(MetricIdentity {
            name,
            tags: BTreeMap::new(),
        })
    }

    /// Creates an identity with the given tags
    pub fn with_tags<S, I, K, V>(name: S, tags: I) -> Result<Self>
    where
        S: Into<String>,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut identity = Self::new(name)?;
        identity.tags = tags
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Ok(identity)
    }

    /// Returns a copy of this identity with one more tag
    pub fn tagged<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }
}

impl fmt::Display for MetricIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.tags.is_empty() {
            let tags: Vec<String> = self.tags.iter().map(|(k, v)| format!("{k}={v}")).collect();
            write!(f, "{{{}}}", tags.join(","))?;
        }
        Ok(())
    }
}

/// Closed time range `[start, end]` attached to every exported point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeInterval {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl TimeInterval {
    pub fn new(start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self {
            start_time,
            end_time,
        }
    }

    /// Zero-width interval used by instantaneous values
    pub fn instant(at: DateTime<Utc>) -> Self {
        Self::new(at, at)
    }

    pub fn is_instant(&self) -> bool {
        self.start_time == self.end_time
    }
}

/// Monitored entity attached to every exported point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceIdentity {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub labels: BTreeMap<String, String>,
}

impl ResourceIdentity {
    /// Resolve the monitored resource once at startup.
    ///
    /// Fails when no project is configured; the exporter must not start
    /// without one.
    pub fn resolve(config: &Config) -> Result<(MonitoredScope, ResourceIdentity)> {
        let project_id = config.exporter.project_id.trim();
        if project_id.is_empty() {
            return Err(ExportError::resource(
                "exporter.project_id is not set; cannot determine monitored project",
            ));
        }
        if config.resource.resource_type.trim().is_empty() {
            return Err(ExportError::resource("resource.type cannot be empty"));
        }

        let mut labels = config.resource.labels.clone();
        labels
            .entry("project_id".to_string())
            .or_insert_with(|| project_id.to_string());

        Ok((
            MonitoredScope {
                project_id: project_id.to_string(),
            },
            ResourceIdentity {
                resource_type: config.resource.resource_type.clone(),
                labels,
            },
        ))
    }
}

/// Project that owns descriptors and series on the backend
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MonitoredScope {
    pub project_id: String,
}

impl MonitoredScope {
    pub fn new<S: Into<String>>(project_id: S) -> Self {
        Self {
            project_id: project_id.into(),
        }
    }

    /// Resource name as used by the backend API
    pub fn name(&self) -> String {
        format!("projects/{}", self.project_id)
    }
}

impl fmt::Display for MonitoredScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "projects/{}", self.project_id)
    }
}
