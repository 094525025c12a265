//! Backend metric descriptors and the per-identity descriptor cache.
//!
//! A descriptor is created on the backend the first time a metric is
//! exported. Its value kind is taken from that first snapshot and never
//! changes afterwards.

use crate::core::{ExportError, MetricIdentity, MetricMetadata, MonitoredScope, Result};
use crate::export::remote::DescriptorService;
use crate::metrics::{Snapshot, SnapshotShape};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Backend value encoding of a metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum ValueKind {
    #[serde(rename = "INT64")]
    Int64,
    #[serde(rename = "DOUBLE")]
    Double,
    #[serde(rename = "DISTRIBUTION")]
    Distribution,
    #[default]
    #[serde(rename = "VALUE_TYPE_UNSPECIFIED")]
    Unspecified,
}

impl ValueKind {
    pub fn from_shape(shape: SnapshotShape) -> Self {
        match shape {
            SnapshotShape::IntGauge | SnapshotShape::Counter => ValueKind::Int64,
            SnapshotShape::FloatGauge => ValueKind::Double,
            SnapshotShape::Distribution => ValueKind::Distribution,
        }
    }
}

/// Whether points report an instant or a running total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MetricKind {
    Gauge,
    Cumulative,
}

impl MetricKind {
    pub fn from_shape(shape: SnapshotShape) -> Self {
        if shape.is_cumulative() {
            MetricKind::Cumulative
        } else {
            MetricKind::Gauge
        }
    }
}

/// Label carried by every series of a metric
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelDescriptor {
    pub key: String,
    pub value_type: String,
}

/// Backend metadata describing one metric
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricDescriptor {
    #[serde(skip)]
    pub identity: MetricIdentity,
    #[serde(rename = "type")]
    pub metric_type: String,
    pub display_name: String,
    pub description: String,
    pub unit: String,
    pub metric_kind: MetricKind,
    pub value_type: ValueKind,
    pub labels: Vec<LabelDescriptor>,
}

impl MetricDescriptor {
    /// Build the draft sent on first creation
    pub fn draft(
        identity: &MetricIdentity,
        metric_prefix: &str,
        metadata: &MetricMetadata,
        snapshot: &Snapshot,
    ) -> Self {
        let shape = snapshot.shape();
        Self {
            identity: identity.clone(),
            metric_type: metric_type(metric_prefix, identity.name()),
            display_name: metadata.display_name.clone(),
            description: metadata.description.clone(),
            unit: metadata.unit.clone(),
            metric_kind: MetricKind::from_shape(shape),
            value_type: ValueKind::from_shape(shape),
            labels: identity
                .tags()
                .keys()
                .map(|key| LabelDescriptor {
                    key: key.clone(),
                    value_type: "STRING".to_string(),
                })
                .collect(),
        }
    }
}

/// Backend metric type for a metric name
pub fn metric_type(prefix: &str, name: &str) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), name)
}

/// Lazily creates and remembers one descriptor per metric identity.
///
/// Each identity owns a `OnceCell`: concurrent callers wait on the same
/// initialization, a successful creation is never repeated, and a failed one
/// leaves the cell empty so the next cycle tries again.
pub struct DescriptorCache {
    service: Arc<dyn DescriptorService>,
    scope: MonitoredScope,
    metric_prefix: String,
    entries: DashMap<MetricIdentity, Arc<OnceCell<Arc<MetricDescriptor>>>>,
}

impl DescriptorCache {
    pub fn new(
        service: Arc<dyn DescriptorService>,
        scope: MonitoredScope,
        metric_prefix: impl Into<String>,
    ) -> Self {
        Self {
            service,
            scope,
            metric_prefix: metric_prefix.into(),
            entries: DashMap::new(),
        }
    }

    /// Return the descriptor for `identity`, creating it on the backend on
    /// first use.
    pub async fn descriptor_for(
        &self,
        identity: &MetricIdentity,
        metadata: &MetricMetadata,
        snapshot: &Snapshot,
    ) -> Result<Arc<MetricDescriptor>> {
        let cell = Arc::clone(self.entries.entry(identity.clone()).or_default().value());

        let descriptor = cell
            .get_or_try_init(|| async {
                let draft = MetricDescriptor::draft(identity, &self.metric_prefix, metadata, snapshot);
                tracing::debug!(
                    metric = %identity,
                    metric_type = %draft.metric_type,
                    value_type = ?draft.value_type,
                    "Creating metric descriptor"
                );

                let mut created = self
                    .service
                    .create_or_get(&self.scope, draft)
                    .await
                    .map_err(|e| ExportError::descriptor(identity.to_string(), e.to_string()))?;
                created.identity = identity.clone();

                tracing::info!(
                    metric = %identity,
                    metric_type = %created.metric_type,
                    "Metric descriptor ready"
                );
                Ok::<_, ExportError>(Arc::new(created))
            })
            .await?;

        Ok(Arc::clone(descriptor))
    }

    /// Cached descriptor, if creation already succeeded
    pub fn get(&self, identity: &MetricIdentity) -> Option<Arc<MetricDescriptor>> {
        self.entries
            .get(identity)
            .and_then(|cell| cell.get().map(Arc::clone))
    }

    /// Number of identities with a created descriptor
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.value().initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
