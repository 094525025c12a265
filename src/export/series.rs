//! Wire-ready time series and the builder that produces them.

use crate::core::{MetricIdentity, ResourceIdentity, TimeInterval};
use crate::export::descriptor::{MetricDescriptor, MetricKind, ValueKind};
use crate::metrics::registry::GaugeValue;
use crate::metrics::{bucket_counts, BucketLayout, Snapshot, SummaryStats};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Metric type plus label values of one series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesMetric {
    #[serde(rename = "type")]
    pub metric_type: String,
    pub labels: BTreeMap<String, String>,
}

/// Bucket options as understood by the backend
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BucketOptions {
    ExplicitBuckets {
        bounds: Vec<f64>,
    },
    #[serde(rename_all = "camelCase")]
    LinearBuckets {
        num_finite_buckets: u32,
        width: f64,
        offset: f64,
    },
    #[serde(rename_all = "camelCase")]
    ExponentialBuckets {
        num_finite_buckets: u32,
        growth_factor: f64,
        scale: f64,
    },
}

impl From<&BucketLayout> for BucketOptions {
    fn from(layout: &BucketLayout) -> Self {
        match layout {
            BucketLayout::Explicit { bounds } => BucketOptions::ExplicitBuckets {
                bounds: bounds.clone(),
            },
            BucketLayout::Linear {
                count,
                offset,
                width,
            } => BucketOptions::LinearBuckets {
                num_finite_buckets: *count,
                width: *width,
                offset: *offset,
            },
            BucketLayout::Exponential {
                count,
                scale,
                growth,
            } => BucketOptions::ExponentialBuckets {
                num_finite_buckets: *count,
                growth_factor: *growth,
                scale: *scale,
            },
        }
    }
}

/// Observed range of a distribution
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

/// Histogram-encoded value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Distribution {
    pub count: u64,
    pub mean: f64,
    pub sum_of_squared_deviation: f64,
    pub range: Range,
    pub bucket_options: BucketOptions,
    pub bucket_counts: Vec<u64>,
}

impl Distribution {
    pub fn new(layout: &BucketLayout, samples: &[i64], stats: &SummaryStats) -> Self {
        Self {
            count: stats.count,
            mean: stats.mean,
            sum_of_squared_deviation: stats.sum_of_squared_deviation,
            range: Range {
                min: stats.min,
                max: stats.max,
            },
            bucket_options: BucketOptions::from(layout),
            bucket_counts: bucket_counts(layout, samples),
        }
    }
}

/// One encoded value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TypedValue {
    Int64Value(i64),
    DoubleValue(f64),
    DistributionValue(Distribution),
}

impl TypedValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            TypedValue::Int64Value(_) => ValueKind::Int64,
            TypedValue::DoubleValue(_) => ValueKind::Double,
            TypedValue::DistributionValue(_) => ValueKind::Distribution,
        }
    }
}

/// Timestamped value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    pub interval: TimeInterval,
    pub value: TypedValue,
}

/// One series as sent in a write request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeries {
    pub metric: SeriesMetric,
    pub resource: ResourceIdentity,
    pub metric_kind: MetricKind,
    pub value_type: ValueKind,
    pub points: Vec<Point>,
}

impl TimeSeries {
    /// Assemble a series.
    ///
    /// # Panics
    ///
    /// Panics unless `points` holds exactly one point; the backend rejects
    /// anything else and no code path is expected to produce it.
    pub fn with_points(
        metric: SeriesMetric,
        resource: ResourceIdentity,
        metric_kind: MetricKind,
        points: Vec<Point>,
    ) -> Self {
        assert!(
            points.len() == 1,
            "time series {} must carry exactly one point, got {}",
            metric.metric_type,
            points.len()
        );
        let value_type = points[0].value.kind();
        Self {
            metric,
            resource,
            metric_kind,
            value_type,
            points,
        }
    }

    pub fn point(&self) -> &Point {
        &self.points[0]
    }
}

/// Everything a cycle knows when building its series
#[derive(Debug, Clone)]
pub struct SeriesContext {
    pub resource: ResourceIdentity,
    /// Anchor for cumulative intervals
    pub process_start: DateTime<Utc>,
    /// Export window of this cycle
    pub interval: TimeInterval,
    pub snapshots: HashMap<MetricIdentity, Snapshot>,
}

impl SeriesContext {
    /// Interval for a point of `kind` in this cycle
    pub fn interval_for(&self, kind: MetricKind) -> TimeInterval {
        match kind {
            MetricKind::Cumulative => TimeInterval::new(self.process_start, self.interval.end_time),
            MetricKind::Gauge => TimeInterval::instant(self.interval.end_time),
        }
    }
}

fn encode(snapshot: &Snapshot, layout: &BucketLayout) -> TypedValue {
    match snapshot {
        Snapshot::Gauge {
            value: GaugeValue::Int(v),
        } => TypedValue::Int64Value(*v),
        Snapshot::Gauge {
            value: GaugeValue::Float(v),
        } => TypedValue::DoubleValue(*v),
        Snapshot::Counter { count } => TypedValue::Int64Value(*count),
        Snapshot::Distribution { samples, stats } => {
            TypedValue::DistributionValue(Distribution::new(layout, samples, stats))
        },
    }
}

/// Build the series for `identity` from this cycle's snapshot.
///
/// Returns `None` when the identity has no snapshot this cycle. The value is
/// encoded from the snapshot as observed; when its shape no longer matches
/// the descriptor's value kind the point is still emitted, its `value_type`
/// shows the drift, and a warning is logged.
pub fn build(
    ctx: &SeriesContext,
    identity: &MetricIdentity,
    descriptor: &MetricDescriptor,
    layout: &BucketLayout,
) -> Option<TimeSeries> {
    let snapshot = ctx.snapshots.get(identity)?;
    let value = encode(snapshot, layout);

    if descriptor.value_type != ValueKind::Unspecified && value.kind() != descriptor.value_type {
        tracing::warn!(
            metric = %identity,
            descriptor_kind = ?descriptor.value_type,
            observed_kind = ?value.kind(),
            "Snapshot shape differs from the registered descriptor"
        );
    }

    let point = Point {
        interval: ctx.interval_for(descriptor.metric_kind),
        value,
    };

    Some(TimeSeries::with_points(
        SeriesMetric {
            metric_type: descriptor.metric_type.clone(),
            labels: identity.tags().clone(),
        },
        ctx.resource.clone(),
        descriptor.metric_kind,
        vec![point],
    ))
}
