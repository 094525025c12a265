//! Point-in-time snapshots of registered metrics.
//!
//! `classify` turns a live instrument into an immutable value tagged with
//! its shape. Each instrument is read exactly once; nothing is retained
//! between cycles.

use crate::core::Result;
use crate::metrics::registry::{GaugeValue, Metric};

/// Shape of a snapshot, used to pick the backend value encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotShape {
    IntGauge,
    FloatGauge,
    Counter,
    Distribution,
}

impl SnapshotShape {
    /// Cumulative shapes report totals since process start
    pub fn is_cumulative(self) -> bool {
        matches!(self, SnapshotShape::Counter | SnapshotShape::Distribution)
    }
}

/// Summary statistics of a distribution snapshot
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SummaryStats {
    pub count: u64,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub sum_of_squared_deviation: f64,
}

impl SummaryStats {
    pub fn from_samples(samples: &[i64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        let count = samples.len() as u64;
        let mut sum = 0.0;
        let mut min = f64::MAX;
        let mut max = f64::MIN;
        for &sample in samples {
            let value = sample as f64;
            sum += value;
            min = min.min(value);
            max = max.max(value);
        }
        let mean = sum / count as f64;
        let sum_of_squared_deviation = samples
            .iter()
            .map(|&s| {
                let d = s as f64 - mean;
                d * d
            })
            .sum();

        Self {
            count,
            sum,
            min,
            max,
            mean,
            sum_of_squared_deviation,
        }
    }
}

/// Immutable value of one metric taken during a cycle
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    Gauge { value: GaugeValue },
    Counter { count: i64 },
    Distribution { samples: Vec<i64>, stats: SummaryStats },
}

impl Snapshot {
    pub fn shape(&self) -> SnapshotShape {
        match self {
            Snapshot::Gauge {
                value: GaugeValue::Int(_),
            } => SnapshotShape::IntGauge,
            Snapshot::Gauge {
                value: GaugeValue::Float(_),
            } => SnapshotShape::FloatGauge,
            Snapshot::Counter { .. } => SnapshotShape::Counter,
            Snapshot::Distribution { .. } => SnapshotShape::Distribution,
        }
    }
}

/// Take a snapshot of `metric`.
///
/// Returns `Ok(None)` for instrument kinds that have no backend encoding.
/// Read failures are returned to the caller, which decides whether to skip
/// the metric.
pub fn classify(metric: &Metric) -> Result<Option<Snapshot>> {
    let snapshot = match metric {
        Metric::Gauge(gauge) => Snapshot::Gauge {
            value: gauge.read()?,
        },
        Metric::Counter(counter) => Snapshot::Counter {
            count: counter.count(),
        },
        Metric::ConcurrentGauge(gauge) => Snapshot::Gauge {
            value: GaugeValue::Int(gauge.value()),
        },
        Metric::Histogram(histogram) => {
            let samples = histogram.samples();
            let stats = SummaryStats::from_samples(&samples);
            Snapshot::Distribution { samples, stats }
        },
        Metric::Unsupported { .. } => return Ok(None),
    };
    Ok(Some(snapshot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ExportError;
    use crate::metrics::registry::{ConcurrentGauge, Counter, Gauge, Histogram};
    use std::sync::Arc;

    #[test]
    fn test_classify_gauge_by_runtime_shape() {
        let gauge = Arc::new(Gauge::new(7i64));
        let metric = Metric::Gauge(Arc::clone(&gauge));

        let snapshot = classify(&metric).unwrap().unwrap();
        assert_eq!(snapshot.shape(), SnapshotShape::IntGauge);

        gauge.set(0.5);
        let snapshot = classify(&metric).unwrap().unwrap();
        assert_eq!(snapshot, Snapshot::Gauge { value: GaugeValue::Float(0.5) });
    }

    #[test]
    fn test_classify_counter() {
        let counter = Arc::new(Counter::new());
        counter.add(41);
        counter.inc();

        let snapshot = classify(&Metric::Counter(counter)).unwrap().unwrap();
        assert_eq!(snapshot, Snapshot::Counter { count: 42 });
        assert!(snapshot.shape().is_cumulative());
    }

    #[test]
    fn test_classify_concurrent_gauge_as_int_gauge() {
        let gauge = Arc::new(ConcurrentGauge::new());
        gauge.inc();
        gauge.inc();

        let snapshot = classify(&Metric::ConcurrentGauge(gauge)).unwrap().unwrap();
        assert_eq!(snapshot, Snapshot::Gauge { value: GaugeValue::Int(2) });
        assert!(!snapshot.shape().is_cumulative());
    }

    #[test]
    fn test_distribution_snapshot_is_decoupled() {
        let histogram = Arc::new(Histogram::new());
        histogram.record(2);
        histogram.record(4);

        let snapshot = classify(&Metric::Histogram(Arc::clone(&histogram)))
            .unwrap()
            .unwrap();
        histogram.record(1000);

        match snapshot {
            Snapshot::Distribution { samples, stats } => {
                assert_eq!(samples, vec![2, 4]);
                assert_eq!(stats.count, 2);
                assert_eq!(stats.mean, 3.0);
                assert_eq!(stats.sum_of_squared_deviation, 2.0);
                assert_eq!(stats.min, 2.0);
                assert_eq!(stats.max, 4.0);
            },
            other => panic!("Expected distribution, got {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_kind_is_skipped() {
        let metric = Metric::Unsupported {
            kind: "meter".to_string(),
        };
        assert!(classify(&metric).unwrap().is_none());
    }

    #[test]
    fn test_read_error_propagates() {
        let gauge = Gauge::from_fn(|| Err(ExportError::metric_read("pool", "closed")));
        assert!(classify(&Metric::Gauge(Arc::new(gauge))).is_err());
    }

    #[test]
    fn test_empty_summary_stats() {
        let stats = SummaryStats::from_samples(&[]);
        assert_eq!(stats, SummaryStats::default());
    }
}
