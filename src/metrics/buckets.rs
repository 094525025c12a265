//! Histogram bucket layouts and sample-to-bucket mapping.
//!
//! Every layout produces `finite + 2` buckets: an underflow bucket for
//! samples below the first boundary, the finite buckets, and an overflow
//! bucket for samples at or above the last boundary. A sample equal to a
//! boundary always lands in the bucket above it.

use crate::core::{ExportError, Result};
use serde::{Deserialize, Serialize};

/// Upper limit on finite buckets in any layout
pub const MAX_FINITE_BUCKETS: usize = 1000;

/// Bucket boundary description for a distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketLayout {
    /// Strictly ascending boundaries; N bounds give N + 1 buckets
    Explicit { bounds: Vec<f64> },
    /// `count` buckets of equal `width` starting at `offset`
    Linear { count: u32, offset: f64, width: f64 },
    /// `count` buckets whose boundaries grow as `scale * growth^i`
    Exponential { count: u32, scale: f64, growth: f64 },
}

impl BucketLayout {
    /// Number of finite buckets, excluding underflow and overflow
    pub fn finite_buckets(&self) -> usize {
        match self {
            BucketLayout::Explicit { bounds } => bounds.len().saturating_sub(1),
            BucketLayout::Linear { count, .. } | BucketLayout::Exponential { count, .. } => {
                *count as usize
            },
        }
    }

    /// Total length of the count vector produced for this layout
    pub fn bucket_count(&self) -> usize {
        self.finite_buckets() + 2
    }

    /// Boundary values, ascending; there is one more than `finite_buckets`
    pub fn boundaries(&self) -> Vec<f64> {
        match self {
            BucketLayout::Explicit { bounds } => bounds.clone(),
            BucketLayout::Linear {
                count,
                offset,
                width,
            } => (0..=*count).map(|i| offset + f64::from(i) * width).collect(),
            BucketLayout::Exponential {
                count,
                scale,
                growth,
            } => (0..=*count)
                .map(|i| {
                    i32::try_from(i).map_or(f64::INFINITY, |exp| scale * growth.powi(exp))
                })
                .collect(),
        }
    }

    /// Check the layout describes at least one finite, ascending bucket,
    /// no more than `MAX_FINITE_BUCKETS`, with every boundary finite
    pub fn validate(&self) -> Result<()> {
        if self.finite_buckets() > MAX_FINITE_BUCKETS {
            return Err(ExportError::layout(format!(
                "layout has {} finite buckets, at most {} allowed",
                self.finite_buckets(),
                MAX_FINITE_BUCKETS
            )));
        }

        match self {
            BucketLayout::Explicit { bounds } => {
                if bounds.is_empty() {
                    return Err(ExportError::layout("explicit layout needs at least one bound"));
                }
                if bounds.iter().any(|b| !b.is_finite()) {
                    return Err(ExportError::layout("explicit bounds must be finite"));
                }
                if bounds.windows(2).any(|w| w[0] >= w[1]) {
                    return Err(ExportError::layout(format!(
                        "explicit bounds must be strictly ascending: {:?}",
                        bounds
                    )));
                }
            },
            BucketLayout::Linear {
                count,
                offset,
                width,
            } => {
                if *count == 0 {
                    return Err(ExportError::layout("linear layout needs count > 0"));
                }
                if !offset.is_finite() || !width.is_finite() || *width <= 0.0 {
                    return Err(ExportError::layout(format!(
                        "linear layout needs a finite offset and positive width, got offset {} width {}",
                        offset, width
                    )));
                }
                let last = offset + f64::from(*count) * width;
                if !last.is_finite() {
                    return Err(ExportError::layout(format!(
                        "linear layout overflows: last boundary is {}",
                        last
                    )));
                }
            },
            BucketLayout::Exponential {
                count,
                scale,
                growth,
            } => {
                if *count == 0 {
                    return Err(ExportError::layout("exponential layout needs count > 0"));
                }
                if !scale.is_finite() || *scale <= 0.0 {
                    return Err(ExportError::layout(format!(
                        "exponential layout needs scale > 0, got {}",
                        scale
                    )));
                }
                if !growth.is_finite() || *growth <= 1.0 {
                    return Err(ExportError::layout(format!(
                        "exponential layout needs growth > 1, got {}",
                        growth
                    )));
                }
                // count is capped above, so the exponent fits in i32.
                let last = scale * growth.powi(*count as i32);
                if !last.is_finite() {
                    return Err(ExportError::layout(format!(
                        "exponential layout overflows: {} * {}^{} is not finite",
                        scale, growth, count
                    )));
                }
            },
        }
        Ok(())
    }
}

/// Count samples per bucket for `layout`.
///
/// Bucket `i` holds samples with `boundary[i - 1] <= sample < boundary[i]`,
/// treating `boundary[-1]` as -inf and `boundary[len]` as +inf.
pub fn bucket_counts(layout: &BucketLayout, samples: &[i64]) -> Vec<u64> {
    let boundaries = layout.boundaries();
    let mut counts = vec![0u64; boundaries.len() + 1];

    for &sample in samples {
        let value = sample as f64;
        // Index of the first boundary strictly greater than the sample.
        let bucket = boundaries.partition_point(|b| *b <= value);
        counts[bucket] += 1;
    }

    counts
}
