//! Derived metrics
//!
//! This module derives secondary series from an accepted sample sequence:
//! - Gaze distance between consecutive samples
//! - AOI occupancy histogram
//!
//! Both are recomputed from scratch on every call.

use serde::Serialize;

use crate::types::{AoiHistogram, GazeDistanceSample, GazeSample};

/// Everything derived from one sample sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedMetrics {
    pub distances: Vec<GazeDistanceSample>,
    pub aoi_histogram: AoiHistogram,
}

/// Engine for computing derived metrics
pub struct DerivedMetricsEngine;

impl DerivedMetricsEngine {
    /// Derive all metrics from `samples`
    pub fn derive(samples: &[GazeSample]) -> DerivedMetrics {
        DerivedMetrics {
            distances: Self::compute_distances(samples),
            aoi_histogram: Self::compute_aoi_histogram(samples),
        }
    }

    /// Rounded Euclidean distance between each consecutive pair of samples.
    ///
    /// The result has one entry fewer than `samples` and is empty for fewer
    /// than two samples.
    pub fn compute_distances(samples: &[GazeSample]) -> Vec<GazeDistanceSample> {
        samples
            .windows(2)
            .map(|pair| GazeDistanceSample {
                timestamp: pair[1].timestamp,
                distance: gaze_distance(&pair[0], &pair[1]),
            })
            .collect()
    }

    /// Occurrence count per AOI name, keyed in first-occurrence order
    pub fn compute_aoi_histogram(samples: &[GazeSample]) -> AoiHistogram {
        let mut histogram = AoiHistogram::new();
        for sample in samples {
            histogram.record(&sample.aoi_name);
        }
        histogram
    }
}

/// Halves round away from zero, which equals rounding up for distances.
fn gaze_distance(from: &GazeSample, to: &GazeSample) -> i64 {
    (to.x - from.x).hypot(to.y - from.y).round() as i64
}
