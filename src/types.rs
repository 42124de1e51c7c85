//! Core types for the gaze-flux pipeline
//!
//! This module defines the data structures that leave the pipeline: normalized
//! gaze samples, the derived distance series, the AOI histogram and the
//! per-load report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One normalized gaze measurement.
///
/// `x` and `y` are always finite. Integer fields that failed to parse are
/// `None` and are passed through uncorrected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GazeSample {
    /// Recording time offset
    pub timestamp: Option<i64>,
    /// Participant identifier, may be empty
    pub participant: String,
    pub x: f64,
    pub y: f64,
    /// Duration of the associated fixation event
    pub fixation_duration: Option<i64>,
    /// Area of interest, empty when absent
    pub aoi_name: String,
}

/// Rounded gaze travel between two consecutive samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GazeDistanceSample {
    /// Timestamp of the later sample of the pair
    pub timestamp: Option<i64>,
    pub distance: i64,
}

/// A single histogram bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AoiCount {
    pub name: String,
    pub value: u64,
}

/// Occurrence count per AOI name, in first-occurrence order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AoiHistogram {
    entries: Vec<AoiCount>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl AoiHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more occurrence of `name`
    pub fn record(&mut self, name: &str) {
        match self.index.get(name) {
            Some(&slot) => self.entries[slot].value += 1,
            None => {
                self.index.insert(name.to_string(), self.entries.len());
                self.entries.push(AoiCount {
                    name: name.to_string(),
                    value: 1,
                });
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<u64> {
        self.index.get(name).map(|&slot| self.entries[slot].value)
    }

    pub fn entries(&self) -> &[AoiCount] {
        &self.entries
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Where the controller currently is in a load cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadPhase {
    Idle,
    Reading,
    Transforming,
    Complete,
    /// The read failed; outputs stay empty until the next load
    Failed,
}

/// Outcome of one completed load cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub load_id: String,
    pub generation: u64,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    /// Data rows seen after the header, including a trailing empty line
    pub rows_total: usize,
    pub rows_accepted: usize,
    /// Rows dropped for a non-finite coordinate
    pub rows_rejected: usize,
    /// Length of the distance series
    pub distances: usize,
}
