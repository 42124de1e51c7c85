//! gaze-flux - Incremental ingestion engine for eye-gaze recordings
//!
//! gaze-flux turns a comma-delimited gaze export into plottable samples through
//! a deterministic pipeline: record decoding → sample normalization → chunked
//! transformation → derived metrics (gaze distance, AOI occupancy).
//!
//! ## Entry points
//!
//! - **Stateless**: [`ingest`] then [`derive_metrics`], as two explicit phases
//! - **Stateful**: [`IngestionController`] owns the current file's results and
//!   publishes read and transform progress while loading

pub mod config;
pub mod controller;
pub mod error;
pub mod metrics;
pub mod normalizer;
pub mod pipeline;
pub mod progress;
pub mod reader;
pub mod schema;
pub mod transformer;
pub mod types;

pub use config::{ColumnMap, IngestConfig, ReaderConfig};
pub use controller::IngestionController;
pub use error::IngestError;
pub use metrics::{DerivedMetrics, DerivedMetricsEngine};
pub use pipeline::{derive_metrics, ingest, ingest_file, samples_from_csv, IngestOutcome};
pub use types::{AoiHistogram, GazeDistanceSample, GazeSample, IngestReport, LoadPhase};

// Schema exports
pub use schema::{RawRecord, RecordDecoder};

/// gaze-flux version
pub const GAZE_FLUX_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by the CLI
pub const PRODUCER_NAME: &str = "gaze-flux";
