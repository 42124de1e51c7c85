//! Error types for gaze-flux

use thiserror::Error;

/// Errors that can occur while loading a gaze recording.
///
/// Row-level anomalies (short rows, unparseable numbers) are never errors;
/// they degrade to omission or pass-through inside the pipeline.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("File read timed out after {0} ms")]
    ReadTimeout(u64),

    #[error("Load superseded by a newer load (generation {0})")]
    Superseded(u64),
}
