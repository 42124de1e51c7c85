//! Ingestion configuration
//!
//! Every field has a default, so a partial JSON document (or none at all) is a
//! valid configuration.

use serde::{Deserialize, Serialize};

use crate::error::IngestError;

/// Rows normalized per increment before control is yielded.
pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// Bytes requested from the file per read call.
pub const DEFAULT_READ_BUFFER_BYTES: usize = 64 * 1024;

/// Top-level configuration for one ingestion cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Number of rows per cooperative increment
    pub chunk_size: usize,
    /// File read settings
    pub reader: ReaderConfig,
    /// Header names mapped onto sample fields
    pub columns: ColumnMap,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            reader: ReaderConfig::default(),
            columns: ColumnMap::default(),
        }
    }
}

impl IngestConfig {
    /// Load configuration from JSON and validate it
    pub fn from_json(json: &str) -> Result<Self, IngestError> {
        let config: IngestConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to pretty JSON
    pub fn to_json(&self) -> Result<String, IngestError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Override the chunk size, keeping everything else
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn validate(&self) -> Result<(), IngestError> {
        if self.chunk_size == 0 {
            return Err(IngestError::InvalidConfig(
                "chunk_size must be at least 1".to_string(),
            ));
        }
        if self.reader.buffer_bytes == 0 {
            return Err(IngestError::InvalidConfig(
                "reader.buffer_bytes must be at least 1".to_string(),
            ));
        }
        self.columns.validate()
    }
}

/// File read settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    pub buffer_bytes: usize,
    /// Abort the read after this many milliseconds; `None` waits indefinitely
    pub timeout_ms: Option<u64>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            buffer_bytes: DEFAULT_READ_BUFFER_BYTES,
            timeout_ms: None,
        }
    }
}

/// Header names the normalizer looks up for each sample field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub timestamp: String,
    pub participant: String,
    pub x: String,
    pub y: String,
    pub fixation_duration: String,
    pub aoi_name: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            timestamp: "timestamp".to_string(),
            participant: "participant".to_string(),
            x: "x".to_string(),
            y: "y".to_string(),
            fixation_duration: "fixationDuration".to_string(),
            aoi_name: "aoiName".to_string(),
        }
    }
}

impl ColumnMap {
    /// Columns a row must carry to produce a sample
    pub fn required(&self) -> [&str; 2] {
        [self.x.as_str(), self.y.as_str()]
    }

    /// All mapped columns in field order
    pub fn all(&self) -> [&str; 6] {
        [
            self.timestamp.as_str(),
            self.participant.as_str(),
            self.x.as_str(),
            self.y.as_str(),
            self.fixation_duration.as_str(),
            self.aoi_name.as_str(),
        ]
    }

    fn validate(&self) -> Result<(), IngestError> {
        match self.all().iter().find(|name| name.trim().is_empty()) {
            Some(_) => Err(IngestError::InvalidConfig(
                "column names must not be empty".to_string(),
            )),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = IngestConfig::default();
        assert_eq!(config.chunk_size, 100);
        assert_eq!(config.reader.timeout_ms, None);
        assert_eq!(config.columns.fixation_duration, "fixationDuration");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config =
            IngestConfig::from_json(r#"{"chunk_size": 250, "columns": {"x": "GazeX"}}"#).unwrap();

        assert_eq!(config.chunk_size, 250);
        assert_eq!(config.columns.x, "GazeX");
        assert_eq!(config.columns.y, "y");
        assert_eq!(config.reader, ReaderConfig::default());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = IngestConfig::default().with_chunk_size(7);
        let restored = IngestConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(restored, config);
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let result = IngestConfig::from_json(r#"{"chunk_size": 0}"#);
        assert!(matches!(result, Err(IngestError::InvalidConfig(_))));
    }

    #[test]
    fn test_empty_column_rejected() {
        let result = IngestConfig::from_json(r#"{"columns": {"y": "  "}}"#);
        assert!(matches!(result, Err(IngestError::InvalidConfig(_))));
    }

    #[test]
    fn test_invalid_json() {
        let result = IngestConfig::from_json("not json");
        assert!(matches!(result, Err(IngestError::JsonError(_))));
    }
}
