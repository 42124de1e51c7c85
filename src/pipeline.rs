//! Pipeline orchestration
//!
//! This module provides the stateless public API for gaze-flux. Ingestion and
//! metric derivation are separate calls: [`ingest`] returns the accepted
//! samples, [`derive_metrics`] turns them into distances and the AOI histogram.

use std::path::Path;

use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::metrics::{DerivedMetrics, DerivedMetricsEngine};
use crate::normalizer::SampleNormalizer;
use crate::reader::read_text;
use crate::schema::RecordDecoder;
use crate::transformer::ChunkedTransformer;
use crate::types::GazeSample;

/// Result of ingesting one file's text.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestOutcome {
    /// Trimmed header names
    pub headers: Vec<String>,
    /// Accepted samples in source-row order
    pub samples: Vec<GazeSample>,
    pub rows_total: usize,
    pub rows_rejected: usize,
}

impl IngestOutcome {
    pub fn rows_accepted(&self) -> usize {
        self.samples.len()
    }

    /// Columns from `columns` the header does not carry
    pub fn missing_columns<'a>(&self, columns: &[&'a str]) -> Vec<&'a str> {
        columns
            .iter()
            .copied()
            .filter(|column| !self.headers.iter().any(|header| header == column))
            .collect()
    }
}

/// Decode `text` and transform it in increments, reporting progress after
/// each one.
///
/// # Arguments
/// * `text` - Full decoded file text, header line first
/// * `config` - Chunk size and column mapping
/// * `on_progress` - Receives transform progress (0-100) after every increment
///
/// # Example
/// ```ignore
/// let outcome = ingest(&text, &IngestConfig::default(), |p| println!("{p}%")).await?;
/// let metrics = derive_metrics(&outcome.samples);
/// ```
pub async fn ingest<F>(
    text: &str,
    config: &IngestConfig,
    on_progress: F,
) -> Result<IngestOutcome, IngestError>
where
    F: FnMut(u8),
{
    config.validate()?;

    // Stage 1: Split into header and field-keyed records
    let decoded = RecordDecoder::decode(text);

    // Stage 2: Normalize in yielding increments
    let transformer = ChunkedTransformer::with_normalizer(
        config.chunk_size,
        SampleNormalizer::new(config.columns.clone()),
    );
    let accumulator = transformer.run(&decoded.records, on_progress).await;

    Ok(IngestOutcome {
        headers: decoded.headers,
        rows_total: decoded.records.len(),
        rows_rejected: accumulator.rows_rejected(),
        samples: accumulator.into_samples(),
    })
}

/// Read a file from disk, then [`ingest`] it.
///
/// Read progress and transform progress are reported separately.
pub async fn ingest_file<P, R, T>(
    path: P,
    config: &IngestConfig,
    on_read_progress: R,
    on_transform_progress: T,
) -> Result<IngestOutcome, IngestError>
where
    P: AsRef<Path>,
    R: FnMut(u8),
    T: FnMut(u8),
{
    config.validate()?;
    let text = read_text(path, &config.reader, on_read_progress).await?;
    ingest(&text, config, on_transform_progress).await
}

/// Derive the distance series and AOI histogram from accepted samples.
pub fn derive_metrics(samples: &[GazeSample]) -> DerivedMetrics {
    DerivedMetricsEngine::derive(samples)
}

/// Convert CSV text to samples in one synchronous pass with default columns.
///
/// Blocks for the whole input; use [`ingest`] when the caller must stay
/// responsive.
pub fn samples_from_csv(text: &str) -> Vec<GazeSample> {
    let decoded = RecordDecoder::decode(text);
    let normalizer = SampleNormalizer::default();

    decoded
        .records
        .iter()
        .filter_map(|record| normalizer.normalize(record))
        .collect()
}
