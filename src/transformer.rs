//! Chunked transformation
//!
//! Normalizes decoded records a fixed number of rows at a time. Each increment
//! is a synchronous [`ChunkedTransformer::step`] against an explicit
//! [`SampleAccumulator`]; [`ChunkedTransformer::run`] drives the steps and
//! yields to the scheduler between them so no single poll blocks the host
//! thread for longer than one increment.

use crate::config::DEFAULT_CHUNK_SIZE;
use crate::normalizer::SampleNormalizer;
use crate::progress::percent;
use crate::schema::RawRecord;
use crate::types::GazeSample;

/// Growing result of one transformation.
///
/// Samples are append-only and stay in source-row order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleAccumulator {
    samples: Vec<GazeSample>,
    rows_consumed: usize,
    rows_rejected: usize,
}

impl SampleAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn samples(&self) -> &[GazeSample] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<GazeSample> {
        self.samples
    }

    pub fn rows_consumed(&self) -> usize {
        self.rows_consumed
    }

    pub fn rows_accepted(&self) -> usize {
        self.samples.len()
    }

    pub fn rows_rejected(&self) -> usize {
        self.rows_rejected
    }
}

/// What one increment did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepReport {
    /// Rows taken from the input by this increment
    pub consumed: usize,
    pub accepted: usize,
    pub rejected: usize,
    /// Overall transform progress after this increment, 0-100
    pub progress: u8,
    /// No rows remain
    pub complete: bool,
}

/// Drives the normalizer over a record set in bounded increments
#[derive(Debug, Clone)]
pub struct ChunkedTransformer {
    chunk_size: usize,
    normalizer: SampleNormalizer,
}

impl Default for ChunkedTransformer {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl ChunkedTransformer {
    /// Create a transformer with default columns. A chunk size of 0 is treated as 1.
    pub fn new(chunk_size: usize) -> Self {
        Self::with_normalizer(chunk_size, SampleNormalizer::default())
    }

    pub fn with_normalizer(chunk_size: usize, normalizer: SampleNormalizer) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            normalizer,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Process the next increment of `records` into `accumulator`.
    ///
    /// `accumulator` must only ever be stepped against the same `records`.
    pub fn step(&self, records: &[RawRecord], accumulator: &mut SampleAccumulator) -> StepReport {
        let start = accumulator.rows_consumed.min(records.len());
        let end = (start + self.chunk_size).min(records.len());
        let accepted_before = accumulator.samples.len();

        accumulator.samples.extend(
            records[start..end]
                .iter()
                .filter_map(|record| self.normalizer.normalize(record)),
        );

        let consumed = end - start;
        let accepted = accumulator.samples.len() - accepted_before;
        let rejected = consumed - accepted;

        accumulator.rows_consumed = end;
        accumulator.rows_rejected += rejected;

        let report = StepReport {
            consumed,
            accepted,
            rejected,
            progress: percent(end as u64, records.len() as u64),
            complete: end == records.len(),
        };

        log::trace!(
            "increment rows {}..{} of {}: {} accepted, {} rejected",
            start,
            end,
            records.len(),
            accepted,
            rejected
        );

        report
    }

    /// Transform all `records`, reporting progress after every increment.
    ///
    /// Yields once between increments and never after the last one.
    pub async fn run<F>(&self, records: &[RawRecord], mut on_progress: F) -> SampleAccumulator
    where
        F: FnMut(u8),
    {
        let mut accumulator = SampleAccumulator::new();

        loop {
            let report = self.step(records, &mut accumulator);
            on_progress(report.progress);

            if report.complete {
                break;
            }

            tokio::task::yield_now().await;
        }

        log::debug!(
            "transformed {} rows: {} samples, {} rejected",
            records.len(),
            accumulator.rows_accepted(),
            accumulator.rows_rejected()
        );

        accumulator
    }
}
