//! Load-cycle orchestration
//!
//! [`IngestionController`] owns the sample sequence and distance series for the
//! most recently selected file and exposes read and transform progress as
//! watch channels.
//!
//! Every load bumps a generation counter. Increments run under the state lock
//! and check the generation first, so an abandoned load stops at its next
//! increment instead of writing into a newer file's results.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard};
use tokio::sync::watch;
use uuid::Uuid;

use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::metrics::DerivedMetricsEngine;
use crate::normalizer::SampleNormalizer;
use crate::reader::read_text;
use crate::schema::RecordDecoder;
use crate::transformer::{ChunkedTransformer, SampleAccumulator};
use crate::types::{AoiHistogram, GazeDistanceSample, GazeSample, IngestReport, LoadPhase};

struct LoadState {
    generation: u64,
    phase: LoadPhase,
    accumulator: SampleAccumulator,
    distances: Vec<GazeDistanceSample>,
}

/// Identity of one load cycle
struct LoadCycle {
    generation: u64,
    load_id: String,
    started_at: DateTime<Utc>,
}

/// Cloneable handle to the state of the current load.
#[derive(Clone)]
pub struct IngestionController {
    config: IngestConfig,
    state: Arc<Mutex<LoadState>>,
    read_progress: Arc<watch::Sender<u8>>,
    transform_progress: Arc<watch::Sender<u8>>,
}

impl Default for IngestionController {
    fn default() -> Self {
        Self::with_config(IngestConfig::default())
    }
}

impl IngestionController {
    /// Create a controller, rejecting an invalid configuration
    pub fn new(config: IngestConfig) -> Result<Self, IngestError> {
        config.validate()?;
        Ok(Self::with_config(config))
    }

    fn with_config(config: IngestConfig) -> Self {
        let (read_progress, _) = watch::channel(0);
        let (transform_progress, _) = watch::channel(0);

        Self {
            config,
            state: Arc::new(Mutex::new(LoadState {
                generation: 0,
                phase: LoadPhase::Idle,
                accumulator: SampleAccumulator::new(),
                distances: Vec::new(),
            })),
            read_progress: Arc::new(read_progress),
            transform_progress: Arc::new(transform_progress),
        }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Load a file from disk, replacing whatever was loaded before.
    pub async fn load_file(&self, path: impl AsRef<Path>) -> Result<IngestReport, IngestError> {
        let cycle = self.begin_load(LoadPhase::Reading);
        log::info!(
            "load {} started for {} (generation {})",
            cycle.load_id,
            path.as_ref().display(),
            cycle.generation
        );

        let read = read_text(path, &self.config.reader, |progress| {
            self.publish(cycle.generation, &self.read_progress, progress)
        })
        .await;

        match read {
            Ok(text) => self.transform(cycle, &text).await,
            Err(err) => {
                self.fail(cycle.generation);
                log::error!("load {} failed while reading: {}", cycle.load_id, err);
                Err(err)
            }
        }
    }

    /// Load already-decoded text, replacing whatever was loaded before.
    ///
    /// Read progress jumps straight to 100.
    pub async fn load_text(&self, text: &str) -> Result<IngestReport, IngestError> {
        let cycle = self.begin_load(LoadPhase::Reading);
        log::info!(
            "load {} started from text (generation {})",
            cycle.load_id,
            cycle.generation
        );

        self.publish(cycle.generation, &self.read_progress, 100);
        self.transform(cycle, text).await
    }

    /// Reset all outputs and progress, and claim a new generation
    fn begin_load(&self, phase: LoadPhase) -> LoadCycle {
        let mut state = self.state.lock();
        state.generation += 1;
        state.phase = phase;
        state.accumulator = SampleAccumulator::new();
        state.distances = Vec::new();

        self.read_progress.send_replace(0);
        self.transform_progress.send_replace(0);

        LoadCycle {
            generation: state.generation,
            load_id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
        }
    }

    async fn transform(&self, cycle: LoadCycle, text: &str) -> Result<IngestReport, IngestError> {
        let decoded = RecordDecoder::decode(text);
        let records = decoded.records;
        let transformer = ChunkedTransformer::with_normalizer(
            self.config.chunk_size,
            SampleNormalizer::new(self.config.columns.clone()),
        );

        self.lock_current(cycle.generation)?.phase = LoadPhase::Transforming;

        loop {
            let report = {
                let mut state = self.lock_current(cycle.generation)?;
                let report = transformer.step(&records, &mut state.accumulator);
                self.transform_progress.send_replace(report.progress);
                report
            };

            if report.complete {
                break;
            }

            tokio::task::yield_now().await;
        }

        let mut state = self.lock_current(cycle.generation)?;
        let distances = DerivedMetricsEngine::compute_distances(state.accumulator.samples());
        state.distances = distances;
        state.phase = LoadPhase::Complete;

        let report = IngestReport {
            load_id: cycle.load_id,
            generation: cycle.generation,
            started_at: cycle.started_at,
            completed_at: Utc::now(),
            rows_total: records.len(),
            rows_accepted: state.accumulator.rows_accepted(),
            rows_rejected: state.accumulator.rows_rejected(),
            distances: state.distances.len(),
        };

        log::info!(
            "load {} complete: {} rows, {} samples, {} rejected",
            report.load_id,
            report.rows_total,
            report.rows_accepted,
            report.rows_rejected
        );

        Ok(report)
    }

    fn lock_current(&self, generation: u64) -> Result<MutexGuard<'_, LoadState>, IngestError> {
        let state = self.state.lock();
        if state.generation != generation {
            log::warn!(
                "abandoning load generation {} in favour of {}",
                generation,
                state.generation
            );
            return Err(IngestError::Superseded(state.generation));
        }
        Ok(state)
    }

    fn publish(&self, generation: u64, stream: &watch::Sender<u8>, progress: u8) {
        let state = self.state.lock();
        if state.generation == generation {
            stream.send_replace(progress);
        }
    }

    fn fail(&self, generation: u64) {
        let mut state = self.state.lock();
        if state.generation == generation {
            state.phase = LoadPhase::Failed;
        }
    }

    /// Snapshot of the accepted samples so far
    pub fn samples(&self) -> Vec<GazeSample> {
        self.state.lock().accumulator.samples().to_vec()
    }

    /// Borrow the accepted samples without copying them
    pub fn with_samples<R>(&self, f: impl FnOnce(&[GazeSample]) -> R) -> R {
        f(self.state.lock().accumulator.samples())
    }

    /// Distance series of the last completed load; empty until completion
    pub fn distances(&self) -> Vec<GazeDistanceSample> {
        self.state.lock().distances.clone()
    }

    /// AOI histogram over the current samples, recomputed on every call
    pub fn aoi_histogram(&self) -> AoiHistogram {
        self.with_samples(DerivedMetricsEngine::compute_aoi_histogram)
    }

    pub fn phase(&self) -> LoadPhase {
        self.state.lock().phase
    }

    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    pub fn read_progress(&self) -> u8 {
        *self.read_progress.borrow()
    }

    pub fn transform_progress(&self) -> u8 {
        *self.transform_progress.borrow()
    }

    pub fn subscribe_read_progress(&self) -> watch::Receiver<u8> {
        self.read_progress.subscribe()
    }

    pub fn subscribe_transform_progress(&self) -> watch::Receiver<u8> {
        self.transform_progress.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn make_csv(rows: usize, timestamp_offset: i64) -> String {
        let mut text = String::from("timestamp,participant,x,y,fixationDuration,aoiName");
        for i in 0..rows {
            let aoi = if i % 2 == 0 { "Left" } else { "Right" };
            text.push_str(&format!(
                "\n{},P1,{},{},120,{}",
                timestamp_offset + i as i64,
                i * 3,
                i * 4,
                aoi
            ));
        }
        text
    }

    fn controller_with_chunk(chunk_size: usize) -> IngestionController {
        IngestionController::new(IngestConfig::default().with_chunk_size(chunk_size)).unwrap()
    }

    #[tokio::test]
    async fn test_load_text_completes() {
        let controller = controller_with_chunk(4);

        let report = controller.load_text(&make_csv(10, 0)).await.unwrap();

        assert_eq!(report.generation, 1);
        assert_eq!(report.rows_total, 10);
        assert_eq!(report.rows_accepted, 10);
        assert_eq!(report.rows_rejected, 0);
        assert_eq!(report.distances, 9);

        assert_eq!(controller.phase(), LoadPhase::Complete);
        assert_eq!(controller.read_progress(), 100);
        assert_eq!(controller.transform_progress(), 100);
        assert_eq!(controller.samples().len(), 10);
        // Consecutive samples are 3-4-5 triangles apart
        assert!(controller.distances().iter().all(|d| d.distance == 5));

        let histogram = controller.aoi_histogram();
        assert_eq!(histogram.names().collect::<Vec<_>>(), vec!["Left", "Right"]);
        assert_eq!(histogram.get("Left"), Some(5));
    }

    #[tokio::test]
    async fn test_header_only_load() {
        let controller = IngestionController::default();

        let report = controller.load_text("timestamp,x,y").await.unwrap();

        assert_eq!(report.rows_total, 0);
        assert_eq!(controller.transform_progress(), 100);
        assert!(controller.samples().is_empty());
        assert!(controller.distances().is_empty());
        assert!(controller.aoi_histogram().is_empty());
    }

    #[tokio::test]
    async fn test_new_load_replaces_previous_results() {
        let controller = controller_with_chunk(100);

        controller.load_text(&make_csv(30, 0)).await.unwrap();
        controller.load_text(&make_csv(5, 1000)).await.unwrap();

        let samples = controller.samples();
        assert_eq!(samples.len(), 5);
        assert_eq!(samples[0].timestamp, Some(1000));
        assert_eq!(controller.distances().len(), 4);
        assert_eq!(controller.generation(), 2);
    }

    #[tokio::test]
    async fn test_stale_load_is_superseded() {
        let controller = controller_with_chunk(10);
        let old_text = make_csv(200, 0);
        let new_text = make_csv(50, 10_000);

        let (old, new) = tokio::join!(
            controller.load_text(&old_text),
            controller.load_text(&new_text)
        );

        assert!(matches!(old, Err(IngestError::Superseded(2))));
        let new = new.unwrap();
        assert_eq!(new.generation, 2);
        assert_eq!(new.rows_accepted, 50);

        let samples = controller.samples();
        assert_eq!(samples.len(), 50);
        assert!(samples.iter().all(|s| s.timestamp.unwrap() >= 10_000));
        assert_eq!(controller.distances().len(), 49);
        assert_eq!(controller.transform_progress(), 100);
    }

    #[tokio::test]
    async fn test_progress_subscription_sees_completion() {
        let controller = controller_with_chunk(3);
        let mut transform = controller.subscribe_transform_progress();
        let read = controller.subscribe_read_progress();

        controller.load_text(&make_csv(10, 0)).await.unwrap();

        assert!(transform.has_changed().unwrap());
        assert_eq!(*transform.borrow_and_update(), 100);
        assert_eq!(*read.borrow(), 100);
    }

    #[tokio::test]
    async fn test_load_file() {
        let path = std::env::temp_dir().join(format!("gaze-flux-{}.csv", Uuid::new_v4()));
        std::fs::write(&path, make_csv(25, 0)).unwrap();
        let controller = controller_with_chunk(10);

        let report = controller.load_file(&path).await.unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(report.rows_accepted, 25);
        assert_eq!(controller.read_progress(), 100);
        assert_eq!(controller.phase(), LoadPhase::Complete);
    }

    #[tokio::test]
    async fn test_failed_read_marks_phase() {
        let controller = IngestionController::default();
        controller.load_text(&make_csv(5, 0)).await.unwrap();

        let result = controller
            .load_file(std::env::temp_dir().join("gaze-flux-missing.csv"))
            .await;

        assert!(matches!(result, Err(IngestError::Io(_))));
        assert_eq!(controller.phase(), LoadPhase::Failed);
        // The failed cycle still reset the previous file's results
        assert!(controller.samples().is_empty());
    }

    #[tokio::test]
    async fn test_read_timeout_marks_phase() {
        let path = std::env::temp_dir().join(format!("gaze-flux-{}.csv", Uuid::new_v4()));
        std::fs::write(&path, make_csv(200_000, 0)).unwrap();
        let mut config = IngestConfig::default();
        config.reader.buffer_bytes = 16;
        config.reader.timeout_ms = Some(1);
        let controller = IngestionController::new(config).unwrap();

        let result = controller.load_file(&path).await;
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(result, Err(IngestError::ReadTimeout(1))));
        assert_eq!(controller.phase(), LoadPhase::Failed);
        assert!(controller.read_progress() < 100);
        assert_eq!(controller.transform_progress(), 0);
        assert!(controller.samples().is_empty());
        assert!(controller.distances().is_empty());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = IngestConfig::default().with_chunk_size(0);
        assert!(matches!(
            IngestionController::new(config),
            Err(IngestError::InvalidConfig(_))
        ));
    }
}
