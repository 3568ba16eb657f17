use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::classification::domain::classification_result::ClassificationResult;
use crate::classification::domain::sequence_classifier::SequenceClassifier;
use crate::detection::domain::landmark_detector::LandmarkDetector;
use crate::detection::domain::region_extractor::RegionExtractor;
use crate::normalization::frame_normalizer::FrameNormalizer;
use crate::shared::error::PipelineError;
use crate::shared::raw_frame::RawFrame;
use crate::shared::settings::PipelineSettings;
use crate::video::domain::frame_codec::FrameCodec;
use crate::video::domain::frame_source::FrameSource;
use crate::video::domain::tile_writer::TileWriter;
use crate::video::infrastructure::nv21_frame_codec::Nv21FrameCodec;

use super::pipeline_controller::{PipelineController, TileOutcome};
use super::pipeline_logger::PipelineLogger;
use super::sequence_window::SequenceWindow;

/// What one tick did with its frame.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// The controller was not collecting; the frame was not processed.
    Idle,
    /// No usable mouth region in this frame; the window is unchanged.
    NoRegion,
    /// A tile was appended; `filled` tiles are buffered.
    Buffered { filled: usize },
    /// The tile completed the window, which was classified.
    Classified(ClassificationResult),
}

impl TickOutcome {
    pub fn name(&self) -> &'static str {
        match self {
            TickOutcome::Idle => "idle",
            TickOutcome::NoRegion => "no_region",
            TickOutcome::Buffered { .. } => "buffered",
            TickOutcome::Classified(_) => "classified",
        }
    }
}

/// Per-frame pipeline: decode → detect → extract → normalize → controller.
///
/// `process_frame` must not be called concurrently with itself; the caller
/// (normally a single worker thread) guarantees that. The controller is
/// shared so `start`/`stop` can be driven from elsewhere while ticks run.
pub struct LipReadingPipeline {
    codec: Box<dyn FrameCodec>,
    detector: Box<dyn LandmarkDetector>,
    extractor: RegionExtractor,
    normalizer: FrameNormalizer,
    controller: Arc<PipelineController>,
    tile_writer: Option<Box<dyn TileWriter>>,
    tiles_written: usize,
    logger: Box<dyn PipelineLogger>,
}

impl LipReadingPipeline {
    pub fn new(
        codec: Box<dyn FrameCodec>,
        detector: Box<dyn LandmarkDetector>,
        extractor: RegionExtractor,
        normalizer: FrameNormalizer,
        controller: Arc<PipelineController>,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        Self {
            codec,
            detector,
            extractor,
            normalizer,
            controller,
            tile_writer: None,
            tiles_written: 0,
            logger,
        }
    }

    /// Wires the stages from validated settings around the given models.
    pub fn from_settings(
        settings: &PipelineSettings,
        detector: Box<dyn LandmarkDetector>,
        classifier: Box<dyn SequenceClassifier>,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        let window = SequenceWindow::new(
            settings.window_length,
            settings.tile_width,
            settings.tile_height,
        );
        let controller = PipelineController::new(
            classifier,
            settings.labels.clone(),
            window,
            settings.policy,
        );
        Self::new(
            Box::new(Nv21FrameCodec::new(settings.codec)),
            detector,
            RegionExtractor::new(settings.landmark_indices.clone()),
            FrameNormalizer::new(settings.tile_width, settings.tile_height),
            Arc::new(controller),
            logger,
        )
    }

    /// Also write every normalized tile through `writer`.
    pub fn with_tile_writer(mut self, writer: Box<dyn TileWriter>) -> Self {
        self.tile_writer = Some(writer);
        self
    }

    pub fn controller(&self) -> &Arc<PipelineController> {
        &self.controller
    }

    pub fn logger(&self) -> &dyn PipelineLogger {
        self.logger.as_ref()
    }

    pub fn logger_mut(&mut self) -> &mut dyn PipelineLogger {
        self.logger.as_mut()
    }

    /// Runs one tick on `raw`.
    ///
    /// Errors abort the tick without touching the window, except classifier
    /// errors, which the controller reports after clearing it.
    pub fn process_frame(&mut self, raw: &RawFrame) -> Result<TickOutcome, PipelineError> {
        let result = self.tick(raw);
        match &result {
            Ok(outcome) => self.logger.outcome(outcome.name()),
            Err(e) => {
                self.logger.outcome(error_name(e));
                match e {
                    PipelineError::ClassifierPrecondition { .. }
                    | PipelineError::ClassifierFailure(_) => {}
                    _ => log::warn!("Frame {} dropped: {e}", raw.index),
                }
            }
        }
        result
    }

    fn tick(&mut self, raw: &RawFrame) -> Result<TickOutcome, PipelineError> {
        if !self.controller.is_collecting() {
            return Ok(TickOutcome::Idle);
        }

        let t0 = Instant::now();
        let frame = self.codec.decode(raw)?;
        self.logger.timing("decode", elapsed_ms(t0));

        let t0 = Instant::now();
        let landmarks = self
            .detector
            .detect(&frame)
            .map_err(|e| PipelineError::Detection(e.to_string()))?;
        self.logger.timing("detect", elapsed_ms(t0));

        let Some(crop) = self.extractor.extract(&landmarks, &frame) else {
            log::debug!("Frame {}: no region detected", frame.index());
            return Ok(TickOutcome::NoRegion);
        };

        let t0 = Instant::now();
        let tile = self.normalizer.normalize(&crop);
        self.logger.timing("normalize", elapsed_ms(t0));

        if let Some(writer) = self.tile_writer.as_mut() {
            match writer.write(&tile, self.tiles_written) {
                Ok(()) => self.tiles_written += 1,
                Err(e) => log::warn!("Failed to write tile {}: {e}", self.tiles_written),
            }
        }

        let t0 = Instant::now();
        let outcome = self.controller.on_tile(tile);
        self.logger.timing("controller", elapsed_ms(t0));

        match outcome? {
            TileOutcome::Ignored => Ok(TickOutcome::Idle),
            TileOutcome::Buffered { filled } => {
                self.logger.metric("window_fill", filled as f64);
                Ok(TickOutcome::Buffered { filled })
            }
            TileOutcome::Classified(result) => Ok(TickOutcome::Classified(result)),
        }
    }

    /// Feeds every frame of `path` through the pipeline in order.
    ///
    /// `schedule` plays the role of the user's start/stop buttons. Tick errors
    /// are logged and skipped; only failures of the source itself abort the run.
    pub fn run_source(
        &mut self,
        source: &mut dyn FrameSource,
        path: &Path,
        schedule: SessionSchedule,
        mut on_result: impl FnMut(usize, &ClassificationResult),
    ) -> Result<RunStats, Box<dyn std::error::Error>> {
        let metadata = source.open(path)?;
        let total = metadata.total_frames;
        let mut stats = RunStats::default();

        log::info!(
            "Reading {} ({}x{}, {:.2} fps, {total} frames)",
            path.display(),
            metadata.width,
            metadata.height,
            metadata.fps
        );

        for raw in source.frames() {
            let raw = raw?;
            schedule.apply(raw.index, &self.controller);
            stats.frames += 1;

            match self.process_frame(&raw) {
                Ok(TickOutcome::Classified(result)) => {
                    on_result(raw.index, &result);
                    stats.predictions.push(result);
                }
                Ok(_) => {}
                Err(_) => stats.errors += 1,
            }
            self.logger.progress(stats.frames, total);
        }

        source.close();
        Ok(stats)
    }
}

/// Frame indices at which collection starts and (optionally) stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSchedule {
    pub start_at: usize,
    pub stop_at: Option<usize>,
}

impl SessionSchedule {
    pub fn new(start_at: usize, stop_at: Option<usize>) -> Self {
        Self { start_at, stop_at }
    }

    /// Presses start or stop on `controller` if `index` is a scheduled frame.
    pub fn apply(&self, index: usize, controller: &PipelineController) {
        if index == self.start_at {
            controller.start();
        }
        if self.stop_at == Some(index) {
            controller.stop();
        }
    }
}

impl Default for SessionSchedule {
    fn default() -> Self {
        Self::new(0, None)
    }
}

/// Totals for one `run_source` call.
#[derive(Debug, Default)]
pub struct RunStats {
    pub frames: usize,
    pub errors: usize,
    pub predictions: Vec<ClassificationResult>,
}

fn error_name(e: &PipelineError) -> &'static str {
    match e {
        PipelineError::Decode(_) => "decode_error",
        PipelineError::Detection(_) => "detection_error",
        PipelineError::ClassifierPrecondition { .. } => "label_mismatch",
        PipelineError::ClassifierFailure(_) => "classifier_error",
    }
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::landmark_set::LandmarkSet;
    use crate::pipeline::pipeline_controller::{ClassificationPolicy, ControllerState};
    use crate::pipeline::pipeline_logger::NullPipelineLogger;
    use crate::shared::constants::{FACE_MESH_POINTS, MOUTH_PERIMETER};
    use crate::shared::error::DecodeError;
    use crate::shared::frame::Frame;
    use crate::shared::raw_frame::PlaneBuf;
    use crate::shared::tile::Tile;
    use crate::shared::video_metadata::VideoMetadata;
    use ndarray::ArrayView5;
    use std::sync::Mutex;

    // --- Stubs ---

    /// Places every mouth landmark on the corners of a fixed box.
    struct StubDetector {
        extent: Option<[f32; 4]>,
        fail: bool,
        calls: Arc<Mutex<usize>>,
    }

    impl StubDetector {
        fn mouth_at(extent: [f32; 4]) -> Self {
            Self {
                extent: Some(extent),
                fail: false,
                calls: Arc::default(),
            }
        }

        fn nobody() -> Self {
            Self {
                extent: None,
                fail: false,
                calls: Arc::default(),
            }
        }

        fn failing() -> Self {
            Self {
                extent: None,
                fail: true,
                calls: Arc::default(),
            }
        }
    }

    impl LandmarkDetector for StubDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<LandmarkSet, Box<dyn std::error::Error>> {
            *self.calls.lock().unwrap() += 1;
            if self.fail {
                return Err("model crashed".into());
            }
            let Some([x0, y0, x1, y1]) = self.extent else {
                return Ok(LandmarkSet::empty());
            };
            let mut points = vec![(0.5, 0.5); FACE_MESH_POINTS];
            for (n, &i) in MOUTH_PERIMETER.iter().enumerate() {
                points[i] = if n % 2 == 0 { (x0, y0) } else { (x1, y1) };
            }
            Ok(LandmarkSet::new(points))
        }
    }

    struct StubClassifier {
        scores: Vec<f32>,
        calls: Arc<Mutex<usize>>,
    }

    impl SequenceClassifier for StubClassifier {
        fn infer(&mut self, input: ArrayView5<'_, f32>) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
            assert_eq!(&input.shape()[2..], &[8, 8, 1]);
            *self.calls.lock().unwrap() += 1;
            Ok(self.scores.clone())
        }
    }

    struct CountingCodec {
        calls: Arc<Mutex<usize>>,
    }

    impl FrameCodec for CountingCodec {
        fn decode(&self, raw: &RawFrame) -> Result<Frame, DecodeError> {
            *self.calls.lock().unwrap() += 1;
            Nv21FrameCodec::default().decode(raw)
        }
    }

    struct RecordingTileWriter {
        written: Arc<Mutex<Vec<(usize, Tile)>>>,
    }

    impl TileWriter for RecordingTileWriter {
        fn write(&mut self, tile: &Tile, sequence: usize) -> Result<(), Box<dyn std::error::Error>> {
            self.written.lock().unwrap().push((sequence, tile.clone()));
            Ok(())
        }

        fn destination(&self) -> &Path {
            Path::new("memory")
        }
    }

    struct StubSource {
        frames: Vec<RawFrame>,
    }

    impl FrameSource for StubSource {
        fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
            Ok(VideoMetadata {
                width: 32,
                height: 24,
                fps: 30.0,
                total_frames: self.frames.len(),
                source_path: Some(path.to_path_buf()),
            })
        }

        fn frames(
            &mut self,
        ) -> Box<dyn Iterator<Item = Result<RawFrame, Box<dyn std::error::Error>>> + '_> {
            Box::new(std::mem::take(&mut self.frames).into_iter().map(Ok))
        }

        fn close(&mut self) {}
    }

    /// Keeps the status messages and outcome names it is given.
    #[derive(Default)]
    struct RecordingLogger {
        messages: Arc<Mutex<Vec<String>>>,
        outcomes: Arc<Mutex<Vec<&'static str>>>,
    }

    impl PipelineLogger for RecordingLogger {
        fn progress(&mut self, _current: usize, _total: usize) {}
        fn outcome(&mut self, name: &'static str) {
            self.outcomes.lock().unwrap().push(name);
        }
        fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
        fn metric(&mut self, _name: &str, _value: f64) {}
        fn info(&mut self, message: &str) {
            self.messages.lock().unwrap().push(message.to_string());
        }
    }

    // --- Helpers ---

    fn gray_raw(index: usize) -> RawFrame {
        let (w, h) = (32usize, 24usize);
        RawFrame::new(
            w as u32,
            h as u32,
            PlaneBuf::packed(vec![128; w * h], w),
            PlaneBuf::packed(vec![128; (w / 2) * (h / 2)], w / 2),
            PlaneBuf::packed(vec![128; (w / 2) * (h / 2)], w / 2),
            index,
        )
    }

    fn settings(window_length: usize, policy: ClassificationPolicy) -> PipelineSettings {
        PipelineSettings {
            window_length,
            tile_width: 8,
            tile_height: 8,
            policy,
            labels: vec!["HELLO".into(), "BYE".into()],
            ..PipelineSettings::default()
        }
    }

    fn pipeline(
        detector: StubDetector,
        window_length: usize,
        policy: ClassificationPolicy,
    ) -> (LipReadingPipeline, Arc<Mutex<usize>>) {
        let calls = Arc::new(Mutex::new(0));
        let classifier = StubClassifier {
            scores: vec![0.8, 0.2],
            calls: calls.clone(),
        };
        let pipeline = LipReadingPipeline::from_settings(
            &settings(window_length, policy),
            Box::new(detector),
            Box::new(classifier),
            Box::new(NullPipelineLogger),
        );
        (pipeline, calls)
    }

    fn mouth() -> StubDetector {
        StubDetector::mouth_at([0.25, 0.5, 0.75, 0.9])
    }

    // --- Tests ---

    #[test]
    fn test_idle_tick_skips_decode_and_detection() {
        let detector = mouth();
        let detector_calls = detector.calls.clone();
        let (mut p, _) = pipeline(detector, 3, ClassificationPolicy::Continuous);
        let codec_calls = Arc::new(Mutex::new(0));
        p.codec = Box::new(CountingCodec {
            calls: codec_calls.clone(),
        });

        assert_eq!(p.process_frame(&gray_raw(0)).unwrap(), TickOutcome::Idle);
        assert_eq!(*codec_calls.lock().unwrap(), 0);
        assert_eq!(*detector_calls.lock().unwrap(), 0);
    }

    #[test]
    fn test_frames_fill_window_then_classify() {
        let (mut p, classified) = pipeline(mouth(), 3, ClassificationPolicy::Continuous);
        p.controller().start();

        assert_eq!(
            p.process_frame(&gray_raw(0)).unwrap(),
            TickOutcome::Buffered { filled: 1 }
        );
        assert_eq!(
            p.process_frame(&gray_raw(1)).unwrap(),
            TickOutcome::Buffered { filled: 2 }
        );
        let TickOutcome::Classified(result) = p.process_frame(&gray_raw(2)).unwrap() else {
            panic!("third frame should complete the window");
        };
        assert_eq!(result.top().label, "HELLO");
        assert_eq!(*classified.lock().unwrap(), 1);
        assert_eq!(p.controller().filled(), 0);
    }

    #[test]
    fn test_prediction_is_not_relogged_by_pipeline() {
        let logger = RecordingLogger::default();
        let (messages, outcomes) = (logger.messages.clone(), logger.outcomes.clone());
        let calls = Arc::new(Mutex::new(0));
        let mut p = LipReadingPipeline::from_settings(
            &settings(2, ClassificationPolicy::Continuous),
            Box::new(mouth()),
            Box::new(StubClassifier {
                scores: vec![0.8, 0.2],
                calls,
            }),
            Box::new(logger),
        );
        p.controller().start();
        p.process_frame(&gray_raw(0)).unwrap();
        assert!(matches!(
            p.process_frame(&gray_raw(1)).unwrap(),
            TickOutcome::Classified(_)
        ));

        assert_eq!(*outcomes.lock().unwrap(), vec!["buffered", "classified"]);
        assert!(messages.lock().unwrap().is_empty());
    }

    #[test]
    fn test_no_face_leaves_window_unchanged() {
        let (mut p, _) = pipeline(StubDetector::nobody(), 3, ClassificationPolicy::Continuous);
        p.controller().start();
        assert_eq!(p.process_frame(&gray_raw(0)).unwrap(), TickOutcome::NoRegion);
        assert_eq!(p.controller().filled(), 0);
    }

    #[test]
    fn test_degenerate_mouth_is_no_region() {
        let detector = StubDetector::mouth_at([0.5, 0.5, 0.5, 0.9]);
        let (mut p, _) = pipeline(detector, 3, ClassificationPolicy::Continuous);
        p.controller().start();
        assert_eq!(p.process_frame(&gray_raw(0)).unwrap(), TickOutcome::NoRegion);
    }

    #[test]
    fn test_zero_length_chroma_is_decode_error() {
        let (mut p, _) = pipeline(mouth(), 3, ClassificationPolicy::Continuous);
        p.controller().start();
        p.process_frame(&gray_raw(0)).unwrap();

        let mut raw = gray_raw(1);
        raw.chroma_u = PlaneBuf::packed(Vec::new(), 16);
        raw.chroma_v = PlaneBuf::packed(Vec::new(), 16);

        let err = p.process_frame(&raw).unwrap_err();
        assert!(matches!(err, PipelineError::Decode(_)));
        assert_eq!(p.controller().filled(), 1);
        assert_eq!(p.controller().state(), ControllerState::Collecting);
    }

    #[test]
    fn test_detector_failure_is_reported() {
        let (mut p, _) = pipeline(StubDetector::failing(), 3, ClassificationPolicy::Continuous);
        p.controller().start();
        let err = p.process_frame(&gray_raw(0)).unwrap_err();
        assert!(matches!(err, PipelineError::Detection(ref m) if m == "model crashed"));
        assert_eq!(p.controller().filled(), 0);
    }

    #[test]
    fn test_single_shot_stops_after_prediction() {
        let (mut p, classified) = pipeline(mouth(), 2, ClassificationPolicy::SingleShot);
        p.controller().start();
        for i in 0..6 {
            p.process_frame(&gray_raw(i)).unwrap();
        }
        assert_eq!(*classified.lock().unwrap(), 1);
        assert_eq!(p.controller().state(), ControllerState::Idle);
    }

    #[test]
    fn test_tiles_are_written_in_sequence() {
        let written = Arc::new(Mutex::new(Vec::new()));
        let (p, _) = pipeline(mouth(), 5, ClassificationPolicy::Continuous);
        let mut p = p.with_tile_writer(Box::new(RecordingTileWriter {
            written: written.clone(),
        }));
        p.controller().start();
        for i in 0..3 {
            p.process_frame(&gray_raw(i)).unwrap();
        }

        let written = written.lock().unwrap();
        let sequences: Vec<usize> = written.iter().map(|(s, _)| *s).collect();
        assert_eq!(sequences, vec![0, 1, 2]);
        assert_eq!((written[0].1.width(), written[0].1.height()), (8, 8));
    }

    #[test]
    fn test_run_source_follows_schedule() {
        let (mut p, classified) = pipeline(mouth(), 3, ClassificationPolicy::Continuous);
        let mut source = StubSource {
            frames: (0..12).map(gray_raw).collect(),
        };
        let mut reported = Vec::new();

        let stats = p
            .run_source(
                &mut source,
                Path::new("clip.mp4"),
                SessionSchedule::new(2, Some(10)),
                |index, result| reported.push((index, result.top().label.clone())),
            )
            .unwrap();

        // frames 2..=9 are collected: windows close at 4 and 7, 8..9 are discarded
        assert_eq!(stats.frames, 12);
        assert_eq!(stats.errors, 0);
        assert_eq!(stats.predictions.len(), 2);
        assert_eq!(*classified.lock().unwrap(), 2);
        assert_eq!(
            reported,
            vec![(4, "HELLO".to_string()), (7, "HELLO".to_string())]
        );
        assert_eq!(p.controller().state(), ControllerState::Idle);
    }

    #[test]
    fn test_schedule_start_and_stop_same_frame() {
        let (p, _) = pipeline(mouth(), 3, ClassificationPolicy::Continuous);
        SessionSchedule::new(4, Some(4)).apply(4, p.controller());
        assert_eq!(p.controller().state(), ControllerState::Idle);
    }

    #[test]
    fn test_outcome_names() {
        assert_eq!(TickOutcome::Idle.name(), "idle");
        assert_eq!(TickOutcome::NoRegion.name(), "no_region");
        assert_eq!(TickOutcome::Buffered { filled: 1 }.name(), "buffered");
    }
}
