use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;

use clap::{Parser, ValueEnum};

use lipread_core::classification::domain::classification_result::ClassificationResult;
use lipread_core::classification::infrastructure::onnx_sequence_classifier::OnnxSequenceClassifier;
use lipread_core::detection::infrastructure::onnx_face_mesh_detector::OnnxFaceMeshDetector;
use lipread_core::pipeline::infrastructure::latest_frame_worker::{LatestFrameWorker, TickReport};
use lipread_core::pipeline::lip_reading_pipeline::{LipReadingPipeline, SessionSchedule, TickOutcome};
use lipread_core::pipeline::pipeline_controller::ClassificationPolicy;
use lipread_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use lipread_core::shared::constants::{CLASSIFIER_MODEL_NAME, FACE_MESH_MODEL_NAME, VIDEO_EXTENSIONS};
use lipread_core::shared::model_resolver::{self, ModelSource};
use lipread_core::shared::settings::PipelineSettings;
use lipread_core::video::domain::frame_codec::CodecMode;
use lipread_core::video::domain::frame_source::FrameSource;
use lipread_core::video::infrastructure::ffmpeg_yuv_reader::FfmpegYuvReader;
use lipread_core::video::infrastructure::png_tile_writer::PngTileWriter;

/// Visual speech recognition over a video file.
#[derive(Parser)]
#[command(name = "lipread")]
struct Cli {
    /// Input video file, standing in for the camera feed.
    input: PathBuf,

    /// Face-mesh landmark model: a file path, a cached model name, or an http(s) URL.
    #[arg(long)]
    face_model: String,

    /// Sequence classifier model: a file path, a cached model name, or an http(s) URL.
    #[arg(long)]
    classifier_model: String,

    /// JSON settings file; flags below override its values.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Classifier labels in output order (comma-separated).
    #[arg(long, value_delimiter = ',')]
    labels: Option<Vec<String>>,

    /// Tiles per classification window.
    #[arg(long)]
    window: Option<usize>,

    /// Square tile size in pixels.
    #[arg(long)]
    tile_size: Option<u32>,

    /// What to do after a prediction.
    #[arg(long, value_enum)]
    policy: Option<PolicyArg>,

    /// YUV to RGB conversion: direct, or with a JPEG round trip.
    #[arg(long, value_enum)]
    codec: Option<CodecArg>,

    /// Minimum face presence probability (0.0-1.0).
    #[arg(long)]
    face_threshold: Option<f32>,

    /// Pace frames at the source rate and drop frames while busy, like a camera.
    #[arg(long)]
    live: bool,

    /// Write every normalized tile as a PNG into this directory.
    #[arg(long)]
    dump_tiles: Option<PathBuf>,

    /// Frame index at which collection starts.
    #[arg(long, default_value = "0")]
    start_at: usize,

    /// Frame index at which collection stops.
    #[arg(long)]
    stop_at: Option<usize>,
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    Continuous,
    SingleShot,
}

impl From<PolicyArg> for ClassificationPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Continuous => ClassificationPolicy::Continuous,
            PolicyArg::SingleShot => ClassificationPolicy::SingleShot,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum CodecArg {
    Direct,
    Jpeg,
}

impl From<CodecArg> for CodecMode {
    fn from(arg: CodecArg) -> Self {
        match arg {
            CodecArg::Direct => CodecMode::Direct,
            CodecArg::Jpeg => CodecMode::JpegRoundTrip,
        }
    }
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let settings = build_settings(&cli)?;
    log::info!(
        "Window {} x {}x{} tiles, {} policy, {} codec, {} labels",
        settings.window_length,
        settings.tile_width,
        settings.tile_height,
        settings.policy,
        settings.codec,
        settings.labels.len()
    );

    let face_model = resolve_model(&cli.face_model, FACE_MESH_MODEL_NAME)?;
    let classifier_model = resolve_model(&cli.classifier_model, CLASSIFIER_MODEL_NAME)?;

    let detector = OnnxFaceMeshDetector::new(&face_model, settings.face_presence_threshold)?;
    let classifier = OnnxSequenceClassifier::new(&classifier_model)?;
    if let Some(n) = classifier.window_length() {
        if n != settings.window_length {
            return Err(format!(
                "Classifier expects windows of {n} tiles, settings use {}",
                settings.window_length
            )
            .into());
        }
    }

    let mut pipeline = LipReadingPipeline::from_settings(
        &settings,
        Box::new(detector),
        Box::new(classifier),
        Box::new(StdoutPipelineLogger::default()),
    );
    if let Some(dir) = &cli.dump_tiles {
        pipeline = pipeline.with_tile_writer(Box::new(PngTileWriter::new(dir)?));
        log::info!("Writing tiles to {}", dir.display());
    }

    let schedule = SessionSchedule::new(cli.start_at, cli.stop_at);
    let mut source = FfmpegYuvReader::new();

    let pipeline = if cli.live {
        run_live(&cli.input, &mut source, pipeline, schedule)?
    } else {
        run_offline(&cli.input, &mut source, pipeline, schedule)?
    };

    pipeline.logger().summary();
    Ok(())
}

fn run_offline(
    input: &Path,
    source: &mut dyn FrameSource,
    mut pipeline: LipReadingPipeline,
    schedule: SessionSchedule,
) -> Result<LipReadingPipeline, Box<dyn std::error::Error>> {
    let stats = pipeline.run_source(source, input, schedule, print_prediction)?;
    log::info!(
        "{} frames, {} predictions, {} failed ticks",
        stats.frames,
        stats.predictions.len(),
        stats.errors
    );
    Ok(pipeline)
}

fn run_live(
    input: &Path,
    source: &mut dyn FrameSource,
    pipeline: LipReadingPipeline,
    schedule: SessionSchedule,
) -> Result<LipReadingPipeline, Box<dyn std::error::Error>> {
    let metadata = source.open(input)?;
    let interval = metadata.frame_interval();
    log::info!(
        "Streaming {} ({}x{}, {:.2} fps)",
        input.display(),
        metadata.width,
        metadata.height,
        metadata.fps
    );

    let mut worker = LatestFrameWorker::spawn(pipeline);
    let started = Instant::now();
    let mut submitted = 0usize;

    for raw in source.frames() {
        let raw = raw?;
        schedule.apply(raw.index, worker.controller());
        worker.submit(raw)?;
        submitted += 1;

        worker.drain_reports().iter().for_each(report);

        if let Some(interval) = interval {
            let due = interval * submitted as u32;
            if let Some(wait) = due.checked_sub(started.elapsed()) {
                std::thread::sleep(wait);
            }
        }
    }
    source.close();

    let dropped = worker.dropped();
    let (mut pipeline, remaining) = worker.shutdown()?;
    remaining.iter().for_each(report);

    let logger = pipeline.logger_mut();
    logger.metric("dropped_frames", dropped as f64);
    logger.info(&format!("{submitted} frames submitted, {dropped} dropped while busy"));
    Ok(pipeline)
}

fn report(tick: &TickReport) {
    if let Ok(TickOutcome::Classified(result)) = &tick.outcome {
        print_prediction(tick.index, result);
    }
}

fn print_prediction(index: usize, result: &ClassificationResult) {
    println!("[frame {index}] {result}");
    println!("    {}", result.probabilities_summary());
}

fn build_settings(cli: &Cli) -> Result<PipelineSettings, Box<dyn std::error::Error>> {
    let mut settings = match &cli.settings {
        Some(path) => PipelineSettings::load(path)?,
        None => PipelineSettings::default(),
    };

    if let Some(labels) = &cli.labels {
        settings.labels = labels.iter().map(|l| l.trim().to_string()).collect();
    }
    if let Some(n) = cli.window {
        settings.window_length = n;
    }
    if let Some(size) = cli.tile_size {
        settings.tile_width = size;
        settings.tile_height = size;
    }
    if let Some(policy) = cli.policy {
        settings.policy = policy.into();
    }
    if let Some(codec) = cli.codec {
        settings.codec = codec.into();
    }
    if let Some(threshold) = cli.face_threshold {
        settings.face_presence_threshold = threshold;
    }

    settings.validate()?;
    Ok(settings)
}

/// URLs download into the cache, existing paths are used as-is, and bare
/// names are looked up in the cache and next to the executable.
fn resolve_model(arg: &str, fallback_name: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let source = match ModelSource::parse(arg, fallback_name) {
        ModelSource::File(path) if !path.exists() && path.components().count() == 1 => {
            ModelSource::Named {
                name: arg.to_string(),
                url: None,
            }
        }
        other => other,
    };

    let bundled = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("models")));

    log::info!("Resolving model: {arg}");
    let path = model_resolver::resolve(&source, bundled.as_deref(), Some(Box::new(download_progress)))?;
    log::debug!("Using {}", path.display());
    Ok(path)
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.input.exists() {
        return Err(format!("Input file not found: {}", cli.input.display()).into());
    }
    if !is_video(&cli.input) {
        log::warn!(
            "{} does not have a known video extension; trying anyway",
            cli.input.display()
        );
    }
    if let Some(stop) = cli.stop_at {
        if stop <= cli.start_at {
            return Err(format!(
                "--stop-at ({stop}) must come after --start-at ({})",
                cli.start_at
            )
            .into());
        }
    }
    if let Some(t) = cli.face_threshold {
        if !(0.0..=1.0).contains(&t) {
            return Err(format!("Face threshold must be between 0.0 and 1.0, got {t}").into());
        }
    }
    Ok(())
}

fn is_video(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading model... {pct}%");
    } else {
        eprint!("\rDownloading model... {downloaded} bytes");
    }
}
