//! CLI application for golden-ratio face scoring.
//!
//! Replays a recorded detection through a full capture session.
//!
//! Usage:
//!   golden-face <detections.json>                      # Human-readable output
//!   golden-face <detections.json> --json               # JSON output
//!   golden-face <detections.json> --image face.jpg     # Attach the captured frame
//!   golden-face <detections.json> --data-uri "data:image/jpeg;base64,..."
//!   golden-face <detections.json> -o score.json --json # Save to file

use clap::{Parser, ValueEnum};
use golden_face::{
    CaptureSession, DetectorHandle, DetectorKind, ImageArtifact, Phase, RecordedDetector,
    SessionConfig, SessionUpdate,
};
use log::LevelFilter;
use serde::Serialize;
use std::path::PathBuf;

/// Frame used when no image is given. Recorded detections never look at the
/// pixels, so the session only needs something to hold in `Captured`.
const REPLAY_FRAME: &[u8] = &[];

#[derive(Parser, Debug)]
#[command(name = "golden-face")]
#[command(author, version, about = "Golden-ratio face scoring", long_about = None)]
struct Args {
    /// Recorded detector output (JSON)
    #[arg(required = true)]
    detections: PathBuf,

    /// Captured image the detections belong to
    #[arg(long)]
    image: Option<PathBuf>,

    /// Captured image as a base64 `data:` URI
    #[arg(long, conflicts_with = "image")]
    data_uri: Option<String>,

    /// Session configuration file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Scoring strategy; must match the recorded detector kind
    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,

    /// Decimal places in human-readable output
    #[arg(long)]
    precision: Option<usize>,

    /// Output as JSON
    #[arg(short, long)]
    json: bool,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Show verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StrategyArg {
    Landmarks,
    Box,
}

impl From<StrategyArg> for DetectorKind {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Landmarks => DetectorKind::Landmarks68,
            StrategyArg::Box => DetectorKind::BoundingBox,
        }
    }
}

/// Output structure for JSON serialization
#[derive(Serialize)]
struct Output {
    detections: String,
    image: Option<String>,
    detector: DetectorKind,
    strategy: &'static str,
    faces_recorded: usize,
    phase: Phase,
    score: Option<f32>,
    formatted_score: Option<String>,
    events: Vec<SessionUpdate>,
}

fn main() {
    let args = Args::parse();

    let default_level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .init();

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => SessionConfig::from_file(path)?,
        None => SessionConfig::default(),
    };
    if let Some(strategy) = args.strategy {
        config.strategy = Some(strategy.into());
    }
    if let Some(precision) = args.precision {
        config.precision = precision;
    }

    log::info!("loading detections from {:?}", args.detections);
    let recorded = RecordedDetector::from_file(&args.detections)?;
    let faces_recorded = recorded.num_faces();
    let detector = DetectorHandle::new(recorded);

    let image = match (&args.image, &args.data_uri) {
        (Some(path), _) => ImageArtifact::from_file(path)?,
        (None, Some(uri)) => ImageArtifact::from_data_uri(uri)?,
        (None, None) => ImageArtifact::new(REPLAY_FRAME.to_vec()),
    };

    let mut session = CaptureSession::from_config(detector.clone(), &config)?;
    session.load_model()?;
    session.capture(image)?;
    let score = session.detect()?;

    let output = Output {
        detections: args.detections.display().to_string(),
        image: match (&args.image, &args.data_uri) {
            (Some(path), _) => Some(path.display().to_string()),
            (None, Some(_)) => Some("data URI".to_string()),
            (None, None) => None,
        },
        detector: detector.kind(),
        strategy: session.strategy_name(),
        faces_recorded,
        phase: session.phase(),
        score: score.map(|s| s.value()),
        formatted_score: score.map(|s| s.format(config.precision)),
        events: session.drain_updates().collect(),
    };

    let output_str = if args.json {
        serde_json::to_string_pretty(&output)?
    } else {
        format_human_readable(&output)
    };

    if let Some(ref path) = args.output {
        std::fs::write(path, &output_str)?;
        log::info!("output written to {:?}", path);
    } else {
        println!("{}", output_str);
    }

    Ok(())
}

fn format_human_readable(output: &Output) -> String {
    let mut s = String::new();

    s.push_str(&format!("Detections: {}\n", output.detections));
    if let Some(image) = &output.image {
        s.push_str(&format!("Image: {}\n", image));
    }
    s.push_str(&format!(
        "Detector: {} ({} face(s) recorded)\n",
        output.detector, output.faces_recorded
    ));
    s.push_str(&format!("Strategy: {}\n", output.strategy));

    match &output.formatted_score {
        Some(score) => {
            s.push_str(&format!("\nGolden Ratio Score: {}\n", score));
            s.push_str("Disclaimer: Beauty is subjective! This is just for fun.\n");
        }
        None => s.push_str("\nNo face detected.\n"),
    }

    s
}
