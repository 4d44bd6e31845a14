// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docscan — command-line front end for the Docscan engine.
//
// Entry point. Initialises logging, parses arguments, and runs one of the
// detect / scan / rectify commands. Results go to stdout as JSON; logs go to
// stderr.

mod corners;
mod sink;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use docscan_core::error::{DocscanError, Result};
use docscan_core::human_errors::humanize_error;
use docscan_core::{FilterMode, Quad, ScannerConfig};
use docscan_session::{CapturedDocument, CaptureSummary, DocumentSink, ReplaySource, ScanSession};
use docscan_vision::{EdgeContourDetector, ImageEnhancer, PerspectiveRectifier, RasterImage, order_corners};
use image::imageops::FilterType;
use serde::Serialize;
use tracing::{debug, info};

use crate::sink::PngFileSink;

#[derive(Parser)]
#[command(name = "docscan")]
#[command(about = "Detect, rectify and clean up photographed documents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect the document outline in an image and print it as JSON.
    Detect(DetectArgs),

    /// Replay an image as a live camera feed, wait for lock, and capture.
    Scan(ScanArgs),

    /// Rectify an image with manually supplied corners.
    Rectify(RectifyArgs),
}

#[derive(Debug, Clone, Args)]
struct DetectArgs {
    /// Path to the input image.
    #[arg(long)]
    image: PathBuf,

    /// Scanner configuration (JSON, camelCase keys).
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct ScanArgs {
    /// Path to the input image.
    #[arg(long)]
    image: PathBuf,

    /// Output PNG file, or a directory to name the file by capture id.
    #[arg(long)]
    out: PathBuf,

    /// Filter applied after rectification (none, enhance, grayscale, bw).
    #[arg(long, default_value = "enhance")]
    filter: FilterMode,

    /// Number of times the image is fed to the session.
    #[arg(long, default_value = "8")]
    frames: usize,

    /// Run detection on a copy scaled to this width; capture still uses the
    /// full-resolution image.
    #[arg(long)]
    preview_width: Option<u32>,

    /// Scanner configuration (JSON, camelCase keys).
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct RectifyArgs {
    /// Path to the input image.
    #[arg(long)]
    image: PathBuf,

    /// Four corners as "x,y;x,y;x,y;x,y", in any order.
    #[arg(long)]
    corners: String,

    /// Interpret the corners as percentages of the image size.
    #[arg(long)]
    percent: bool,

    /// Output PNG file, or a directory to name the file by capture id.
    #[arg(long)]
    out: PathBuf,

    /// Filter applied after rectification (none, enhance, grayscale, bw).
    #[arg(long, default_value = "none")]
    filter: FilterMode,

    /// Scanner configuration (JSON, camelCase keys).
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DetectReport {
    width: u32,
    height: u32,
    quad: Option<Quad>,
    area: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScanReport {
    frames_processed: u64,
    locked_frame_count: u32,
    capture: CaptureSummary,
    path: PathBuf,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RectifyReport {
    quad: Quad,
    capture: CaptureSummary,
    path: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Detect(args) => run_detect(args),
        Commands::Scan(args) => run_scan(args).await,
        Commands::Rectify(args) => run_rectify(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let human = humanize_error(&err);
            eprintln!("error: {}", human.message);
            eprintln!("  {}", human.suggestion);
            debug!(error = %err, "Command failed");
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<ScannerConfig> {
    match path {
        Some(path) => ScannerConfig::load(path),
        None => Ok(ScannerConfig::default()),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// -- detect -------------------------------------------------------------------

fn run_detect(args: DetectArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let frame = RasterImage::open(&args.image)?;

    let mut detector = EdgeContourDetector::from_config(&config);
    let candidate = detector.detect(&frame);

    print_json(&DetectReport {
        width: frame.width(),
        height: frame.height(),
        quad: candidate.map(|c| order_corners(c.points)),
        area: candidate.map(|c| c.area),
    })
}

// -- scan ---------------------------------------------------------------------

async fn run_scan(args: ScanArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let full = Arc::new(RasterImage::open(&args.image)?);
    let preview = match args.preview_width {
        Some(width) => Arc::new(downscale(&full, width)?),
        None => Arc::clone(&full),
    };

    let mut session = ScanSession::new(config)?;
    session.start(ReplaySource::repeat(Arc::clone(&preview), args.frames))?;
    session.wait().await?;

    let snapshot = session.snapshot();
    info!(
        frames = snapshot.sequence,
        locked = snapshot.locked,
        "Replay finished"
    );

    let handle = session.capture_handle();
    let document = if Arc::ptr_eq(&preview, &full) {
        handle.capture(args.filter).await?
    } else {
        handle.capture_frame(&full, args.filter)?
    };

    let (capture, path) = write_document(document, &args.out)?;
    print_json(&ScanReport {
        frames_processed: snapshot.sequence,
        locked_frame_count: snapshot.locked_frame_count,
        capture,
        path,
    })
}

fn downscale(frame: &RasterImage, width: u32) -> Result<RasterImage> {
    if width == 0 || width >= frame.width() {
        return Ok(frame.clone());
    }
    let height = ((u64::from(frame.height()) * u64::from(width)) / u64::from(frame.width())).max(1) as u32;
    let resized = frame.clone().into_dynamic().resize_exact(width, height, FilterType::Triangle);
    RasterImage::from_dynamic(resized)
}

// -- rectify ------------------------------------------------------------------

fn run_rectify(args: RectifyArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let frame = RasterImage::open(&args.image)?;
    let points = corners::parse_corners(&args.corners)?;

    let raw = if args.percent {
        Quad::from_percent(points, frame.width(), frame.height())
    } else {
        Quad::new(points.map(Into::into))
    };
    let quad = order_corners(*raw.corners());

    let rectified = PerspectiveRectifier::new().rectify(&frame, &quad)?;
    let image = ImageEnhancer::from_config(&config).apply(&rectified, args.filter);
    let document = CapturedDocument::new(image, quad, args.filter);

    let (capture, path) = write_document(document, &args.out)?;
    print_json(&RectifyReport { quad, capture, path })
}

fn write_document(document: CapturedDocument, out: &Path) -> Result<(CaptureSummary, PathBuf)> {
    let summary = document.summary();
    let mut sink = PngFileSink::new(out);
    sink.accept(document)?;
    let path = sink
        .written()
        .last()
        .cloned()
        .ok_or_else(|| DocscanError::Session("document sink wrote nothing".into()))?;
    Ok((summary, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn filter_flag_accepts_aliases() {
        let cli = Cli::try_parse_from([
            "docscan", "rectify", "--image", "in.png", "--corners", "0,0;1,0;1,1;0,1", "--out", "o.png",
            "--filter", "bw",
        ])
        .unwrap();
        match cli.command {
            Commands::Rectify(args) => assert_eq!(args.filter, FilterMode::BlackWhite),
            _ => panic!("expected rectify"),
        }
    }

    #[test]
    fn downscale_keeps_aspect() {
        let frame = RasterImage::from_luma(400, 300, vec![0; 400 * 300]).unwrap();
        let small = downscale(&frame, 200).unwrap();
        assert_eq!(small.dimensions(), (200, 150));
        assert_eq!(downscale(&frame, 800).unwrap().dimensions(), (400, 300));
    }

    #[test]
    fn rectify_command_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.png");
        let out = dir.path().join("out.png");
        RasterImage::from_luma(100, 80, vec![180; 100 * 80]).unwrap().save(&input).unwrap();

        run_rectify(RectifyArgs {
            image: input,
            corners: "90,70;10,10;90,10;10,70".into(),
            percent: false,
            out: out.clone(),
            filter: FilterMode::Grayscale,
            config: None,
        })
        .unwrap();

        assert_eq!(RasterImage::open(&out).unwrap().dimensions(), (80, 60));
    }

    #[test]
    fn degenerate_corners_fail_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.png");
        RasterImage::from_luma(50, 50, vec![0; 2500]).unwrap().save(&input).unwrap();

        let err = run_rectify(RectifyArgs {
            image: input,
            corners: "0,0;10,10;20,20;30,30".into(),
            percent: false,
            out: dir.path().join("out.png"),
            filter: FilterMode::None,
            config: None,
        })
        .unwrap_err();
        assert!(matches!(err, DocscanError::DegenerateGeometry(_)));
    }
}
