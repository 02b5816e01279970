//! pagetap - replay recognized text through the selection workflow
//!
//! Loads a page photo, feeds it a recorded set of recognition observations,
//! applies selections and taps, and prints the overlays and confirmed text.

use anyhow::Result;
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use pagetap::config;
use pagetap::recognition::FixtureRecognizer;
use pagetap::{
    OverlayRegion, Point, RecognitionAdapter, Rect, Size, SourceImage, WorkflowController,
};

/// pagetap - select recognized text on a page photo
#[derive(Parser, Debug)]
#[command(name = "pagetap")]
#[command(about = "Recognize text regions on a page photo and select them")]
struct Args {
    /// Page image (PNG, JPEG, ...)
    image: PathBuf,

    /// JSON file of recognition observations to replay
    #[arg(short, long)]
    observations: PathBuf,

    /// Viewport size as WIDTHxHEIGHT (defaults to the configured size)
    #[arg(long, value_parser = parse_size)]
    viewport: Option<Size>,

    /// Region indices to select, comma separated
    #[arg(short, long, value_delimiter = ',')]
    select: Vec<usize>,

    /// Select every region
    #[arg(long)]
    select_all: bool,

    /// Tap at X,Y in viewport pixels (repeatable)
    #[arg(long, value_parser = parse_point)]
    tap: Vec<Point>,

    /// Configuration file (defaults to the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

/// What gets printed after the session
#[derive(Serialize)]
struct Report {
    display_rect: Option<Rect>,
    overlays: Vec<OverlayRegion>,
    selected: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load or create configuration
    let config = config::load_or_default(args.config.as_deref())?;

    // Initialize logging
    init_logging(&config.logging.level)?;

    info!("pagetap starting...");

    let image = SourceImage::open(&args.image)?;
    let recognizer = FixtureRecognizer::from_path(&args.observations)?;
    let adapter = RecognitionAdapter::with_options(recognizer, config.recognition.to_options());
    let controller = WorkflowController::new(adapter)?;

    let viewport = args
        .viewport
        .unwrap_or_else(|| config.display.viewport_size());
    controller.set_viewport_size(viewport);

    let outcome = controller.load_image(image).wait().await?;
    info!("Recognition finished: {:?}", outcome);

    if args.select_all {
        controller.select_all();
    }
    for &index in &args.select {
        controller.select(index)?;
    }
    for &point in &args.tap {
        if controller.tap(point)?.is_none() {
            warn!("Tap at ({}, {}) did not hit a region", point.x, point.y);
        }
    }

    let report = Report {
        display_rect: controller.display_rect()?,
        overlays: controller.overlays()?,
        selected: controller.confirm_selection(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

fn init_logging(default_level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_level)?,
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Parse "390x664"
fn parse_size(value: &str) -> Result<Size, String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {:?}", value))?;
    let width: f64 = width.trim().parse().map_err(|e| format!("bad width: {}", e))?;
    let height: f64 = height.trim().parse().map_err(|e| format!("bad height: {}", e))?;
    Ok(Size::new(width, height))
}

/// Parse "120,48.5"
fn parse_point(value: &str) -> Result<Point, String> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got {:?}", value))?;
    let x: f64 = x.trim().parse().map_err(|e| format!("bad x: {}", e))?;
    let y: f64 = y.trim().parse().map_err(|e| format!("bad y: {}", e))?;
    Ok(Point::new(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("390x664").unwrap(), Size::new(390.0, 664.0));
        assert_eq!(parse_size("100.5X50").unwrap(), Size::new(100.5, 50.0));
        assert!(parse_size("390").is_err());
        assert!(parse_size("wide x tall").is_err());
    }

    #[test]
    fn test_parse_point() {
        assert_eq!(parse_point("120,48.5").unwrap(), Point::new(120.0, 48.5));
        assert!(parse_point("120").is_err());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "pagetap",
            "page.jpg",
            "--observations",
            "obs.json",
            "--select",
            "0,2",
            "--tap",
            "10,20",
            "--tap",
            "30,40",
            "--viewport",
            "100x200",
        ])
        .unwrap();

        assert_eq!(args.select, vec![0, 2]);
        assert_eq!(args.tap.len(), 2);
        assert_eq!(args.viewport, Some(Size::new(100.0, 200.0)));
        assert!(!args.select_all);
    }
}
