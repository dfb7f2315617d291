//! rankview - command-line host for the reconstruction engine
//!
//! Loads a factor payload (from a file, or by sending an image to the
//! decomposition service), reconstructs it at full rank and at every requested
//! rank, and reports fidelity metrics.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Parser};
use rankview_common::config::{Precision, TomlConfig};
use rankview_common::Dimensions;
use rankview_engine::metrics::Metrics;
use rankview_engine::service::{DecompositionService, HttpDecompositionService};
use rankview_engine::{Orchestrator, Rendered};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// Command-line arguments for rankview
#[derive(Parser, Debug)]
#[command(name = "rankview")]
#[command(about = "Truncated SVD reconstruction of RGB images")]
#[command(version)]
#[command(group(ArgGroup::new("source").required(true).args(["payload", "image"])))]
struct Args {
    /// Raw factor payload file
    #[arg(long)]
    payload: Option<PathBuf>,

    /// Image file to send to the decomposition service
    #[arg(long)]
    image: Option<PathBuf>,

    /// Image width the factors were computed for
    #[arg(long, env = "RANKVIEW_WIDTH")]
    width: usize,

    /// Image height the factors were computed for
    #[arg(long, env = "RANKVIEW_HEIGHT")]
    height: usize,

    /// Rank to reconstruct at (repeatable; full rank is always rendered first)
    #[arg(short, long = "rank")]
    ranks: Vec<usize>,

    /// Config file (overrides RANKVIEW_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Decomposition service base URL
    #[arg(long, env = "RANKVIEW_SERVICE_URL")]
    service_url: Option<String>,

    /// Kernel accumulator precision (single or double)
    #[arg(long, env = "RANKVIEW_PRECISION")]
    precision: Option<Precision>,

    /// Print metrics as JSON
    #[arg(long)]
    json: bool,

    /// Write the last rendered frame as PNG
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// One line of the metrics report
#[derive(Debug, Serialize)]
struct FrameReport {
    image_id: Uuid,
    generation: u64,
    #[serde(flatten)]
    metrics: Metrics,
}

impl From<&Rendered> for FrameReport {
    fn from(frame: &Rendered) -> Self {
        Self {
            image_id: frame.image_id,
            generation: frame.generation.0,
            metrics: frame.metrics.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = TomlConfig::resolve(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(url) = &args.service_url {
        config.service.base_url = url.clone();
    }
    let precision = args.precision.unwrap_or(config.kernel.precision);

    // RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let level = &config.logging.level;
            format!("rankview={level},rankview_engine={level},rankview_common={level}").into()
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let dims = Dimensions::new(args.width, args.height).context("Invalid image dimensions")?;
    info!(width = dims.width, height = dims.height, %precision, "Starting rankview");

    let payload = match (&args.payload, &args.image) {
        (Some(path), _) => tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read payload {}", path.display()))?,
        (None, Some(path)) => fetch_payload(&config, path, dims).await?,
        (None, None) => bail!("Either --payload or --image is required"),
    };

    let mut orchestrator = Orchestrator::spawn(precision).context("Failed to start execution units")?;
    let outcome = run(&mut orchestrator, &payload, dims, &args).await;
    orchestrator.shutdown();
    outcome
}

async fn fetch_payload(config: &TomlConfig, path: &Path, dims: Dimensions) -> Result<Vec<u8>> {
    let image = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read image {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());

    let service = HttpDecompositionService::new(&config.service)?;
    info!(endpoint = service.endpoint(), file = %file_name, "Sending image for decomposition");

    let payload = service
        .decompose(image, file_name, dims)
        .await
        .context("Decomposition service request failed")?;
    Ok(payload.to_vec())
}

async fn run(orchestrator: &mut Orchestrator, payload: &[u8], dims: Dimensions, args: &Args) -> Result<()> {
    let image_id = orchestrator
        .upload(payload, dims.width, dims.height)
        .await
        .context("Failed to upload factor payload")?;
    info!(%image_id, "Payload uploaded");

    // Full rank first so every later frame has a reference for MSE/PSNR
    let mut frames = vec![orchestrator
        .reconstruct(dims.full_rank())
        .await
        .context("Full-rank reconstruction failed")?];

    for &rank in &args.ranks {
        if rank == 0 || rank > dims.full_rank() {
            warn!(rank, full_rank = dims.full_rank(), "Rank out of range, clamping");
        }
        let frame = orchestrator
            .reconstruct(rank)
            .await
            .with_context(|| format!("Reconstruction at rank {} failed", rank))?;
        frames.push(frame);
    }

    let reports: Vec<FrameReport> = frames.iter().map(FrameReport::from).collect();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            println!("{}", format_report(&report.metrics));
        }
    }

    if let (Some(path), Some(last)) = (&args.output, frames.last()) {
        write_png(path, last)?;
        info!(path = %path.display(), rank = last.rank, "Wrote PNG");
    }

    Ok(())
}

fn format_report(metrics: &Metrics) -> String {
    let psnr = match metrics.psnr {
        Some(db) if db.is_infinite() => "inf".to_string(),
        Some(db) => format!("{:.2} dB", db),
        None => "n/a".to_string(),
    };
    format!(
        "rank {:>5}/{:<5} frobenius {:>12.3}  energy {:>7.3}%  ratio {:>8.2}x  psnr {}",
        metrics.rank,
        metrics.full_rank,
        metrics.frobenius_error,
        metrics.energy_retained * 100.0,
        metrics.compression_ratio,
        psnr
    )
}

fn write_png(path: &Path, frame: &Rendered) -> Result<()> {
    let width = u32::try_from(frame.image.width()).context("Image too wide for PNG")?;
    let height = u32::try_from(frame.image.height()).context("Image too tall for PNG")?;

    let buffer = image::RgbaImage::from_raw(width, height, frame.image.as_rgba().to_vec())
        .context("RGBA buffer does not match image dimensions")?;
    buffer
        .save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
