use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tryon_client::{DetectionClient, DetectionRequest, RegionFlags};
use tryon_core::{render, Catalog, Compositor, Selection, Session, SourceImage, TryOnOutcome};
use tryon_hw::{Camera, ImageSource};

mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "tryon", about = "Virtual earring try-on", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the earrings available to try on
    Catalog,
    /// Photograph or upload an ear image and composite an earring onto it
    TryOn {
        /// Earring name as shown by `tryon catalog`
        #[arg(short, long)]
        earring: String,
        #[command(flatten)]
        source: SourceArgs,
        /// V4L2 device for --capture (overrides TRYON_CAMERA_DEVICE)
        #[arg(long, requires = "capture")]
        device: Option<String>,
        /// Also ask the service for neck landmarks
        #[arg(long)]
        neck: bool,
        /// Where to write the composite image
        #[arg(short, long)]
        out: PathBuf,
        /// Where to write the unmodified source image
        #[arg(long)]
        source_out: Option<PathBuf>,
    },
    /// Composite from a saved detection response, without calling the service
    Composite {
        /// Earring name as shown by `tryon catalog`
        #[arg(short, long)]
        earring: String,
        /// Ear image (jpg, jpeg or png)
        #[arg(long)]
        image: PathBuf,
        /// File holding the detection service response body
        #[arg(long)]
        response: PathBuf,
        /// Where to write the composite image
        #[arg(short, long)]
        out: PathBuf,
    },
    /// List camera devices
    Devices,
    /// Show resolved configuration
    Status,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct SourceArgs {
    /// Upload an existing image (jpg, jpeg or png)
    #[arg(long)]
    upload: Option<PathBuf>,
    /// Capture a still from the camera
    #[arg(long)]
    capture: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let env_path = std::env::current_dir()?.join(".env");
    match dotenvy::from_path(&env_path) {
        Ok(()) => tracing::debug!(path = %env_path.display(), "loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(path = %env_path.display(), error = %e, "ignoring unreadable .env"),
    }
    let config = Config::from_env()?;

    match cli.command {
        Commands::Catalog => {
            let catalog = config.catalog()?;
            print_catalog(&catalog, &config.asset_dir);
        }
        Commands::TryOn {
            earring,
            source,
            device,
            neck,
            out,
            source_out,
        } => {
            let source = match source.upload {
                Some(path) => ImageSource::Upload(path),
                None => ImageSource::Capture {
                    device: device.unwrap_or_else(|| config.camera_device.clone()),
                    warmup_frames: config.warmup_frames,
                },
            };
            let regions = RegionFlags { ear: true, neck };
            try_on(&config, &earring, &source, regions, &out, source_out.as_deref()).await?;
        }
        Commands::Composite {
            earring,
            image,
            response,
            out,
        } => {
            composite_offline(&config, &earring, &image, &response, &out)?;
        }
        Commands::Devices => {
            let devices = Camera::list_devices();
            if devices.is_empty() {
                println!("No capture devices found");
            }
            for dev in devices {
                println!("{}  {} ({}, {})", dev.path, dev.name, dev.driver, dev.bus);
            }
        }
        Commands::Status => {
            println!("{}", serde_json::to_string_pretty(&config.status_json())?);
        }
    }

    Ok(())
}

fn print_catalog(catalog: &Catalog, asset_dir: &Path) {
    for entry in catalog.entries() {
        match entry.load(asset_dir) {
            Ok(asset) => println!(
                "{:<12} {:<28} {}x{} {}",
                entry.name,
                entry.path.display(),
                asset.width(),
                asset.height(),
                if asset.is_circular() { "circular" } else { "elongated" }
            ),
            Err(e) => println!("{:<12} {:<28} unavailable: {e}", entry.name, entry.path.display()),
        }
    }
}

/// Fix the session to `earring` from the configured catalog.
fn select<'s>(session: &'s mut Session, config: &Config, earring: &str) -> Result<&'s Selection> {
    let catalog = config.catalog()?;
    let selection = session
        .select_from_catalog(&catalog, earring, &config.asset_dir)
        .with_context(|| format!("cannot try on {earring:?}"))?;
    println!("Selected earring: {}", selection.name);
    Ok(selection)
}

async fn try_on(
    config: &Config,
    earring: &str,
    source: &ImageSource,
    regions: RegionFlags,
    out: &Path,
    source_out: Option<&Path>,
) -> Result<()> {
    let mut session = Session::new();
    let selection = select(&mut session, config, earring)?;

    let acquired = source.acquire().context("failed to acquire ear image")?;
    let image = SourceImage::decode(&acquired.bytes).context("acquired image is unreadable")?;
    if let Some(path) = source_out {
        save(image.image(), path)?;
        println!("Source image written to {}", path.display());
    }

    let client = DetectionClient::new(config.client_config())?;
    let response = client
        .detect(DetectionRequest {
            image: acquired.bytes,
            file_name: acquired.file_name,
            mime: acquired.mime.to_string(),
            regions,
        })
        .await
        .context("detection request failed")?;
    println!("Time taken: {:.3}s", response.elapsed.as_secs_f64());

    let outcome = render(&image, &selection.asset, &response.body, &Compositor::new(config.scales));
    report(&outcome, out)
}

fn composite_offline(
    config: &Config,
    earring: &str,
    image: &Path,
    response: &Path,
    out: &Path,
) -> Result<()> {
    let mut session = Session::new();
    let selection = select(&mut session, config, earring)?;

    let acquired = ImageSource::Upload(image.to_path_buf()).acquire()?;
    let image = SourceImage::decode(&acquired.bytes).context("ear image is unreadable")?;
    let body = std::fs::read_to_string(response)
        .with_context(|| format!("failed to read {}", response.display()))?;

    let outcome = render(&image, &selection.asset, &body, &Compositor::new(config.scales));
    report(&outcome, out)
}

fn report(outcome: &TryOnOutcome, out: &Path) -> Result<()> {
    for notice in &outcome.notices {
        println!("warning: {notice}");
    }
    save(&outcome.image, out)?;
    println!(
        "Ear with earrings overlay written to {} ({} overlay(s), {} pixel(s))",
        out.display(),
        outcome.overlays,
        outcome.pixels_written
    );
    Ok(())
}

fn save(image: &image::RgbImage, path: &Path) -> Result<()> {
    image
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))
}
