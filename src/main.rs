use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use nest_timelapse::capture::{CaptureError, PeerSession, WebRtcPeerSession};
use nest_timelapse::config::AppConfig;
use nest_timelapse::encoder::{AssembleRequest, Crop, CropRange, FfmpegEncoder};
use nest_timelapse::pipeline::{self, CaptureRequest, TimelapseRequest};
use nest_timelapse::sdm::{DeviceDirectory, OAuthTokenProvider, SdmClient};
use nest_timelapse::timeexpr::{self, parse_speedup};

#[derive(Parser)]
#[command(name = "nest-timelapse")]
#[command(about = "Capture Nest camera stills over WebRTC and turn them into timelapse videos")]
#[command(version)]
struct Cli {
    /// Configuration file (default: <config dir>/nest-timelapse/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a few seconds from the first camera and save one still
    Capture {
        /// Device Access project (enterprise) id
        #[arg(long, env = "NEST_ENTERPRISE_ID")]
        enterprise_id: Option<String>,

        /// Root of the YYYY/MM/DD image tree
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Assemble captured stills into a video
    Timelapse {
        /// Directory to scan for stills (default: current directory)
        input_dir: Option<PathBuf>,

        /// Speedup ratio, e.g. '1h/1m' (1 hour = 1 minute) or '1d/30s'
        #[arg(short, long)]
        speedup: Option<String>,

        /// Output video file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite the output file if it exists
        #[arg(short = 'y', long = "overwrite")]
        overwrite: bool,

        /// Crop horizontally using width ratios (e.g. '0.4-0.6')
        #[arg(long)]
        crop_x: Option<String>,

        /// Crop vertically using height ratios (e.g. '0.4-0.6')
        #[arg(long)]
        crop_y: Option<String>,

        /// Start time (HH:MM or YYYY-MM-DD HH:MM)
        #[arg(long, default_value = "")]
        start_time: String,

        /// End time (HH:MM or YYYY-MM-DD HH:MM)
        #[arg(long, default_value = "")]
        end_time: String,

        /// Duration (e.g. '1d6h30m', '2d', '6h30m')
        #[arg(long, default_value = "")]
        duration: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG overrides the default level, e.g. RUST_LOG=nest_timelapse=debug
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Capture {
            enterprise_id,
            output_dir,
        } => run_capture(&config, enterprise_id, output_dir).await,
        Commands::Timelapse {
            input_dir,
            speedup,
            output,
            overwrite,
            crop_x,
            crop_y,
            start_time,
            end_time,
            duration,
        } => {
            let crop = Crop {
                x: crop_x.map(|v| CropRange::parse("x", &v)).transpose()?,
                y: crop_y.map(|v| CropRange::parse("y", &v)).transpose()?,
            };
            let speedup = match speedup {
                Some(value) => parse_speedup(&value),
                None => config.timelapse.speedup_ratio(),
            }
            .context("Invalid speedup ratio")?;

            // Without flags this is [beginning of time, now]
            let interval = timeexpr::parse_interval(&start_time, &end_time, &duration)
                .context("Invalid time range")?;

            let input_dir = std::path::absolute(input_dir.unwrap_or_else(|| PathBuf::from(".")))
                .context("Invalid input directory")?;
            let request = TimelapseRequest {
                input_dir,
                naming: config.timelapse.artifact_name(),
                speedup,
                interval: Some(interval),
                max_output_rate: config.timelapse.max_output_rate,
                output: AssembleRequest {
                    output: output.unwrap_or_else(|| config.timelapse.output_file.clone()),
                    overwrite,
                    crop,
                },
            };
            run_timelapse(request).await
        }
    }
}

async fn run_capture(
    config: &AppConfig,
    enterprise_id: Option<String>,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let enterprise_id = enterprise_id
        .or_else(|| config.sdm.enterprise_id.clone())
        .context("Enterprise ID is required (--enterprise-id or sdm.enterprise_id)")?;

    let tokens = OAuthTokenProvider::new(&config.paths.credentials_file, &config.paths.token_file)
        .context("Failed to get credentials")?;
    let directory: Arc<dyn DeviceDirectory> = Arc::new(SdmClient::with_api_base(
        Arc::new(tokens),
        config.sdm.api_base.clone(),
    ));

    let encoder = FfmpegEncoder::default();
    encoder.check_installed().await?;

    let request = CaptureRequest {
        enterprise_id,
        output_dir: output_dir.unwrap_or_else(|| config.paths.output_dir.clone()),
        naming: config.timelapse.artifact_name(),
        capture: config.capture.to_capture_config(),
    };
    let peer_config = config.capture.to_peer_config();

    let report = pipeline::capture_snapshot(
        directory,
        || async move {
            let (peer, tracks) = WebRtcPeerSession::connect(&peer_config).await?;
            Ok::<_, CaptureError>((Arc::new(peer) as Arc<dyn PeerSession>, tracks))
        },
        &encoder,
        &request,
    )
    .await?;

    println!("Saved {}", report.image.display());
    Ok(())
}

async fn run_timelapse(request: TimelapseRequest) -> Result<()> {
    let encoder = FfmpegEncoder::default();
    encoder.check_installed().await?;
    pipeline::check_input_dir(&request.input_dir)?;

    let frames = pipeline::build_timelapse(&encoder, &request).await?;
    println!(
        "Timelapse generated: {} ({} frames)",
        request.output.output.display(),
        frames
    );
    Ok(())
}
