// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand, ValueEnum};
use prescreen_capture::Config;
use prescreen_capture::backends::camera::{CaptureBackendType, DevicePosition};
use prescreen_capture::constants::SessionPreset;
use prescreen_capture::pipeline::{Rect, VideoGravity};
use prescreen_capture::reporter::ReportFormat;
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "prescreen")]
#[command(about = "Live camera capture for ID-card prescreening")]
#[command(version = env!("GIT_VERSION"))]
struct Cli {
    /// Capture backend (overrides the config file)
    #[arg(short, long, global = true)]
    backend: Option<BackendArg>,

    /// Config file (default: ~/.config/prescreen-capture/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available capture devices
    List,

    /// Run the capture pipeline and print scan results
    Scan {
        /// Camera to use instead of the default (back) camera
        #[arg(short, long)]
        position: Option<PositionArg>,

        /// Capture resolution
        #[arg(short = 'r', long)]
        preset: Option<PresetArg>,

        /// Analyzer API key (default: $PRESCREEN_API_KEY or the config file)
        #[arg(long)]
        api_key: Option<String>,

        /// Minimum confidence for a result to be printed
        #[arg(short, long)]
        threshold: Option<f32>,

        /// Print every result as a JSON line
        #[arg(long)]
        json: bool,

        /// Stop after this many frames were analyzed
        #[arg(short, long)]
        frames: Option<u64>,

        /// Stop after this many seconds
        #[arg(short, long)]
        duration: Option<u64>,

        /// Do not follow the orientation sensor
        #[arg(long)]
        no_sensor: bool,
    },

    /// Print preview geometry as the device orientation changes
    Orientation {
        /// Preview width
        #[arg(long, default_value = "720")]
        width: f32,

        /// Preview height
        #[arg(long, default_value = "1280")]
        height: f32,

        /// Preview scaling mode (default from the config file)
        #[arg(short, long)]
        gravity: Option<GravityArg>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendArg {
    V4l2,
    Virtual,
}

impl From<BackendArg> for CaptureBackendType {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::V4l2 => CaptureBackendType::V4l2,
            BackendArg::Virtual => CaptureBackendType::Virtual,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum PositionArg {
    Back,
    Front,
}

impl From<PositionArg> for DevicePosition {
    fn from(arg: PositionArg) -> Self {
        match arg {
            PositionArg::Back => DevicePosition::Back,
            PositionArg::Front => DevicePosition::Front,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum PresetArg {
    Vga,
    #[value(name = "720p")]
    Hd720,
    #[value(name = "1080p")]
    Hd1080,
}

impl From<PresetArg> for SessionPreset {
    fn from(arg: PresetArg) -> Self {
        match arg {
            PresetArg::Vga => SessionPreset::Vga640x480,
            PresetArg::Hd720 => SessionPreset::Hd1280x720,
            PresetArg::Hd1080 => SessionPreset::Hd1920x1080,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum GravityArg {
    Aspect,
    Fill,
    Stretch,
}

impl From<GravityArg> for VideoGravity {
    fn from(arg: GravityArg) -> Self {
        match arg {
            GravityArg::Aspect => VideoGravity::ResizeAspect,
            GravityArg::Fill => VideoGravity::ResizeAspectFill,
            GravityArg::Stretch => VideoGravity::Resize,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=prescreen_capture=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(backend) = cli.backend {
        config.backend = backend.into();
    }

    match cli.command {
        Commands::List => cli::list_devices(config.backend),
        Commands::Scan {
            position,
            preset,
            api_key,
            threshold,
            json,
            frames,
            duration,
            no_sensor,
        } => {
            if let Some(position) = position {
                config.preferred_position = Some(position.into());
            }
            if let Some(preset) = preset {
                config.preset = preset.into();
            }
            if let Some(threshold) = threshold {
                config.confidence_threshold = threshold.clamp(0.0, 1.0);
            }
            if no_sensor {
                config.orientation_sensor = false;
            }
            let format = if json {
                ReportFormat::Json
            } else {
                ReportFormat::Text
            };
            cli::scan(&config, api_key.as_deref(), format, frames, duration)
        }
        Commands::Orientation {
            width,
            height,
            gravity,
        } => {
            let gravity = gravity.map(Into::into).unwrap_or(config.video_gravity);
            cli::watch_orientation(gravity, Rect::new(0.0, 0.0, width, height))
        }
    }
}
