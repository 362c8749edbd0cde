// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! This module provides command-line functionality for:
//! - Listing capture devices
//! - Running the capture pipeline against the analyzer
//! - Following the orientation sensor

use prescreen_capture::backends::camera::{CaptureBackendType, DeviceRegistry};
use prescreen_capture::backends::orientation_sensor::OrientationSensor;
use prescreen_capture::constants::TARGET_RESOLUTION;
use prescreen_capture::errors::{AppError, ConfigurationError};
use prescreen_capture::pipeline::{
    OrientationCell, PreviewGeometryController, PreviewSurface, Rect, VideoGravity,
    VideoOrientation,
};
use prescreen_capture::reporter::{ConsoleReporter, ReportFormat};
use prescreen_capture::{CapturePipeline, Config, PipelineOptions, StubAnalyzer};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{info, warn};

/// List all usable capture devices
pub fn list_devices(backend: CaptureBackendType) -> Result<(), Box<dyn std::error::Error>> {
    let registry = DeviceRegistry::for_type(backend);

    let devices = match registry.list_devices() {
        Ok(devices) => devices,
        Err(ConfigurationError::NoDevices) => {
            println!("No capture devices found.");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    let default = DeviceRegistry::select_default(&devices)?;

    println!("Available capture devices ({}):", backend);
    println!();
    for (index, device) in devices.iter().enumerate() {
        let marker = if device.id == default.id {
            " (default)"
        } else {
            ""
        };
        println!("  [{}] {}{}", index, device.name, marker);
        println!("      Position: {}, class: {}", device.position, device.class);
        println!("      Path: {}", device.path);
        println!();
    }

    Ok(())
}

/// Run the pipeline until Ctrl+C, a frame limit or a time limit
///
/// `api_key` from the command line takes precedence over the environment
/// and the config file.
pub fn scan(
    config: &Config,
    api_key: Option<&str>,
    format: ReportFormat,
    frames: Option<u64>,
    duration: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let api_key = config.api_key_with(api_key).ok_or_else(|| {
        AppError::Config(format!(
            "No API key: pass --api-key, set {} or api_key in the config file",
            prescreen_capture::constants::API_KEY_ENV
        ))
    })?;

    let registry = DeviceRegistry::for_type(config.backend);
    let reporter = ConsoleReporter::stdout(format, config.confidence_threshold);
    let options = PipelineOptions {
        preferred_position: config.preferred_position,
        resolution: config.resolution(),
        ..PipelineOptions::new(api_key)
    };

    let mut pipeline =
        CapturePipeline::start(&registry, Box::new(StubAnalyzer::new()), reporter, options)?;

    // Status goes to stderr so --json output stays machine readable
    if let (Some(device), Some(format)) = (pipeline.session().device(), pipeline.session().format())
    {
        eprintln!("Scanning with {} at {}", device, format);
    }
    eprintln!("Press Ctrl+C to stop");

    let mut watcher = if config.orientation_sensor {
        Some(OrientationWatcher::spawn(pipeline.orientation().clone()))
    } else {
        None
    };

    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_clone = stop_flag.clone();
    ctrlc::set_handler(move || {
        stop_flag_clone.store(true, Ordering::SeqCst);
    })?;

    let start = Instant::now();
    let time_limit = duration.map(Duration::from_secs);
    loop {
        if stop_flag.load(Ordering::SeqCst) {
            eprintln!();
            eprintln!("Stopping...");
            break;
        }
        if time_limit.is_some_and(|limit| start.elapsed() >= limit) {
            break;
        }
        if frames.is_some_and(|limit| pipeline.stats().delivered >= limit) {
            break;
        }
        if !pipeline.session().is_capturing() {
            warn!("Capture worker exited, stopping");
            break;
        }
        std::thread::sleep(Duration::from_millis(100));
    }

    if let Some(watcher) = watcher.as_mut() {
        watcher.stop();
    }
    let stats = pipeline.shutdown();
    eprintln!(
        "Analyzed {} frames ({} superseded, {} discarded) in {:.1}s",
        stats.delivered,
        stats.superseded,
        stats.discarded,
        start.elapsed().as_secs_f32()
    );

    Ok(())
}

/// Follows iio-sensor-proxy on its own thread and feeds an orientation cell
struct OrientationWatcher {
    stop: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl OrientationWatcher {
    fn spawn(cell: OrientationCell) -> Self {
        let (stop_tx, stop_rx) = oneshot::channel();

        let handle = std::thread::spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    warn!(error = %e, "Could not start orientation runtime");
                    return;
                }
            };

            let result: Result<(), AppError> = runtime.block_on(async move {
                let sensor = OrientationSensor::connect().await?;
                let watched = tokio::select! {
                    result = sensor.watch(|reading| {
                        let orientation = cell.apply(reading);
                        info!(?reading, %orientation, "Orientation updated");
                    }) => result,
                    _ = stop_rx => Ok(()),
                };
                sensor.release().await?;
                watched
            });

            if let Err(e) = result {
                warn!(error = %e, "Orientation sensor unavailable, keeping portrait");
            }
        });

        Self {
            stop: Some(stop_tx),
            handle: Some(handle),
        }
    }

    fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Orientation watcher panicked");
            }
        }
    }
}

/// Preview surface that only remembers what it was told
#[derive(Debug, Default)]
struct ConsoleSurface {
    frame: Rect,
    orientation: VideoOrientation,
}

impl PreviewSurface for ConsoleSurface {
    fn set_frame(&mut self, frame: Rect) {
        self.frame = frame;
    }

    fn set_gravity(&mut self, _gravity: VideoGravity) {}

    fn supports_video_orientation(&self) -> bool {
        true
    }

    fn set_video_orientation(&mut self, orientation: VideoOrientation) {
        self.orientation = orientation;
    }
}

/// Print preview geometry for every orientation change until Ctrl+C
pub fn watch_orientation(
    gravity: VideoGravity,
    bounds: Rect,
) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Runtime::new()?;

    let result: Result<(), AppError> = runtime.block_on(async {
        let sensor = OrientationSensor::connect().await?;
        let mut controller =
            PreviewGeometryController::new(ConsoleSurface::default(), OrientationCell::default(), gravity);
        controller.on_layout(bounds);

        let frame = controller.surface().frame;
        println!(
            "Preview {:.0}x{:.0}, {:?}. Press Ctrl+C to stop.",
            frame.width, frame.height, gravity
        );

        let watched = tokio::select! {
            result = sensor.watch(|reading| {
                controller.on_orientation_changed(reading);
                let video = controller.video_rect(TARGET_RESOLUTION);
                println!(
                    "{:?} -> {}: video {:.0}x{:.0} at ({:.0}, {:.0})",
                    reading,
                    controller.surface().orientation,
                    video.width,
                    video.height,
                    video.x,
                    video.y
                );
            }) => result,
            _ = tokio::signal::ctrl_c() => Ok(()),
        };

        sensor.release().await?;
        watched
    });

    Ok(result?)
}
