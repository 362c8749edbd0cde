// SPDX-License-Identifier: GPL-3.0-only

//! Pipeline-wide constants

use crate::backends::camera::Resolution;
use serde::{Deserialize, Serialize};

/// Capture resolution presets
///
/// The analyzer is tuned for 720p input; the other presets exist for
/// devices that cannot deliver it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionPreset {
    /// 640x480
    Vga640x480,
    /// 1280x720 (default)
    #[default]
    Hd1280x720,
    /// 1920x1080
    Hd1920x1080,
}

impl SessionPreset {
    /// Get all preset variants, lowest resolution first
    pub const ALL: [SessionPreset; 3] = [
        SessionPreset::Vga640x480,
        SessionPreset::Hd1280x720,
        SessionPreset::Hd1920x1080,
    ];

    /// Get display name for the preset
    pub fn display_name(&self) -> &'static str {
        match self {
            SessionPreset::Vga640x480 => "VGA",
            SessionPreset::Hd1280x720 => "720p",
            SessionPreset::Hd1920x1080 => "1080p",
        }
    }

    /// Resolution requested from the device
    pub const fn resolution(&self) -> Resolution {
        match self {
            SessionPreset::Vga640x480 => Resolution::new(640, 480),
            SessionPreset::Hd1280x720 => Resolution::new(1280, 720),
            SessionPreset::Hd1920x1080 => Resolution::new(1920, 1080),
        }
    }
}

/// Resolution the session asks for unless configured otherwise
pub const TARGET_RESOLUTION: Resolution = SessionPreset::Hd1280x720.resolution();

/// Results below this confidence are not reported by the console reporter
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Name of the serial thread that delivers frames to the analyzer
pub const DELIVERY_QUEUE_LABEL: &str = "frame-delivery";

/// Name of the thread that pulls frames from the device
pub const CAPTURE_WORKER_LABEL: &str = "capture-worker";

/// Environment variable consulted for the analyzer API key
pub const API_KEY_ENV: &str = "PRESCREEN_API_KEY";

/// Timing constants
pub mod timing {
    use std::time::Duration;

    /// Frame counter modulo for periodic logging
    pub const FRAME_LOG_INTERVAL: u64 = 30;

    /// How long a capture stream waits for a frame before re-checking its stop signal
    pub const CAPTURE_POLL_INTERVAL: Duration = Duration::from_millis(50);

    /// How long the delivery queue waits for a frame before re-checking its stop signal
    pub const DELIVERY_POLL_INTERVAL: Duration = Duration::from_millis(50);

    /// Frame rate of virtual test-pattern devices
    pub const VIRTUAL_FPS: u32 = 30;
}

/// D-Bus names of iio-sensor-proxy
pub mod sensor_proxy {
    pub const SERVICE: &str = "net.hadess.SensorProxy";
    pub const PATH: &str = "/net/hadess/SensorProxy";
    pub const INTERFACE: &str = "net.hadess.SensorProxy";
    pub const ORIENTATION_PROPERTY: &str = "AccelerometerOrientation";
    pub const HAS_ACCELEROMETER_PROPERTY: &str = "HasAccelerometer";
}
