// SPDX-License-Identifier: GPL-3.0-only

//! Device orientation to video orientation mapping
//!
//! The capture sensor and the display are mirrored relative to each other
//! along the landscape axis, so a device held landscape-left produces
//! landscape-right video and vice versa. Portrait upside down is passed
//! through unchanged.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// Raw physical orientation reported by the device's motion sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrientationReading {
    Portrait,
    PortraitUpsideDown,
    LandscapeLeft,
    LandscapeRight,
    FaceUp,
    FaceDown,
    Unknown,
}

impl OrientationReading {
    pub const ALL: [OrientationReading; 7] = [
        OrientationReading::Portrait,
        OrientationReading::PortraitUpsideDown,
        OrientationReading::LandscapeLeft,
        OrientationReading::LandscapeRight,
        OrientationReading::FaceUp,
        OrientationReading::FaceDown,
        OrientationReading::Unknown,
    ];

    /// Parse an iio-sensor-proxy `AccelerometerOrientation` value
    ///
    /// iio-sensor-proxy names the edge that points up; "right-up" is the
    /// device turned counter-clockwise, i.e. landscape left.
    pub fn from_sensor_proxy(value: &str) -> Self {
        match value {
            "normal" => OrientationReading::Portrait,
            "bottom-up" => OrientationReading::PortraitUpsideDown,
            "right-up" => OrientationReading::LandscapeLeft,
            "left-up" => OrientationReading::LandscapeRight,
            _ => OrientationReading::Unknown,
        }
    }
}

/// Orientation convention consumed by the preview surface and the analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u8)]
pub enum VideoOrientation {
    #[default]
    Portrait = 0,
    PortraitUpsideDown = 1,
    LandscapeLeft = 2,
    LandscapeRight = 3,
}

impl VideoOrientation {
    pub const ALL: [VideoOrientation; 4] = [
        VideoOrientation::Portrait,
        VideoOrientation::PortraitUpsideDown,
        VideoOrientation::LandscapeLeft,
        VideoOrientation::LandscapeRight,
    ];

    /// True when video frames are displayed wider than tall
    pub fn is_landscape(&self) -> bool {
        matches!(
            self,
            VideoOrientation::LandscapeLeft | VideoOrientation::LandscapeRight
        )
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => VideoOrientation::PortraitUpsideDown,
            2 => VideoOrientation::LandscapeLeft,
            3 => VideoOrientation::LandscapeRight,
            _ => VideoOrientation::Portrait,
        }
    }
}

impl std::fmt::Display for VideoOrientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VideoOrientation::Portrait => write!(f, "portrait"),
            VideoOrientation::PortraitUpsideDown => write!(f, "portrait-upside-down"),
            VideoOrientation::LandscapeLeft => write!(f, "landscape-left"),
            VideoOrientation::LandscapeRight => write!(f, "landscape-right"),
        }
    }
}

/// Map a physical reading to a video orientation
///
/// Flat and unknown readings carry no usable direction and keep `previous`.
pub fn map(reading: OrientationReading, previous: VideoOrientation) -> VideoOrientation {
    match reading {
        OrientationReading::Portrait => VideoOrientation::Portrait,
        OrientationReading::PortraitUpsideDown => VideoOrientation::PortraitUpsideDown,
        OrientationReading::LandscapeLeft => VideoOrientation::LandscapeRight,
        OrientationReading::LandscapeRight => VideoOrientation::LandscapeLeft,
        OrientationReading::FaceUp | OrientationReading::FaceDown | OrientationReading::Unknown => {
            previous
        }
    }
}

/// Shared current video orientation
///
/// One atomic location read by the delivery thread and the preview
/// controller and written from the control side. Clones share the location.
#[derive(Debug, Clone, Default)]
pub struct OrientationCell {
    value: Arc<AtomicU8>,
}

impl OrientationCell {
    pub fn new(initial: VideoOrientation) -> Self {
        Self {
            value: Arc::new(AtomicU8::new(initial as u8)),
        }
    }

    pub fn load(&self) -> VideoOrientation {
        VideoOrientation::from_u8(self.value.load(Ordering::SeqCst))
    }

    pub fn store(&self, orientation: VideoOrientation) {
        self.value.store(orientation as u8, Ordering::SeqCst);
    }

    /// Map `reading` against the current value and store the result
    pub fn apply(&self, reading: OrientationReading) -> VideoOrientation {
        let previous = self
            .value
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                Some(map(reading, VideoOrientation::from_u8(current)) as u8)
            })
            .unwrap_or_else(|current| current);
        map(reading, VideoOrientation::from_u8(previous))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_clones_share_location() {
        let cell = OrientationCell::default();
        let reader = cell.clone();
        assert_eq!(reader.load(), VideoOrientation::Portrait);

        cell.store(VideoOrientation::LandscapeLeft);
        assert_eq!(reader.load(), VideoOrientation::LandscapeLeft);
    }

    #[test]
    fn apply_keeps_value_on_flat_readings() {
        let cell = OrientationCell::new(VideoOrientation::LandscapeLeft);
        assert_eq!(
            cell.apply(OrientationReading::FaceUp),
            VideoOrientation::LandscapeLeft
        );
        assert_eq!(
            cell.apply(OrientationReading::LandscapeLeft),
            VideoOrientation::LandscapeRight
        );
        assert_eq!(cell.load(), VideoOrientation::LandscapeRight);
    }

    #[test]
    fn sensor_proxy_strings() {
        assert_eq!(
            OrientationReading::from_sensor_proxy("normal"),
            OrientationReading::Portrait
        );
        assert_eq!(
            OrientationReading::from_sensor_proxy("right-up"),
            OrientationReading::LandscapeLeft
        );
        assert_eq!(
            OrientationReading::from_sensor_proxy("undefined"),
            OrientationReading::Unknown
        );
    }
}
