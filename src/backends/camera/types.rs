// SPDX-License-Identifier: GPL-3.0-only
// Shared types for capture backend abstraction

//! Shared types for capture backends

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Capture backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CaptureBackendType {
    /// Video4Linux2 capture devices (Linux)
    #[default]
    V4l2,
    /// Synthetic frames, no hardware required
    Virtual,
}

impl std::fmt::Display for CaptureBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureBackendType::V4l2 => write!(f, "V4L2"),
            CaptureBackendType::Virtual => write!(f, "virtual"),
        }
    }
}

/// Physical position of a camera on the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DevicePosition {
    /// Facing the user (selfie camera)
    Front,
    /// Facing away from the user
    Back,
    /// Position not reported (external webcams, most desktop devices)
    #[default]
    Unspecified,
}

impl std::fmt::Display for DevicePosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DevicePosition::Front => write!(f, "front"),
            DevicePosition::Back => write!(f, "back"),
            DevicePosition::Unspecified => write!(f, "unspecified"),
        }
    }
}

/// Lens / sensor class of a capture device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceClass {
    #[default]
    WideAngle,
    Telephoto,
    UltraWide,
    /// IR / depth sensors; never used for document capture
    Infrared,
}

impl DeviceClass {
    /// Classes the registry offers for document capture
    pub const CAPTURE_CLASSES: [DeviceClass; 2] = [DeviceClass::WideAngle, DeviceClass::Telephoto];

    pub fn is_capture_class(&self) -> bool {
        Self::CAPTURE_CLASSES.contains(self)
    }
}

impl std::fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceClass::WideAngle => write!(f, "wide-angle"),
            DeviceClass::Telephoto => write!(f, "telephoto"),
            DeviceClass::UltraWide => write!(f, "ultra-wide"),
            DeviceClass::Infrared => write!(f, "infrared"),
        }
    }
}

/// Represents a capture device
///
/// Immutable snapshot taken at enumeration time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureDevice {
    /// Stable identifier (bus info or backend-assigned id)
    pub id: String,
    /// Human readable name (V4L2 card name)
    pub name: String,
    /// Backend node used to open the device (e.g. /dev/video0)
    pub path: String,
    pub position: DevicePosition,
    pub class: DeviceClass,
}

impl std::fmt::Display for CaptureDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}, {})", self.name, self.position, self.class)
    }
}

/// Frame resolution in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_landscape(&self) -> bool {
        self.width >= self.height
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Pixel format for captured frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// YUYV - Packed 4:2:2, the usual raw webcam format
    Yuyv,
    /// Motion JPEG, one compressed image per buffer
    Mjpeg,
    /// NV12 - Semi-planar 4:2:0
    Nv12,
    /// RGB24 - 3 bytes per pixel
    Rgb24,
    /// RGBA - 4 bytes per pixel
    Rgba,
    /// Gray8 - single 8-bit channel
    Gray8,
    /// Anything else, kept as its FourCC
    Other([u8; 4]),
}

impl PixelFormat {
    /// Parse a V4L2 four-character code
    pub fn from_fourcc(code: &[u8; 4]) -> Self {
        match code {
            b"YUYV" => Self::Yuyv,
            b"MJPG" => Self::Mjpeg,
            b"NV12" => Self::Nv12,
            b"RGB3" => Self::Rgb24,
            b"AB24" | b"RGBA" => Self::Rgba,
            b"GREY" => Self::Gray8,
            other => Self::Other(*other),
        }
    }

    pub fn fourcc(&self) -> [u8; 4] {
        match self {
            Self::Yuyv => *b"YUYV",
            Self::Mjpeg => *b"MJPG",
            Self::Nv12 => *b"NV12",
            Self::Rgb24 => *b"RGB3",
            Self::Rgba => *b"AB24",
            Self::Gray8 => *b"GREY",
            Self::Other(code) => *code,
        }
    }

    /// Average bytes per pixel; `None` for compressed formats
    pub fn bytes_per_pixel(&self) -> Option<f32> {
        match self {
            Self::Rgba => Some(4.0),
            Self::Rgb24 => Some(3.0),
            Self::Yuyv => Some(2.0),
            Self::Nv12 => Some(1.5), // 4:2:0 subsampling
            Self::Gray8 => Some(1.0),
            Self::Mjpeg | Self::Other(_) => None,
        }
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code = self.fourcc();
        write!(f, "{}", String::from_utf8_lossy(&code))
    }
}

/// Negotiated capture format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureFormat {
    pub resolution: Resolution,
    pub pixel_format: PixelFormat,
}

impl std::fmt::Display for CaptureFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.resolution, self.pixel_format)
    }
}

/// A single frame from the capture stage, before orientation tagging
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    /// Monotonic counter assigned by the capture stage
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
    /// Row stride in bytes (0 for compressed formats)
    pub stride: u32,
    pub format: PixelFormat,
    pub data: Arc<[u8]>,
    /// Timestamp when frame was captured
    pub captured_at: Instant,
    /// Position of the device the frame came from
    pub position: DevicePosition,
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for backend operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Device node does not exist (unplugged)
    DeviceNotFound(String),
    /// Device is held by another process
    Busy(String),
    /// Access to the device node was denied
    PermissionDenied(String),
    /// General I/O error
    IoError(String),
}

impl BackendError {
    /// Classify an I/O error raised while opening or streaming a device node
    pub fn from_io(path: &str, err: &std::io::Error) -> Self {
        match err.raw_os_error() {
            Some(libc::EBUSY) => BackendError::Busy(path.to_string()),
            Some(libc::EACCES) | Some(libc::EPERM) => {
                BackendError::PermissionDenied(path.to_string())
            }
            Some(libc::ENOENT) | Some(libc::ENODEV) | Some(libc::ENXIO) => {
                BackendError::DeviceNotFound(path.to_string())
            }
            _ => BackendError::IoError(format!("{}: {}", path, err)),
        }
    }
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::Busy(msg) => write!(f, "Device busy: {}", msg),
            BackendError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),
            BackendError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fourcc_round_trips_known_formats() {
        assert_eq!(PixelFormat::from_fourcc(b"YUYV"), PixelFormat::Yuyv);
        assert_eq!(PixelFormat::from_fourcc(b"MJPG"), PixelFormat::Mjpeg);
        assert_eq!(
            PixelFormat::from_fourcc(b"Y10B"),
            PixelFormat::Other(*b"Y10B")
        );
        assert_eq!(PixelFormat::Other(*b"Y10B").to_string(), "Y10B");
    }

    #[test]
    fn io_errors_are_classified() {
        let busy = std::io::Error::from_raw_os_error(libc::EBUSY);
        assert_eq!(
            BackendError::from_io("/dev/video0", &busy),
            BackendError::Busy("/dev/video0".to_string())
        );
        let denied = std::io::Error::from_raw_os_error(libc::EACCES);
        assert!(matches!(
            BackendError::from_io("/dev/video0", &denied),
            BackendError::PermissionDenied(_)
        ));
    }
}
