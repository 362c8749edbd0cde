// SPDX-License-Identifier: GPL-3.0-only

//! Boundary to the ID-card analyzer
//!
//! The analyzer is an external engine. The pipeline hands it one
//! [`FrameHandle`] at a time through [`Analyzer::scan`] and forwards the
//! returned [`ScanResult`] to a [`ResultHandler`] without looking inside.

mod stub;

pub use stub::StubAnalyzer;

use crate::backends::camera::{CapturedFrame, DevicePosition, PixelFormat};
use crate::pipeline::orientation::VideoOrientation;
use serde::Serialize;
use std::fmt;
use std::time::Instant;

/// One captured frame on its way to the analyzer
///
/// Owned by the dispatcher for one cycle and only lent to the analyzer, so
/// the analyzer cannot keep it past `scan`. Deliberately not `Clone`.
#[derive(Debug)]
pub struct FrameHandle {
    frame: CapturedFrame,
    orientation: VideoOrientation,
}

impl FrameHandle {
    /// Tag a captured frame with the orientation current at dispatch time
    pub fn new(frame: CapturedFrame, orientation: VideoOrientation) -> Self {
        Self { frame, orientation }
    }

    pub fn data(&self) -> &[u8] {
        &self.frame.data
    }

    pub fn width(&self) -> u32 {
        self.frame.width
    }

    pub fn height(&self) -> u32 {
        self.frame.height
    }

    pub fn stride(&self) -> u32 {
        self.frame.stride
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.frame.format
    }

    pub fn sequence(&self) -> u64 {
        self.frame.sequence
    }

    pub fn captured_at(&self) -> Instant {
        self.frame.captured_at
    }

    pub fn orientation(&self) -> VideoOrientation {
        self.orientation
    }

    /// Position of the camera the frame came from
    pub fn position(&self) -> DevicePosition {
        self.frame.position
    }
}

/// Error reported by the analyzer inside a [`ScanResult`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "kebab-case")]
pub enum AnalyzerError {
    /// `scan` called before `initialize`
    NotInitialized,
    /// The API key was rejected
    InvalidApiKey,
    /// Frame layout the engine cannot read
    UnsupportedFrame(String),
    /// Anything else raised by the engine
    Engine(String),
}

impl fmt::Display for AnalyzerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalyzerError::NotInitialized => write!(f, "Analyzer not initialized"),
            AnalyzerError::InvalidApiKey => write!(f, "Invalid API key"),
            AnalyzerError::UnsupportedFrame(msg) => write!(f, "Unsupported frame: {}", msg),
            AnalyzerError::Engine(msg) => write!(f, "Analyzer error: {}", msg),
        }
    }
}

impl std::error::Error for AnalyzerError {}

/// Card classification produced once a full front side is in view
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub ml_confidence: Option<f32>,
    pub error: Option<AnalyzerError>,
}

/// Per-frame analyzer output, passed through untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScanResult {
    /// In [0, 1]
    pub confidence: f32,
    pub error: Option<AnalyzerError>,
    pub is_front_side: Option<bool>,
    pub is_front_card_full: Option<bool>,
    pub extracted_text: Option<Vec<String>>,
    pub classification: Option<ClassificationResult>,
}

impl ScanResult {
    /// A result carrying only an error
    pub fn from_error(error: AnalyzerError) -> Self {
        Self {
            error: Some(error),
            ..Default::default()
        }
    }
}

/// ID-card analyzer consumed by the frame dispatcher
pub trait Analyzer: Send {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Called once before the first `scan`
    fn initialize(&mut self, api_key: &str) -> Result<(), AnalyzerError>;

    /// Analyze one frame; blocks the delivery thread until done
    fn scan(&mut self, frame: &FrameHandle) -> ScanResult;
}

/// Receives every scan result on the delivery thread
///
/// Runs on the thread that throttles capture, so it must return quickly.
pub trait ResultHandler: Send {
    fn on_result(&mut self, result: ScanResult);
}

impl<F> ResultHandler for F
where
    F: FnMut(ScanResult) + Send,
{
    fn on_result(&mut self, result: ScanResult) {
        self(result)
    }
}
