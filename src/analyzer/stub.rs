// SPDX-License-Identifier: GPL-3.0-only

use super::{Analyzer, AnalyzerError, FrameHandle, ScanResult};
use crate::backends::camera::PixelFormat;
use tracing::debug;

/// Stand-in analyzer for running the pipeline without the real engine
///
/// Checks that it was initialized and that the frame is readable, then
/// reports zero confidence. Rejects empty API keys.
#[derive(Debug, Default)]
pub struct StubAnalyzer {
    initialized: bool,
    scanned: u64,
}

impl StubAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames scanned so far
    pub fn scanned(&self) -> u64 {
        self.scanned
    }

    fn check_frame(frame: &FrameHandle) -> Result<(), AnalyzerError> {
        if frame.data().is_empty() {
            return Err(AnalyzerError::UnsupportedFrame("empty buffer".to_string()));
        }
        if let Some(bpp) = frame.pixel_format().bytes_per_pixel() {
            let expected = (frame.width() as f32 * frame.height() as f32 * bpp) as usize;
            if frame.data().len() < expected {
                return Err(AnalyzerError::UnsupportedFrame(format!(
                    "{} bytes for {}x{} {}",
                    frame.data().len(),
                    frame.width(),
                    frame.height(),
                    frame.pixel_format()
                )));
            }
        } else if frame.pixel_format() != PixelFormat::Mjpeg {
            return Err(AnalyzerError::UnsupportedFrame(frame.pixel_format().to_string()));
        }
        Ok(())
    }
}

impl Analyzer for StubAnalyzer {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn initialize(&mut self, api_key: &str) -> Result<(), AnalyzerError> {
        if api_key.trim().is_empty() {
            return Err(AnalyzerError::InvalidApiKey);
        }
        self.initialized = true;
        debug!("Stub analyzer initialized");
        Ok(())
    }

    fn scan(&mut self, frame: &FrameHandle) -> ScanResult {
        if !self.initialized {
            return ScanResult::from_error(AnalyzerError::NotInitialized);
        }
        if let Err(e) = Self::check_frame(frame) {
            return ScanResult::from_error(e);
        }
        self.scanned += 1;
        ScanResult::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::{CapturedFrame, DevicePosition};
    use crate::pipeline::orientation::VideoOrientation;
    use std::sync::Arc;
    use std::time::Instant;

    fn handle(data: Vec<u8>, format: PixelFormat) -> FrameHandle {
        FrameHandle::new(
            CapturedFrame {
                sequence: 0,
                width: 4,
                height: 2,
                stride: 4,
                format,
                data: Arc::from(data),
                captured_at: Instant::now(),
                position: DevicePosition::Back,
            },
            VideoOrientation::Portrait,
        )
    }

    #[test]
    fn scan_before_initialize_reports_error() {
        let mut analyzer = StubAnalyzer::new();
        let result = analyzer.scan(&handle(vec![0; 8], PixelFormat::Gray8));
        assert_eq!(result.error, Some(AnalyzerError::NotInitialized));
        assert_eq!(analyzer.scanned(), 0);
    }

    #[test]
    fn empty_key_is_rejected() {
        let mut analyzer = StubAnalyzer::new();
        assert_eq!(analyzer.initialize("  "), Err(AnalyzerError::InvalidApiKey));
    }

    #[test]
    fn short_buffer_is_unsupported() {
        let mut analyzer = StubAnalyzer::new();
        analyzer.initialize("key").unwrap();

        let ok = analyzer.scan(&handle(vec![0; 8], PixelFormat::Gray8));
        assert!(ok.error.is_none());
        assert_eq!(ok.confidence, 0.0);

        let short = analyzer.scan(&handle(vec![0; 8], PixelFormat::Yuyv));
        assert!(matches!(short.error, Some(AnalyzerError::UnsupportedFrame(_))));
        assert_eq!(analyzer.scanned(), 1);
    }
}
