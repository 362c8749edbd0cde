// SPDX-License-Identifier: GPL-3.0-only

//! Prescreen capture - live camera capture for an ID-card analyzer
//!
//! Captures frames from a camera, keeps preview geometry in step with the
//! device orientation, and feeds frames to an analyzer one at a time,
//! dropping the frames it cannot keep up with.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`backends`]: Capture devices (V4L2, virtual) and the orientation sensor
//! - [`pipeline`]: Capture session, frame delivery and dispatch, preview geometry
//! - [`analyzer`]: Boundary to the external analyzer
//! - [`config`]: User configuration handling
//! - [`reporter`]: Console output for scan results
//!
//! # Example
//!
//! ```ignore
//! let registry = DeviceRegistry::for_type(CaptureBackendType::V4l2);
//! let pipeline = CapturePipeline::start(
//!     &registry,
//!     Box::new(StubAnalyzer::new()),
//!     |result: ScanResult| println!("{:.2}", result.confidence),
//!     PipelineOptions::new(api_key),
//! )?;
//! ```

pub mod analyzer;
pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod pipeline;
pub mod reporter;

// Re-export commonly used types
pub use analyzer::{Analyzer, FrameHandle, ResultHandler, ScanResult, StubAnalyzer};
pub use backends::camera::{CaptureBackendType, CaptureDevice, DevicePosition, DeviceRegistry};
pub use config::Config;
pub use errors::{AppError, AppResult, ConfigurationError};
pub use pipeline::{CapturePipeline, PipelineOptions};
