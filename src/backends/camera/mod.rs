// SPDX-License-Identifier: GPL-3.0-only

//! Capture backend abstraction
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │   CaptureSession    │  ← Lifecycle, output sink
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │ CaptureBackend Trait│  ← Enumeration, opening inputs
//! └──────────┬──────────┘
//!            │
//!       ┌────┴─────┐
//!       ▼          ▼
//!   ┌──────┐  ┌─────────┐
//!   │ V4L2 │  │ Virtual │
//!   └──────┘  └─────────┘
//! ```
//!
//! A backend hands out [`CaptureInput`]s. An input holds the device open
//! (the camera is an exclusive resource, released when the input is dropped)
//! and streams frames on the capture worker thread.

pub mod frame_loop;
pub mod registry;
pub mod types;
#[cfg(target_os = "linux")]
pub mod v4l2;
pub mod virtual_camera;

pub use frame_loop::{CaptureLoopController, LoopAction};
pub use registry::DeviceRegistry;
pub use types::*;

use std::sync::Arc;

/// Platform capture framework
///
/// Implementations must be cheap to share; the registry and the session
/// both hold an `Arc` to the same backend.
pub trait CaptureBackend: Send + Sync {
    /// Enumerate devices able to capture video, in platform order
    fn enumerate_devices(&self) -> BackendResult<Vec<CaptureDevice>>;

    /// Open a device for exclusive use and negotiate `resolution`
    ///
    /// The returned input holds the device until dropped.
    fn open(
        &self,
        device: &CaptureDevice,
        resolution: Resolution,
    ) -> BackendResult<Box<dyn CaptureInput>>;

    /// Get the backend type identifier
    fn backend_type(&self) -> CaptureBackendType;
}

/// An opened capture device
pub trait CaptureInput: Send {
    /// Format agreed with the device when it was opened
    fn format(&self) -> CaptureFormat;

    /// Stream frames into `sink` until it returns [`LoopAction::Stop`]
    ///
    /// `sink` receives `None` whenever no frame arrived within the poll
    /// interval, so the caller can check its stop signal. Runs on the
    /// capture worker thread; the device stays held for as long as the
    /// input lives.
    fn stream(&mut self, sink: &mut FrameSink<'_>) -> BackendResult<()>;
}

/// Callback fed by [`CaptureInput::stream`]
pub type FrameSink<'a> = dyn FnMut(Option<CapturedFrame>) -> LoopAction + 'a;

/// Get a concrete backend instance
pub fn get_backend_for_type(backend_type: CaptureBackendType) -> Arc<dyn CaptureBackend> {
    match backend_type {
        #[cfg(target_os = "linux")]
        CaptureBackendType::V4l2 => Arc::new(v4l2::V4l2Backend::new()),
        #[cfg(not(target_os = "linux"))]
        CaptureBackendType::V4l2 => {
            tracing::warn!("V4L2 is only available on Linux, using virtual backend");
            Arc::new(virtual_camera::VirtualBackend::default())
        }
        CaptureBackendType::Virtual => Arc::new(virtual_camera::VirtualBackend::default()),
    }
}
