// SPDX-License-Identifier: GPL-3.0-only

//! Capture-and-dispatch pipeline
//!
//! ```text
//! DeviceRegistry ─▶ CaptureSession ─▶ frame slot ─▶ DeliveryQueue ─▶ FrameDispatcher ─▶ Analyzer
//!                         (capture worker)   (cap. 1)    (serial thread)          │
//!                                                                                 ▼
//! orientation events ─▶ OrientationCell ──────────────────────────────────▶ ResultHandler
//!                             └─▶ PreviewGeometryController
//! ```
//!
//! [`CapturePipeline`] wires the pieces together the way a host view does:
//! pick the default camera, initialize the analyzer, configure and start.

pub mod delivery;
pub mod dispatcher;
pub mod frame_slot;
pub mod orientation;
pub mod preview;
pub mod session;

pub use delivery::DeliveryQueue;
pub use dispatcher::{DispatchOutcome, DispatchStats, FrameDispatcher};
pub use orientation::{OrientationCell, OrientationReading, VideoOrientation};
pub use preview::{PreviewGeometryController, PreviewSurface, Rect, VideoGravity};
pub use session::{CaptureSession, CaptureSessionState};

use crate::analyzer::{Analyzer, ResultHandler};
use crate::backends::camera::{CaptureDevice, DevicePosition, DeviceRegistry, Resolution};
use crate::constants::{DELIVERY_QUEUE_LABEL, TARGET_RESOLUTION};
use crate::errors::{AppError, AppResult, ConfigurationError};
use std::sync::Arc;
use tracing::info;

/// Settings for [`CapturePipeline::start`]
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub api_key: String,
    /// Camera to use instead of the default one, if present
    pub preferred_position: Option<DevicePosition>,
    pub resolution: Resolution,
}

impl PipelineOptions {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            preferred_position: None,
            resolution: TARGET_RESOLUTION,
        }
    }
}

/// A running capture session feeding an analyzer
pub struct CapturePipeline {
    devices: Vec<CaptureDevice>,
    /// Camera last selected, kept when opening it fails so the caller can retry
    device: CaptureDevice,
    orientation: OrientationCell,
    // Declared before the queue so the device is released first on drop
    session: CaptureSession,
    queue: DeliveryQueue,
}

impl CapturePipeline {
    /// Select a camera, initialize the analyzer and start capturing
    pub fn start(
        registry: &DeviceRegistry,
        analyzer: Box<dyn Analyzer>,
        handler: impl ResultHandler + 'static,
        options: PipelineOptions,
    ) -> AppResult<Self> {
        let devices = registry.list_devices()?;
        let device = match options
            .preferred_position
            .and_then(|position| DeviceRegistry::select(&devices, position))
        {
            Some(device) => device,
            None => DeviceRegistry::select_default(&devices)?,
        };

        let orientation = OrientationCell::default();
        let dispatcher = Arc::new(FrameDispatcher::new(analyzer, handler, orientation.clone()));
        dispatcher
            .initialize(&options.api_key)
            .map_err(AppError::Analyzer)?;

        let queue = DeliveryQueue::new(DELIVERY_QUEUE_LABEL, dispatcher);
        let mut session = CaptureSession::with_resolution(registry.backend(), options.resolution);
        session.configure(device.clone(), &queue)?;
        session.start()?;

        info!(
            device = ?session.device().map(|d| &d.name),
            devices = devices.len(),
            "Capture pipeline started"
        );

        Ok(Self {
            devices,
            device,
            orientation,
            session,
            queue,
        })
    }

    /// Shared orientation cell; feed it sensor readings or hand it to a preview controller
    pub fn orientation(&self) -> &OrientationCell {
        &self.orientation
    }

    pub fn devices(&self) -> &[CaptureDevice] {
        &self.devices
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut CaptureSession {
        &mut self.session
    }

    pub fn stats(&self) -> DispatchStats {
        self.queue.stats()
    }

    /// Switch between the front and back cameras
    ///
    /// Without a front/back pair, moves to the next listed device. If the
    /// new camera cannot be opened the session is left Idle and the error
    /// returned; [`CapturePipeline::resume`] reopens the previous camera and
    /// calling this again retries the switch.
    pub fn switch_camera(&mut self) -> Result<&CaptureDevice, ConfigurationError> {
        let current = &self.device;
        let opposite = match current.position {
            DevicePosition::Back => DeviceRegistry::select(&self.devices, DevicePosition::Front),
            DevicePosition::Front => DeviceRegistry::select(&self.devices, DevicePosition::Back),
            DevicePosition::Unspecified => None,
        };
        let next = opposite.or_else(|| {
            let index = self.devices.iter().position(|d| d.id == current.id)?;
            let next = self.devices.get((index + 1) % self.devices.len())?;
            (next.id != current.id).then(|| next.clone())
        });

        let Some(device) = next else {
            return Ok(&self.device);
        };
        // Idle here means an earlier switch or resume failed; the caller wants capture back
        let run = matches!(
            self.session.state(),
            CaptureSessionState::Running | CaptureSessionState::Idle
        );
        self.session.switch_device(device.clone())?;
        self.device = device;
        if run {
            self.session.start()?;
        }
        Ok(&self.device)
    }

    /// Stop capturing and release the camera; the pipeline can be restarted
    pub fn stop(&mut self) {
        self.session.stop();
    }

    /// Resume capturing after [`CapturePipeline::stop`] or a failed switch
    ///
    /// Reopens the last selected camera when the session was left Idle.
    pub fn resume(&mut self) -> Result<(), ConfigurationError> {
        if self.session.state() == CaptureSessionState::Idle {
            self.session.reconfigure(self.device.clone())?;
        }
        self.session.start()
    }

    /// Stop everything and return the final counters
    pub fn shutdown(mut self) -> DispatchStats {
        self.session.stop();
        self.queue.shutdown();
        let stats = self.queue.stats();
        info!(?stats, "Capture pipeline shut down");
        stats
    }
}

impl std::fmt::Debug for CapturePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapturePipeline")
            .field("session", &self.session)
            .field("queue", &self.queue)
            .field("orientation", &self.orientation.load())
            .finish()
    }
}
