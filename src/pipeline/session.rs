// SPDX-License-Identifier: GPL-3.0-only

//! Capture session lifecycle
//!
//! ```text
//!           configure            start
//!   Idle ─────────────▶ Configured ─────▶ Running
//!    ▲                                    │   ▲
//!    │ re-open failed        stop         ▼   │ start
//!    └──────────────────────────────── Stopped
//! ```
//!
//! While Running, a capture worker thread pulls frames from the device and
//! overwrites the delivery slot. Stopping closes the slot, joins the worker
//! and drops the device input, which releases the camera.

use super::delivery::DeliveryQueue;
use super::frame_slot::{FrameSender, SendOutcome};
use crate::backends::camera::{
    CaptureBackend, CaptureDevice, CaptureFormat, CaptureInput, CaptureLoopController,
    CapturedFrame, LoopAction, Resolution,
};
use crate::constants::{CAPTURE_WORKER_LABEL, TARGET_RESOLUTION};
use crate::errors::ConfigurationError;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{debug, error, info, trace, warn};

/// Lifecycle state of a [`CaptureSession`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum CaptureSessionState {
    #[default]
    Idle,
    Configured,
    Running,
    Stopped,
}

impl std::fmt::Display for CaptureSessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureSessionState::Idle => write!(f, "idle"),
            CaptureSessionState::Configured => write!(f, "configured"),
            CaptureSessionState::Running => write!(f, "running"),
            CaptureSessionState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Owns one device input and its output into a delivery queue
pub struct CaptureSession {
    backend: Arc<dyn CaptureBackend>,
    resolution: Resolution,
    state: CaptureSessionState,
    device: Option<CaptureDevice>,
    /// Opened input, held here while Configured and moved to the worker while Running
    input: Option<Box<dyn CaptureInput>>,
    format: Option<CaptureFormat>,
    output: Option<FrameSender>,
    worker: Option<CaptureLoopController>,
}

impl CaptureSession {
    /// Session requesting the analyzer's target resolution
    pub fn new(backend: Arc<dyn CaptureBackend>) -> Self {
        Self::with_resolution(backend, TARGET_RESOLUTION)
    }

    pub fn with_resolution(backend: Arc<dyn CaptureBackend>, resolution: Resolution) -> Self {
        Self {
            backend,
            resolution,
            state: CaptureSessionState::Idle,
            device: None,
            input: None,
            format: None,
            output: None,
            worker: None,
        }
    }

    pub fn state(&self) -> CaptureSessionState {
        self.state
    }

    /// Device the session is configured with
    pub fn device(&self) -> Option<&CaptureDevice> {
        self.device.as_ref()
    }

    /// Format negotiated when the device was last opened
    pub fn format(&self) -> Option<CaptureFormat> {
        self.format
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// True while the capture worker is pulling frames
    ///
    /// Can be false in the Running state if the device failed mid-stream.
    pub fn is_capturing(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| w.is_running())
    }

    /// Open `device` and attach the session's output to `output_queue`
    ///
    /// On failure the session stays Idle; nothing is retried.
    pub fn configure(
        &mut self,
        device: CaptureDevice,
        output_queue: &DeliveryQueue,
    ) -> Result<(), ConfigurationError> {
        self.configure_output(device, output_queue.sender())
    }

    fn configure_output(
        &mut self,
        device: CaptureDevice,
        output: FrameSender,
    ) -> Result<(), ConfigurationError> {
        if self.state != CaptureSessionState::Idle {
            warn!(state = %self.state, "Configure called on a configured session");
            return Err(ConfigurationError::AlreadyConfigured);
        }

        let input = self.open_input(&device)?;
        let format = input.format();
        info!(device = %device, %format, "Capture session configured");

        self.input = Some(input);
        self.format = Some(format);
        self.device = Some(device);
        self.output = Some(output);
        self.state = CaptureSessionState::Configured;
        Ok(())
    }

    fn open_input(
        &self,
        device: &CaptureDevice,
    ) -> Result<Box<dyn CaptureInput>, ConfigurationError> {
        self.backend.open(device, self.resolution).map_err(|e| {
            error!(device = %device.name, error = %e, "Failed to open capture device");
            ConfigurationError::input_unavailable(&device.name, e)
        })
    }

    /// Begin delivering frames; a no-op when already Running
    ///
    /// After a stop the device is opened again. If that fails the session
    /// drops back to Idle and needs a fresh `configure`.
    pub fn start(&mut self) -> Result<(), ConfigurationError> {
        match self.state {
            CaptureSessionState::Running => {
                debug!("Capture session already running");
                return Ok(());
            }
            CaptureSessionState::Idle => return Err(ConfigurationError::NotConfigured),
            CaptureSessionState::Configured | CaptureSessionState::Stopped => {}
        }

        let (Some(device), Some(output)) = (self.device.clone(), self.output.clone()) else {
            return Err(ConfigurationError::NotConfigured);
        };

        let input = match self.input.take() {
            Some(input) => input,
            None => match self.open_input(&device) {
                Ok(input) => {
                    self.format = Some(input.format());
                    input
                }
                Err(e) => {
                    self.release();
                    return Err(e);
                }
            },
        };

        output.set_accepting(true);
        self.worker = Some(spawn_capture_worker(input, output));
        self.state = CaptureSessionState::Running;
        info!(device = %device.name, "Capture session running");
        Ok(())
    }

    /// Stop delivering frames and release the device
    ///
    /// Safe to call at any time and more than once. Frames still waiting in
    /// the delivery slot are dropped and the capture worker produces no more.
    /// A frame the delivery thread had already taken from the slot is in
    /// flight: its scan may finish, and its result arrive, after this
    /// returns. No other frame is delivered.
    pub fn stop(&mut self) {
        if self.state != CaptureSessionState::Running {
            debug!(state = %self.state, "Capture session not running, nothing to stop");
            return;
        }

        // Close the slot before joining so frames captured meanwhile are rejected
        let dropped = self
            .output
            .as_ref()
            .is_some_and(|output| output.set_accepting(false));
        if dropped {
            trace!("Pending frame dropped on stop");
        }

        if let Some(mut worker) = self.worker.take() {
            worker.stop();
        }

        self.state = CaptureSessionState::Stopped;
        info!("Capture session stopped, device released");
    }

    /// Move to another device, keeping the output queue
    ///
    /// The session keeps running if it was running. On failure the session
    /// is left Idle, still attached to its output; retrying is up to the
    /// caller.
    pub fn switch_device(&mut self, device: CaptureDevice) -> Result<(), ConfigurationError> {
        if self.output.is_none() {
            return Err(ConfigurationError::NotConfigured);
        }
        let was_running = self.state == CaptureSessionState::Running;

        info!(from = ?self.device.as_ref().map(|d| &d.name), to = %device.name, "Switching capture device");
        self.stop();
        self.release();

        self.reconfigure(device)?;
        if was_running {
            self.start()?;
        }
        Ok(())
    }

    /// Configure an Idle session again on the output it was last attached to
    ///
    /// For recovering after a failed switch or restart, when the delivery
    /// queue is not at hand.
    pub fn reconfigure(&mut self, device: CaptureDevice) -> Result<(), ConfigurationError> {
        let Some(output) = self.output.clone() else {
            return Err(ConfigurationError::NotConfigured);
        };
        self.configure_output(device, output)
    }

    /// Drop the device and return to Idle
    ///
    /// The output stays attached, closed to frames, so [`Self::reconfigure`]
    /// can bring the session back on the same delivery queue.
    fn release(&mut self) {
        if let Some(output) = &self.output {
            output.set_accepting(false);
        }
        if let Some(mut worker) = self.worker.take() {
            worker.stop();
        }
        self.input = None;
        self.format = None;
        self.device = None;
        self.state = CaptureSessionState::Idle;
    }
}

/// Run `input` on the capture worker thread until its stop signal is set
fn spawn_capture_worker(
    mut input: Box<dyn CaptureInput>,
    output: FrameSender,
) -> CaptureLoopController {
    CaptureLoopController::spawn(CAPTURE_WORKER_LABEL, move |stop| {
        let mut sink = |frame: Option<CapturedFrame>| {
            if stop.load(Ordering::SeqCst) {
                return LoopAction::Stop;
            }
            if let Some(frame) = frame {
                match output.send(frame) {
                    SendOutcome::Queued => {}
                    SendOutcome::Replaced(old) => {
                        trace!(sequence = old.sequence, "Replaced frame not yet delivered");
                    }
                    SendOutcome::Rejected(_) => return LoopAction::Stop,
                }
            }
            LoopAction::Continue
        };

        if let Err(e) = input.stream(&mut sink) {
            error!(error = %e, "Capture stream failed");
        }
        // Dropping the input releases the device
        drop(input);
    })
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSession")
            .field("backend", &self.backend.backend_type())
            .field("state", &self.state)
            .field("device", &self.device)
            .field("format", &self.format)
            .field("capturing", &self.is_capturing())
            .finish()
    }
}
