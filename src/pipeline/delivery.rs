// SPDX-License-Identifier: GPL-3.0-only

//! Serial frame delivery queue
//!
//! One named thread that takes frames from the delivery slot in capture
//! order and hands them to the [`FrameDispatcher`] one at a time. While the
//! analyzer runs, new frames pile up in the slot only as far as one frame;
//! older ones are replaced.

use super::dispatcher::{DispatchStats, FrameDispatcher};
use super::frame_slot::{FrameReceiver, FrameSender, RecvError, frame_channel};
use crate::backends::camera::{CaptureLoopController, LoopAction};
use crate::constants::timing;
use std::sync::Arc;
use tracing::info;

pub struct DeliveryQueue {
    label: String,
    sender: FrameSender,
    receiver: Arc<FrameReceiver>,
    dispatcher: Arc<FrameDispatcher>,
    controller: CaptureLoopController,
}

impl DeliveryQueue {
    /// Spawn the delivery thread named `label`
    pub fn new(label: &str, dispatcher: Arc<FrameDispatcher>) -> Self {
        let (sender, receiver) = frame_channel();
        let receiver = Arc::new(receiver);

        let controller = {
            let receiver = Arc::clone(&receiver);
            let dispatcher = Arc::clone(&dispatcher);
            CaptureLoopController::start(label, move || {
                match receiver.recv_timeout(timing::DELIVERY_POLL_INTERVAL) {
                    Ok(frame) => {
                        dispatcher.dispatch(frame);
                        LoopAction::Continue
                    }
                    Err(RecvError::Timeout) => LoopAction::Continue,
                    Err(RecvError::Closed) => LoopAction::Stop,
                }
            })
        };

        Self {
            label: label.to_string(),
            sender,
            receiver,
            dispatcher,
            controller,
        }
    }

    /// Writing end for a capture session's output
    pub fn sender(&self) -> FrameSender {
        self.sender.clone()
    }

    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            superseded: self.receiver.superseded(),
            ..self.dispatcher.stats()
        }
    }

    pub fn is_running(&self) -> bool {
        self.controller.is_running()
    }

    /// Close the slot and join the delivery thread
    ///
    /// A scan in progress finishes first and its result is still reported.
    pub fn shutdown(&mut self) {
        if self.controller.is_running() {
            info!(label = %self.label, stats = ?self.stats(), "Shutting down delivery queue");
        }
        self.receiver.close();
        self.controller.stop();
    }
}

impl Drop for DeliveryQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for DeliveryQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryQueue")
            .field("label", &self.label)
            .field("running", &self.is_running())
            .field("stats", &self.stats())
            .finish()
    }
}
