// SPDX-License-Identifier: GPL-3.0-only
//! Thread lifecycle management for capture and delivery loops
//!
//! Both the capture worker (pulling frames from a device) and the frame
//! delivery queue (running the analyzer) are long-lived threads that must be
//! stopped and joined deterministically. This module gives them one
//! stop-signal/join discipline.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Action returned by a loop callback to control loop behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    /// Continue running the loop
    Continue,
    /// Stop the loop gracefully
    Stop,
}

/// Controller for a loop running in a separate thread
///
/// # Example
///
/// ```ignore
/// let mut controller = CaptureLoopController::start("frame-delivery", move || {
///     match receiver.recv_timeout(POLL) {
///         Ok(frame) => {
///             dispatcher.dispatch(frame);
///             LoopAction::Continue
///         }
///         Err(RecvError::Timeout) => LoopAction::Continue,
///         Err(RecvError::Closed) => LoopAction::Stop,
///     }
/// });
///
/// // Later, stop the loop
/// controller.stop();
/// ```
pub struct CaptureLoopController {
    /// Thread handle for joining
    thread_handle: Option<JoinHandle<()>>,
    /// Signal to stop the loop
    stop_signal: Arc<AtomicBool>,
    /// Name for logging
    name: String,
}

impl CaptureLoopController {
    /// Start a new loop in a separate thread
    ///
    /// The provided closure is called repeatedly until it returns `LoopAction::Stop`
    /// or the controller's `stop()` method is called.
    pub fn start<F>(name: &str, mut loop_fn: F) -> Self
    where
        F: FnMut() -> LoopAction + Send + 'static,
    {
        Self::spawn(name, move |stop_signal| {
            loop {
                // Check stop signal first
                if stop_signal.load(Ordering::SeqCst) {
                    break;
                }

                match loop_fn() {
                    LoopAction::Continue => {}
                    LoopAction::Stop => break,
                }
            }
        })
    }

    /// Run `body` once in a separate thread
    ///
    /// For bodies that drive their own loop (e.g. a device stream): `body`
    /// receives the stop signal and must return soon after it is set.
    pub fn spawn<F>(name: &str, body: F) -> Self
    where
        F: FnOnce(Arc<AtomicBool>) + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let stop_signal_clone = Arc::clone(&stop_signal);
        let name_clone = name.to_string();

        info!(name = %name, "Starting loop thread");

        let thread_handle = thread::spawn(move || {
            debug!(name = %name_clone, "Loop thread started");
            body(stop_signal_clone);
            info!(name = %name_clone, "Loop thread exiting");
        });

        Self {
            thread_handle: Some(thread_handle),
            stop_signal,
            name: name.to_string(),
        }
    }

    /// Check if the loop is still running
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Signal the loop to stop (non-blocking)
    pub fn request_stop(&self) {
        debug!(name = %self.name, "Requesting loop stop");
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Stop the loop and wait for the thread to finish
    pub fn stop(&mut self) {
        self.request_stop();
        self.join();
    }

    /// Wait for the thread to finish without sending stop signal
    pub fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            // Joining ourselves would deadlock; happens when the last owner
            // of a loop is dropped from inside that loop.
            if handle.thread().id() == thread::current().id() {
                warn!(name = %self.name, "Loop stopped from its own thread, not joining");
                return;
            }
            debug!(name = %self.name, "Waiting for loop thread to finish");
            if let Err(e) = handle.join() {
                warn!(name = %self.name, "Loop thread panicked: {:?}", e);
            } else {
                debug!(name = %self.name, "Loop thread finished");
            }
        }
    }
}

impl Drop for CaptureLoopController {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            debug!(name = %self.name, "CaptureLoopController dropped, stopping loop");
            self.stop();
        }
    }
}

impl std::fmt::Debug for CaptureLoopController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureLoopController")
            .field("name", &self.name)
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    #[test]
    fn test_basic_loop() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let mut controller = CaptureLoopController::start("test-loop", move || {
            let count = counter_clone.fetch_add(1, Ordering::SeqCst);
            if count >= 10 {
                LoopAction::Stop
            } else {
                LoopAction::Continue
            }
        });

        // Wait for loop to finish itself
        controller.join();

        assert_eq!(counter.load(Ordering::SeqCst), 11); // 0-10 inclusive
    }

    #[test]
    fn test_stop_signal() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let mut controller = CaptureLoopController::start("test-loop", move || {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(10));
            LoopAction::Continue
        });

        thread::sleep(Duration::from_millis(50));

        controller.stop();
        assert!(counter.load(Ordering::SeqCst) > 0);
        assert!(!controller.is_running());
    }

    #[test]
    fn test_spawn_observes_stop_signal() {
        let iterations = Arc::new(AtomicU32::new(0));
        let iterations_clone = Arc::clone(&iterations);

        let mut controller = CaptureLoopController::spawn("test-spawn", move |stop| {
            while !stop.load(Ordering::SeqCst) {
                iterations_clone.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(5));
            }
        });

        thread::sleep(Duration::from_millis(30));
        controller.stop();
        let seen = iterations.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(iterations.load(Ordering::SeqCst), seen);
    }

    #[test]
    fn test_is_running() {
        let controller = CaptureLoopController::start("test-running", || {
            thread::sleep(Duration::from_millis(100));
            LoopAction::Continue
        });

        assert!(controller.is_running());

        // Drop will stop it
        drop(controller);
    }
}
