// SPDX-License-Identifier: GPL-3.0-only

//! Single-flight frame dispatch to the analyzer
//!
//! Runs on the delivery queue's thread. Each frame is tagged with the
//! current video orientation, scanned synchronously, and the result goes to
//! the result handler whether or not it carries an error. A frame that
//! arrives while another is being scanned is dropped without touching the
//! analyzer.

use super::orientation::OrientationCell;
use crate::analyzer::{Analyzer, AnalyzerError, FrameHandle, ResultHandler};
use crate::backends::camera::CapturedFrame;
use crate::constants::timing;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, trace};

/// What the dispatcher did with a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Scanned, result handed to the result handler
    Delivered,
    /// Another frame was in flight; dropped unscanned
    Discarded,
}

/// Frame counters for one delivery queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    /// Frames scanned and reported
    pub delivered: u64,
    /// Frames dropped by the dispatcher because a scan was running
    pub discarded: u64,
    /// Frames replaced in the delivery slot before pickup
    pub superseded: u64,
}

/// Clears the in-flight flag even if the analyzer or handler panics
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct FrameDispatcher {
    analyzer: Mutex<Box<dyn Analyzer>>,
    handler: Mutex<Box<dyn ResultHandler>>,
    orientation: OrientationCell,
    in_flight: AtomicBool,
    delivered: AtomicU64,
    discarded: AtomicU64,
}

impl FrameDispatcher {
    pub fn new(
        analyzer: Box<dyn Analyzer>,
        handler: impl ResultHandler + 'static,
        orientation: OrientationCell,
    ) -> Self {
        Self {
            analyzer: Mutex::new(analyzer),
            handler: Mutex::new(Box::new(handler)),
            orientation,
            in_flight: AtomicBool::new(false),
            delivered: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
        }
    }

    /// Pass the API key to the analyzer; call before any frame is delivered
    pub fn initialize(&self, api_key: &str) -> Result<(), AnalyzerError> {
        let mut analyzer = self.analyzer.lock().unwrap_or_else(PoisonError::into_inner);
        analyzer.initialize(api_key)?;
        info!(analyzer = analyzer.name(), "Analyzer initialized");
        Ok(())
    }

    /// Scan one frame and report the result
    ///
    /// Blocks for the duration of the analyzer call.
    pub fn dispatch(&self, frame: CapturedFrame) -> DispatchOutcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            self.discarded.fetch_add(1, Ordering::Relaxed);
            trace!(sequence = frame.sequence, "Analyzer busy, frame discarded");
            return DispatchOutcome::Discarded;
        }
        let _in_flight = InFlight(&self.in_flight);

        let handle = FrameHandle::new(frame, self.orientation.load());
        let result = self
            .analyzer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .scan(&handle);
        let sequence = handle.sequence();
        drop(handle);

        if let Some(error) = &result.error {
            debug!(sequence, %error, "Analyzer reported an error");
        }

        self.handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .on_result(result);

        let delivered = self.delivered.fetch_add(1, Ordering::Relaxed) + 1;
        if delivered % timing::FRAME_LOG_INTERVAL == 0 {
            debug!(delivered, sequence, "Frames dispatched");
        }
        DispatchOutcome::Delivered
    }

    /// True while a scan is running
    pub fn is_processing(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Counters kept by the dispatcher itself; `superseded` is always 0 here
    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            delivered: self.delivered.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            superseded: 0,
        }
    }
}

impl std::fmt::Debug for FrameDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameDispatcher")
            .field("orientation", &self.orientation.load())
            .field("processing", &self.is_processing())
            .field("stats", &self.stats())
            .finish()
    }
}
