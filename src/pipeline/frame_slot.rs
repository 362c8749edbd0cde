// SPDX-License-Identifier: GPL-3.0-only

//! Capacity-1 overwrite-on-full frame channel
//!
//! The capture worker writes into a single slot holding the latest frame.
//! A frame that has not been picked up by the delivery thread when the next
//! one arrives is replaced, so the consumer never sees a backlog. The slot
//! only accepts frames while the owning session is running.
//!
//! The frame itself sits behind a mutex. A one-token sync channel next to it
//! wakes the receiver: every send or close leaves a token, and the receiver
//! re-checks the slot after each one.

use crate::backends::camera::CapturedFrame;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::trace;

/// What happened to a frame handed to [`FrameSender::send`]
#[derive(Debug)]
pub enum SendOutcome {
    /// Slot was empty, frame is waiting for pickup
    Queued,
    /// Frame took the place of an older frame that was never picked up
    Replaced(CapturedFrame),
    /// Slot is not accepting frames (session not running, or closed)
    Rejected(CapturedFrame),
}

/// Why [`FrameReceiver::recv_timeout`] returned without a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvError {
    Timeout,
    Closed,
}

#[derive(Debug, Default)]
struct SlotState {
    pending: Option<CapturedFrame>,
    accepting: bool,
    closed: bool,
}

#[derive(Debug)]
struct Slot {
    state: Mutex<SlotState>,
    wake: SyncSender<()>,
    superseded: AtomicU64,
}

impl Slot {
    fn lock(&self) -> std::sync::MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A full channel already holds a token the receiver has not seen
    fn wake_receiver(&self) {
        let _ = self.wake.try_send(());
    }
}

/// Create a connected sender/receiver pair
///
/// The slot starts closed to frames; [`FrameSender::set_accepting`] opens it.
pub fn frame_channel() -> (FrameSender, FrameReceiver) {
    let (wake, woken) = mpsc::sync_channel(1);
    let slot = Arc::new(Slot {
        state: Mutex::new(SlotState::default()),
        wake,
        superseded: AtomicU64::new(0),
    });
    (
        FrameSender {
            slot: Arc::clone(&slot),
        },
        FrameReceiver {
            slot,
            woken: Mutex::new(woken),
        },
    )
}

/// Writing end, held by the capture session
#[derive(Debug, Clone)]
pub struct FrameSender {
    slot: Arc<Slot>,
}

impl FrameSender {
    /// Put `frame` in the slot, replacing any frame not yet picked up
    pub fn send(&self, frame: CapturedFrame) -> SendOutcome {
        let mut state = self.slot.lock();
        if !state.accepting || state.closed {
            return SendOutcome::Rejected(frame);
        }

        let outcome = match state.pending.replace(frame) {
            Some(old) => {
                self.slot.superseded.fetch_add(1, Ordering::Relaxed);
                trace!(sequence = old.sequence, "Late frame discarded");
                SendOutcome::Replaced(old)
            }
            None => SendOutcome::Queued,
        };
        drop(state);
        self.slot.wake_receiver();
        outcome
    }

    /// Open or close the slot to new frames
    ///
    /// Closing also drops a frame still waiting for pickup, so nothing sent
    /// before this call reaches the consumer afterwards. Returns true if a
    /// pending frame was dropped.
    pub fn set_accepting(&self, accepting: bool) -> bool {
        let mut state = self.slot.lock();
        state.accepting = accepting;
        if accepting {
            false
        } else {
            state.pending.take().is_some()
        }
    }

    pub fn is_accepting(&self) -> bool {
        let state = self.slot.lock();
        state.accepting && !state.closed
    }

    /// Frames replaced before the consumer got to them
    pub fn superseded(&self) -> u64 {
        self.slot.superseded.load(Ordering::Relaxed)
    }
}

/// Reading end, owned by the delivery queue
#[derive(Debug)]
pub struct FrameReceiver {
    slot: Arc<Slot>,
    woken: Mutex<Receiver<()>>,
}

impl FrameReceiver {
    /// Take the pending frame, waiting up to `timeout` for one to arrive
    pub fn recv_timeout(&self, timeout: Duration) -> Result<CapturedFrame, RecvError> {
        let deadline = Instant::now() + timeout;
        let woken = self.woken.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            {
                let mut state = self.slot.lock();
                if state.closed {
                    return Err(RecvError::Closed);
                }
                if let Some(frame) = state.pending.take() {
                    return Ok(frame);
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(RecvError::Timeout);
            }
            // Tokens can be stale (the frame was taken by try_recv), so
            // every wakeup goes back to the slot
            match woken.recv_timeout(remaining) {
                Ok(()) | Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return Err(RecvError::Closed),
            }
        }
    }

    /// Take the pending frame without waiting
    pub fn try_recv(&self) -> Option<CapturedFrame> {
        self.slot.lock().pending.take()
    }

    /// Close the channel for good and wake a waiting receiver
    pub fn close(&self) {
        let mut state = self.slot.lock();
        state.closed = true;
        state.pending = None;
        drop(state);
        self.slot.wake_receiver();
    }

    pub fn superseded(&self) -> u64 {
        self.slot.superseded.load(Ordering::Relaxed)
    }
}

impl Drop for FrameReceiver {
    fn drop(&mut self) {
        self.close();
    }
}
