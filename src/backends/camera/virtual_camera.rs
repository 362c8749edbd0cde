// SPDX-License-Identifier: GPL-3.0-only

//! Virtual capture backend
//!
//! Devices without hardware behind them. Each device either paints a moving
//! test pattern at a fixed rate or plays frames pushed through a
//! [`FrameInjector`]. Devices are exclusive like real cameras: a second
//! `open` while an input is alive fails with [`BackendError::Busy`].

use super::types::*;
use super::{CaptureBackend, CaptureInput, FrameSink, LoopAction};
use crate::constants::timing;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Where a virtual device gets its frames from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VirtualFeed {
    /// Gray8 gradient that scrolls one column per frame
    TestPattern { fps: u32 },
    /// Frames pushed by a [`FrameInjector`]
    Manual,
}

/// State shared between a virtual device, its inputs and injectors
#[derive(Debug)]
struct DeviceShared {
    open: AtomicBool,
    streaming: AtomicBool,
    opens: AtomicUsize,
    open_error: Mutex<Option<BackendError>>,
    feed_tx: Sender<Arc<[u8]>>,
    feed_rx: Mutex<Receiver<Arc<[u8]>>>,
}

impl DeviceShared {
    fn new() -> Self {
        let (feed_tx, feed_rx) = mpsc::channel();
        Self {
            open: AtomicBool::new(false),
            streaming: AtomicBool::new(false),
            opens: AtomicUsize::new(0),
            open_error: Mutex::new(None),
            feed_tx,
            feed_rx: Mutex::new(feed_rx),
        }
    }
}

/// A virtual device definition
#[derive(Debug, Clone)]
pub struct VirtualDevice {
    pub device: CaptureDevice,
    pub feed: VirtualFeed,
    shared: Arc<DeviceShared>,
}

impl VirtualDevice {
    /// Test pattern device at the default rate
    pub fn new(device: CaptureDevice) -> Self {
        Self {
            device,
            feed: VirtualFeed::TestPattern {
                fps: timing::VIRTUAL_FPS,
            },
            shared: Arc::new(DeviceShared::new()),
        }
    }

    /// Device whose frames come from [`VirtualDevice::injector`]
    pub fn manual(device: CaptureDevice) -> Self {
        Self {
            feed: VirtualFeed::Manual,
            ..Self::new(device)
        }
    }

    /// Make every `open` fail with `error` (e.g. simulate a busy camera)
    pub fn failing(self, error: BackendError) -> Self {
        self.set_open_error(Some(error));
        self
    }

    pub fn set_open_error(&self, error: Option<BackendError>) {
        *self
            .shared
            .open_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = error;
    }

    /// Handle for pushing frames into a manual device
    pub fn injector(&self) -> FrameInjector {
        FrameInjector {
            shared: Arc::clone(&self.shared),
        }
    }

    /// True while an input holds the device
    pub fn is_open(&self) -> bool {
        self.shared.open.load(Ordering::SeqCst)
    }

    /// True while a stream is running on the device
    pub fn is_streaming(&self) -> bool {
        self.shared.streaming.load(Ordering::SeqCst)
    }

    /// Number of successful opens so far
    pub fn open_count(&self) -> usize {
        self.shared.opens.load(Ordering::SeqCst)
    }
}

/// Pushes frames into a [`VirtualFeed::Manual`] device
///
/// Like light hitting a sensor that is not streaming, frames pushed while
/// no stream is running are lost.
#[derive(Debug, Clone)]
pub struct FrameInjector {
    shared: Arc<DeviceShared>,
}

impl FrameInjector {
    /// Push one frame; returns false if the device was not streaming
    pub fn push(&self, data: impl Into<Arc<[u8]>>) -> bool {
        if !self.shared.streaming.load(Ordering::SeqCst) {
            return false;
        }
        // The receiver lives in the same DeviceShared, so this cannot fail
        self.shared.feed_tx.send(data.into()).is_ok()
    }

    pub fn is_streaming(&self) -> bool {
        self.shared.streaming.load(Ordering::SeqCst)
    }
}

/// Virtual backend
#[derive(Debug, Clone)]
pub struct VirtualBackend {
    devices: Vec<VirtualDevice>,
}

impl VirtualBackend {
    pub fn new(devices: Vec<VirtualDevice>) -> Self {
        Self { devices }
    }

    pub fn devices(&self) -> &[VirtualDevice] {
        &self.devices
    }

    fn find(&self, device: &CaptureDevice) -> Option<&VirtualDevice> {
        self.devices.iter().find(|d| d.device.id == device.id)
    }
}

impl Default for VirtualBackend {
    /// A back and a front wide-angle camera, both painting test patterns
    fn default() -> Self {
        let make = |id: &str, name: &str, position| CaptureDevice {
            id: id.to_string(),
            name: name.to_string(),
            path: format!("virtual:{}", id),
            position,
            class: DeviceClass::WideAngle,
        };
        Self::new(vec![
            VirtualDevice::new(make("virtual-back", "Virtual Back Camera", DevicePosition::Back)),
            VirtualDevice::new(make(
                "virtual-front",
                "Virtual Front Camera",
                DevicePosition::Front,
            )),
        ])
    }
}

impl CaptureBackend for VirtualBackend {
    fn enumerate_devices(&self) -> BackendResult<Vec<CaptureDevice>> {
        Ok(self.devices.iter().map(|d| d.device.clone()).collect())
    }

    fn open(
        &self,
        device: &CaptureDevice,
        resolution: Resolution,
    ) -> BackendResult<Box<dyn CaptureInput>> {
        let virtual_device = self
            .find(device)
            .ok_or_else(|| BackendError::DeviceNotFound(device.path.clone()))?;
        let shared = Arc::clone(&virtual_device.shared);

        if let Some(error) = shared
            .open_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            return Err(error);
        }

        if shared.open.swap(true, Ordering::SeqCst) {
            return Err(BackendError::Busy(device.path.clone()));
        }
        shared.opens.fetch_add(1, Ordering::SeqCst);

        info!(device = %device.name, %resolution, "Opened virtual device");

        Ok(Box::new(VirtualInput {
            shared,
            feed: virtual_device.feed,
            position: device.position,
            format: CaptureFormat {
                resolution,
                pixel_format: PixelFormat::Gray8,
            },
        }))
    }

    fn backend_type(&self) -> CaptureBackendType {
        CaptureBackendType::Virtual
    }
}

struct VirtualInput {
    shared: Arc<DeviceShared>,
    feed: VirtualFeed,
    position: DevicePosition,
    format: CaptureFormat,
}

impl CaptureInput for VirtualInput {
    fn format(&self) -> CaptureFormat {
        self.format
    }

    fn stream(&mut self, sink: &mut FrameSink<'_>) -> BackendResult<()> {
        {
            let rx = self
                .shared
                .feed_rx
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            while rx.try_recv().is_ok() {}
        }
        self.shared.streaming.store(true, Ordering::SeqCst);
        debug!(feed = ?self.feed, "Virtual stream started");

        let mut stream = VirtualStream {
            input: self,
            sequence: 0,
            next_due: Instant::now(),
        };

        loop {
            let frame = match stream.input.feed {
                VirtualFeed::TestPattern { fps } => Some(stream.next_pattern(fps)),
                VirtualFeed::Manual => stream.next_injected(),
            };
            if sink(frame) == LoopAction::Stop {
                break;
            }
        }

        debug!(frames = stream.sequence, "Virtual stream stopped");
        Ok(())
    }
}

impl Drop for VirtualInput {
    fn drop(&mut self) {
        self.shared.streaming.store(false, Ordering::SeqCst);
        self.shared.open.store(false, Ordering::SeqCst);
        debug!("Virtual device released");
    }
}

struct VirtualStream<'a> {
    input: &'a VirtualInput,
    sequence: u64,
    next_due: Instant,
}

impl VirtualStream<'_> {
    fn frame(&mut self, data: Arc<[u8]>) -> CapturedFrame {
        let Resolution { width, height } = self.input.format.resolution;
        let sequence = self.sequence;
        self.sequence += 1;
        CapturedFrame {
            sequence,
            width,
            height,
            stride: width,
            format: self.input.format.pixel_format,
            data,
            captured_at: Instant::now(),
            position: self.input.position,
        }
    }

    fn next_pattern(&mut self, fps: u32) -> CapturedFrame {
        let now = Instant::now();
        if self.next_due > now {
            std::thread::sleep(self.next_due - now);
        }
        self.next_due = Instant::now() + Duration::from_secs(1) / fps.max(1);

        let Resolution { width, height } = self.input.format.resolution;
        let offset = self.sequence as u32;
        let data: Vec<u8> = (0..height)
            .flat_map(|_| (0..width).map(move |x| (x.wrapping_add(offset) % 256) as u8))
            .collect();
        self.frame(Arc::from(data))
    }

    fn next_injected(&mut self) -> Option<CapturedFrame> {
        let data = self
            .input
            .shared
            .feed_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .recv_timeout(timing::CAPTURE_POLL_INTERVAL)
            .ok()?;
        Some(self.frame(data))
    }
}

impl Drop for VirtualStream<'_> {
    fn drop(&mut self) {
        self.input.shared.streaming.store(false, Ordering::SeqCst);
    }
}
