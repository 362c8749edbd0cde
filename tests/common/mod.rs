// SPDX-License-Identifier: GPL-3.0-only

//! Helpers shared by the integration tests

#![allow(dead_code)]

use prescreen_capture::analyzer::{Analyzer, AnalyzerError, FrameHandle, ScanResult};
use prescreen_capture::backends::camera::virtual_camera::{VirtualBackend, VirtualDevice};
use prescreen_capture::backends::camera::{CaptureDevice, DeviceClass, DevicePosition};
use prescreen_capture::pipeline::{DeliveryQueue, FrameDispatcher, OrientationCell, VideoOrientation};
use std::sync::Arc;
use std::sync::mpsc;
use std::time::{Duration, Instant};

pub const TIMEOUT: Duration = Duration::from_secs(5);

pub fn device(id: &str, position: DevicePosition) -> CaptureDevice {
    CaptureDevice {
        id: id.to_string(),
        name: id.to_string(),
        path: format!("virtual:{}", id),
        position,
        class: DeviceClass::WideAngle,
    }
}

/// Manual-feed back camera and a backend exposing only it
pub fn manual_back_camera() -> (VirtualDevice, Arc<VirtualBackend>) {
    let camera = VirtualDevice::manual(device("back", DevicePosition::Back));
    let backend = Arc::new(VirtualBackend::new(vec![camera.clone()]));
    (camera, backend)
}

/// Poll `condition` until it holds or `TIMEOUT` passes
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + TIMEOUT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    condition()
}

/// What the analyzer was shown for one scan
#[derive(Debug, Clone, PartialEq)]
pub struct ScanRecord {
    /// First byte of the frame data, used as a frame marker
    pub marker: u8,
    pub orientation: VideoOrientation,
    pub position: DevicePosition,
}

/// Analyzer that reports each scan and then blocks until released
pub struct GatedAnalyzer {
    entered: mpsc::Sender<ScanRecord>,
    gate: mpsc::Receiver<()>,
}

/// Test side of a [`GatedAnalyzer`]
pub struct Gate {
    pub entered: mpsc::Receiver<ScanRecord>,
    release: mpsc::Sender<()>,
}

impl Gate {
    /// Let one scan return
    pub fn release(&self) {
        self.release.send(()).unwrap();
    }

    /// Wait for the next scan to start
    pub fn next_scan(&self) -> ScanRecord {
        self.entered.recv_timeout(TIMEOUT).expect("no scan started")
    }

    /// True if no scan started within `wait`
    pub fn idle_for(&self, wait: Duration) -> bool {
        self.entered.recv_timeout(wait).is_err()
    }
}

pub fn gated_analyzer() -> (GatedAnalyzer, Gate) {
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    (
        GatedAnalyzer {
            entered: entered_tx,
            gate: release_rx,
        },
        Gate {
            entered: entered_rx,
            release: release_tx,
        },
    )
}

impl Analyzer for GatedAnalyzer {
    fn name(&self) -> &'static str {
        "gated"
    }

    fn initialize(&mut self, _api_key: &str) -> Result<(), AnalyzerError> {
        Ok(())
    }

    fn scan(&mut self, frame: &FrameHandle) -> ScanResult {
        let marker = frame.data().first().copied().unwrap_or_default();
        let _ = self.entered.send(ScanRecord {
            marker,
            orientation: frame.orientation(),
            position: frame.position(),
        });
        let _ = self.gate.recv_timeout(TIMEOUT);
        ScanResult {
            confidence: marker as f32 / 255.0,
            ..Default::default()
        }
    }
}

/// Delivery queue around `analyzer`, with results sent to the returned receiver
pub fn delivery_queue(
    analyzer: impl Analyzer + 'static,
    orientation: OrientationCell,
) -> (DeliveryQueue, mpsc::Receiver<ScanResult>) {
    let (results_tx, results_rx) = mpsc::channel();
    let dispatcher = Arc::new(FrameDispatcher::new(
        Box::new(analyzer),
        move |result: ScanResult| {
            let _ = results_tx.send(result);
        },
        orientation,
    ));
    (DeliveryQueue::new("test-delivery", dispatcher), results_rx)
}
