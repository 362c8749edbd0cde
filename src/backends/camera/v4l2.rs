// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 capture backend
//!
//! Uses the v4l crate directly: device nodes are enumerated from
//! `/dev/video*`, opened with the target resolution and streamed through a
//! memory-mapped buffer queue on the capture worker thread.

use super::types::*;
use super::{CaptureBackend, CaptureInput, FrameSink, LoopAction};
use crate::constants::timing;
use std::io::ErrorKind;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use v4l::buffer::Type;
use v4l::capability::Flags;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;

/// Number of mmap buffers queued while streaming
const STREAM_BUFFERS: u32 = 4;

/// V4L2 backend implementation
#[derive(Debug, Default)]
pub struct V4l2Backend;

impl V4l2Backend {
    pub fn new() -> Self {
        Self
    }
}

impl CaptureBackend for V4l2Backend {
    fn enumerate_devices(&self) -> BackendResult<Vec<CaptureDevice>> {
        let mut devices = Vec::new();

        for node in v4l::context::enum_devices() {
            let path = node.path().to_string_lossy().to_string();

            let caps = match Device::with_path(node.path()).and_then(|dev| dev.query_caps()) {
                Ok(caps) => caps,
                Err(e) => {
                    debug!(path = %path, error = %e, "Skipping unreadable V4L2 node");
                    continue;
                }
            };

            // Metadata and output nodes share the /dev/video namespace
            if !caps.capabilities.contains(Flags::VIDEO_CAPTURE) {
                debug!(path = %path, card = %caps.card, "Skipping non-capture V4L2 node");
                continue;
            }

            let name = node.name().unwrap_or_else(|| caps.card.clone());
            devices.push(CaptureDevice {
                id: format!("{}:{}", caps.bus, node.index()),
                name,
                path,
                // V4L2 does not report mounting position or lens type
                position: DevicePosition::Unspecified,
                class: DeviceClass::WideAngle,
            });
        }

        info!(count = devices.len(), "V4L2 capture devices enumerated");
        Ok(devices)
    }

    fn open(
        &self,
        device: &CaptureDevice,
        resolution: Resolution,
    ) -> BackendResult<Box<dyn CaptureInput>> {
        let path = device.path.as_str();
        let dev = Device::with_path(path).map_err(|e| BackendError::from_io(path, &e))?;

        let mut format = dev.format().map_err(|e| BackendError::from_io(path, &e))?;
        format.width = resolution.width;
        format.height = resolution.height;

        let format = match dev.set_format(&format) {
            Ok(f) => f,
            Err(e) => {
                warn!(device = %device.name, error = %e, "Could not set format, using current device format");
                dev.format().map_err(|e| BackendError::from_io(path, &e))?
            }
        };

        if format.width != resolution.width || format.height != resolution.height {
            warn!(
                device = %device.name,
                requested = %resolution,
                width = format.width,
                height = format.height,
                "Device negotiated a different resolution"
            );
        }

        // Allocating buffers fails with EBUSY when another process is streaming,
        // which `open` alone does not detect.
        drop(
            MmapStream::with_buffers(&dev, Type::VideoCapture, 1)
                .map_err(|e| BackendError::from_io(path, &e))?,
        );

        let capture_format = CaptureFormat {
            resolution: Resolution::new(format.width, format.height),
            pixel_format: PixelFormat::from_fourcc(&format.fourcc.repr),
        };
        info!(device = %device.name, format = %capture_format, stride = format.stride, "Opened V4L2 device");

        Ok(Box::new(V4l2Input {
            device: dev,
            path: device.path.clone(),
            position: device.position,
            format: capture_format,
            stride: format.stride,
        }))
    }

    fn backend_type(&self) -> CaptureBackendType {
        CaptureBackendType::V4l2
    }
}

struct V4l2Input {
    device: Device,
    path: String,
    position: DevicePosition,
    format: CaptureFormat,
    stride: u32,
}

impl CaptureInput for V4l2Input {
    fn format(&self) -> CaptureFormat {
        self.format
    }

    fn stream(&mut self, sink: &mut FrameSink<'_>) -> BackendResult<()> {
        let path = self.path.as_str();
        let mut stream = MmapStream::with_buffers(&self.device, Type::VideoCapture, STREAM_BUFFERS)
            .map_err(|e| BackendError::from_io(path, &e))?;
        stream.set_timeout(timing::CAPTURE_POLL_INTERVAL);

        info!(path, "V4L2 capture stream started");

        let mut sequence: u64 = 0;
        loop {
            let captured_at = Instant::now();
            let frame = match stream.next() {
                Ok((buf, meta)) => {
                    // Compressed formats only fill part of the buffer
                    let used = match meta.bytesused as usize {
                        0 => buf.len(),
                        n => n.min(buf.len()),
                    };

                    if sequence % timing::FRAME_LOG_INTERVAL == 0 {
                        debug!(
                            frame = sequence,
                            driver_sequence = meta.sequence,
                            size_kb = used / 1024,
                            "V4L2 frame captured"
                        );
                    }

                    let frame = CapturedFrame {
                        sequence,
                        width: self.format.resolution.width,
                        height: self.format.resolution.height,
                        stride: match self.format.pixel_format {
                            PixelFormat::Mjpeg => 0,
                            _ => self.stride,
                        },
                        format: self.format.pixel_format,
                        data: Arc::from(&buf[..used]),
                        captured_at,
                        position: self.position,
                    };
                    sequence += 1;
                    Some(frame)
                }
                Err(e) if e.kind() == ErrorKind::TimedOut => None,
                Err(e) => {
                    warn!(path, error = %e, "V4L2 capture failed");
                    return Err(BackendError::from_io(path, &e));
                }
            };

            if sink(frame) == LoopAction::Stop {
                break;
            }
        }

        debug!(path, frames = sequence, "V4L2 capture stream stopped");
        Ok(())
    }
}
