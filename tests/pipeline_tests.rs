// SPDX-License-Identifier: GPL-3.0-only

//! End-to-end tests for the capture pipeline on virtual devices

mod common;

use common::{TIMEOUT, device, wait_until};
use prescreen_capture::analyzer::{AnalyzerError, ScanResult};
use prescreen_capture::backends::camera::virtual_camera::{VirtualBackend, VirtualDevice};
use prescreen_capture::backends::camera::{BackendError, DevicePosition, DeviceRegistry, Resolution};
use prescreen_capture::errors::{AppError, ConfigurationError};
use prescreen_capture::pipeline::{CaptureSessionState, OrientationReading, VideoOrientation};
use prescreen_capture::{CapturePipeline, PipelineOptions, StubAnalyzer};
use std::sync::Arc;
use std::sync::mpsc;

const SMALL: Resolution = Resolution::new(64, 48);

fn options() -> PipelineOptions {
    PipelineOptions {
        resolution: SMALL,
        ..PipelineOptions::new("test-key")
    }
}

fn collector() -> (impl FnMut(ScanResult) + Send + 'static, mpsc::Receiver<ScanResult>) {
    let (tx, rx) = mpsc::channel();
    (
        move |result: ScanResult| {
            let _ = tx.send(result);
        },
        rx,
    )
}

#[test]
fn test_pipeline_delivers_results() {
    let registry = DeviceRegistry::new(Arc::new(VirtualBackend::default()));
    let (handler, results) = collector();

    let pipeline =
        CapturePipeline::start(&registry, Box::new(StubAnalyzer::new()), handler, options())
            .unwrap();

    assert_eq!(pipeline.session().state(), CaptureSessionState::Running);
    assert_eq!(
        pipeline.session().device().map(|d| d.position),
        Some(DevicePosition::Back)
    );
    assert_eq!(pipeline.session().resolution(), SMALL);

    for _ in 0..3 {
        let result = results.recv_timeout(TIMEOUT).unwrap();
        assert!(result.error.is_none(), "unexpected error: {:?}", result.error);
    }

    let stats = pipeline.shutdown();
    assert!(stats.delivered >= 3);
}

#[test]
fn test_preferred_position() {
    let registry = DeviceRegistry::new(Arc::new(VirtualBackend::default()));
    let (handler, _results) = collector();

    let pipeline = CapturePipeline::start(
        &registry,
        Box::new(StubAnalyzer::new()),
        handler,
        PipelineOptions {
            preferred_position: Some(DevicePosition::Front),
            ..options()
        },
    )
    .unwrap();

    assert_eq!(
        pipeline.session().device().map(|d| d.id.as_str()),
        Some("virtual-front")
    );
}

#[test]
fn test_switch_camera() {
    let backend = Arc::new(VirtualBackend::default());
    let registry = DeviceRegistry::new(backend.clone());
    let (handler, results) = collector();

    let mut pipeline =
        CapturePipeline::start(&registry, Box::new(StubAnalyzer::new()), handler, options())
            .unwrap();

    let front = pipeline.switch_camera().unwrap().clone();
    assert_eq!(front.position, DevicePosition::Front);
    assert_eq!(pipeline.session().state(), CaptureSessionState::Running);

    let back = &backend.devices()[0];
    assert!(wait_until(|| !back.is_open()));
    assert!(backend.devices()[1].is_open());

    // Results keep flowing from the new camera
    while results.try_recv().is_ok() {}
    results.recv_timeout(TIMEOUT).unwrap();

    let back_again = pipeline.switch_camera().unwrap();
    assert_eq!(back_again.position, DevicePosition::Back);
}

#[test]
fn test_switch_without_pair_stays_put() {
    let backend = Arc::new(VirtualBackend::new(vec![VirtualDevice::new(device(
        "webcam",
        DevicePosition::Unspecified,
    ))]));
    let registry = DeviceRegistry::new(backend);
    let (handler, _results) = collector();

    let mut pipeline =
        CapturePipeline::start(&registry, Box::new(StubAnalyzer::new()), handler, options())
            .unwrap();

    assert_eq!(pipeline.switch_camera().unwrap().id, "webcam");
    assert_eq!(pipeline.session().state(), CaptureSessionState::Running);
}

#[test]
fn test_invalid_api_key_is_fatal() {
    let backend = Arc::new(VirtualBackend::default());
    let registry = DeviceRegistry::new(backend.clone());
    let (handler, _results) = collector();

    let err = CapturePipeline::start(
        &registry,
        Box::new(StubAnalyzer::new()),
        handler,
        PipelineOptions {
            resolution: SMALL,
            ..PipelineOptions::new("")
        },
    )
    .unwrap_err();

    assert!(matches!(err, AppError::Analyzer(AnalyzerError::InvalidApiKey)));
    assert!(backend.devices().iter().all(|d| d.open_count() == 0));
}

#[test]
fn test_no_devices_is_reported() {
    let registry = DeviceRegistry::new(Arc::new(VirtualBackend::new(Vec::new())));
    let (handler, _results) = collector();

    let err = CapturePipeline::start(&registry, Box::new(StubAnalyzer::new()), handler, options())
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Configuration(ConfigurationError::NoDevices)
    ));
}

#[test]
fn test_stop_and_resume() {
    let backend = Arc::new(VirtualBackend::default());
    let registry = DeviceRegistry::new(backend.clone());
    let (handler, results) = collector();

    let mut pipeline =
        CapturePipeline::start(&registry, Box::new(StubAnalyzer::new()), handler, options())
            .unwrap();
    results.recv_timeout(TIMEOUT).unwrap();

    pipeline.stop();
    assert_eq!(pipeline.session().state(), CaptureSessionState::Stopped);
    assert!(!backend.devices()[0].is_open());

    pipeline.resume().unwrap();
    assert_eq!(backend.devices()[0].open_count(), 2);
    while results.try_recv().is_ok() {}
    results.recv_timeout(TIMEOUT).unwrap();
}

#[test]
fn test_orientation_is_shared() {
    let registry = DeviceRegistry::new(Arc::new(VirtualBackend::default()));
    let (handler, _results) = collector();

    let pipeline =
        CapturePipeline::start(&registry, Box::new(StubAnalyzer::new()), handler, options())
            .unwrap();

    let cell = pipeline.orientation().clone();
    cell.apply(OrientationReading::PortraitUpsideDown);
    assert_eq!(
        pipeline.orientation().load(),
        VideoOrientation::PortraitUpsideDown
    );
}

#[test]
fn test_failed_switch_can_be_recovered() {
    let backend = Arc::new(VirtualBackend::default());
    let registry = DeviceRegistry::new(backend.clone());
    let (handler, results) = collector();
    let back = &backend.devices()[0];
    let front = &backend.devices()[1];

    let mut pipeline =
        CapturePipeline::start(&registry, Box::new(StubAnalyzer::new()), handler, options())
            .unwrap();

    front.set_open_error(Some(BackendError::Busy("virtual:virtual-front".to_string())));
    assert!(matches!(
        pipeline.switch_camera(),
        Err(ConfigurationError::InputUnavailable { .. })
    ));
    assert_eq!(pipeline.session().state(), CaptureSessionState::Idle);
    assert!(!back.is_open());

    // Resume goes back to the camera that was running
    pipeline.resume().unwrap();
    assert_eq!(pipeline.session().state(), CaptureSessionState::Running);
    assert!(back.is_open());
    while results.try_recv().is_ok() {}
    results.recv_timeout(TIMEOUT).unwrap();

    // A second attempt succeeds once the front camera is free
    front.set_open_error(None);
    assert_eq!(pipeline.switch_camera().unwrap().position, DevicePosition::Front);
    assert_eq!(pipeline.session().state(), CaptureSessionState::Running);
    assert!(front.is_open());
}

#[test]
fn test_switch_retries_after_failure() {
    let backend = Arc::new(VirtualBackend::default());
    let registry = DeviceRegistry::new(backend.clone());
    let (handler, _results) = collector();
    let front = &backend.devices()[1];

    let mut pipeline =
        CapturePipeline::start(&registry, Box::new(StubAnalyzer::new()), handler, options())
            .unwrap();

    front.set_open_error(Some(BackendError::Busy("virtual:virtual-front".to_string())));
    assert!(pipeline.switch_camera().is_err());

    front.set_open_error(None);
    assert_eq!(pipeline.switch_camera().unwrap().position, DevicePosition::Front);
    assert_eq!(pipeline.session().state(), CaptureSessionState::Running);
}

#[test]
fn test_failed_resume_can_be_retried() {
    let backend = Arc::new(VirtualBackend::default());
    let registry = DeviceRegistry::new(backend.clone());
    let (handler, _results) = collector();
    let back = &backend.devices()[0];

    let mut pipeline =
        CapturePipeline::start(&registry, Box::new(StubAnalyzer::new()), handler, options())
            .unwrap();
    pipeline.stop();

    back.set_open_error(Some(BackendError::DeviceNotFound("virtual:virtual-back".to_string())));
    assert!(pipeline.resume().is_err());
    assert_eq!(pipeline.session().state(), CaptureSessionState::Idle);

    back.set_open_error(None);
    pipeline.resume().unwrap();
    assert_eq!(pipeline.session().state(), CaptureSessionState::Running);
    assert!(back.is_open());
}
