// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for device enumeration and selection

mod common;

use common::device;
use prescreen_capture::backends::camera::virtual_camera::{VirtualBackend, VirtualDevice};
use prescreen_capture::backends::camera::{DeviceClass, DevicePosition, DeviceRegistry};
use prescreen_capture::errors::ConfigurationError;
use std::sync::Arc;

fn registry(devices: Vec<prescreen_capture::CaptureDevice>) -> DeviceRegistry {
    let devices = devices.into_iter().map(VirtualDevice::new).collect();
    DeviceRegistry::new(Arc::new(VirtualBackend::new(devices)))
}

#[test]
fn test_back_camera_is_default() {
    let registry = registry(vec![
        device("back-wide", DevicePosition::Back),
        device("front-wide", DevicePosition::Front),
    ]);

    let devices = registry.list_devices().unwrap();
    assert_eq!(devices.len(), 2);

    let default = DeviceRegistry::select_default(&devices).unwrap();
    assert_eq!(default.id, "back-wide");
}

#[test]
fn test_back_camera_wins_regardless_of_order() {
    let registry = registry(vec![
        device("front-wide", DevicePosition::Front),
        device("back-wide", DevicePosition::Back),
    ]);

    let devices = registry.list_devices().unwrap();
    let default = DeviceRegistry::select_default(&devices).unwrap();
    assert_eq!(default.position, DevicePosition::Back);
}

#[test]
fn test_first_device_without_back_camera() {
    let registry = registry(vec![
        device("usb-webcam", DevicePosition::Unspecified),
        device("front-wide", DevicePosition::Front),
    ]);

    let devices = registry.list_devices().unwrap();
    let default = DeviceRegistry::select_default(&devices).unwrap();
    assert_eq!(default.id, "usb-webcam");
}

#[test]
fn test_only_capture_classes_are_listed() {
    let mut telephoto = device("back-tele", DevicePosition::Back);
    telephoto.class = DeviceClass::Telephoto;
    let mut ultra_wide = device("back-ultra", DevicePosition::Back);
    ultra_wide.class = DeviceClass::UltraWide;
    let mut infrared = device("front-ir", DevicePosition::Front);
    infrared.class = DeviceClass::Infrared;

    let registry = registry(vec![
        ultra_wide,
        device("back-wide", DevicePosition::Back),
        infrared,
        telephoto,
    ]);

    let ids: Vec<String> = registry
        .list_devices()
        .unwrap()
        .into_iter()
        .map(|d| d.id)
        .collect();
    assert_eq!(ids, vec!["back-wide", "back-tele"]);
}

#[test]
fn test_no_devices() {
    let empty = registry(Vec::new());
    assert_eq!(empty.list_devices(), Err(ConfigurationError::NoDevices));

    let mut infrared = device("front-ir", DevicePosition::Front);
    infrared.class = DeviceClass::Infrared;
    let unusable = registry(vec![infrared]);
    assert_eq!(unusable.list_devices(), Err(ConfigurationError::NoDevices));

    assert_eq!(
        DeviceRegistry::select_default(&[]),
        Err(ConfigurationError::NoDevices)
    );
}

#[test]
fn test_select_by_position() {
    let devices = vec![
        device("back-wide", DevicePosition::Back),
        device("front-wide", DevicePosition::Front),
    ];

    let front = DeviceRegistry::select(&devices, DevicePosition::Front).unwrap();
    assert_eq!(front.id, "front-wide");
    assert!(DeviceRegistry::select(&devices, DevicePosition::Unspecified).is_none());
}

#[test]
fn test_enumeration_is_repeatable() {
    let registry = registry(vec![device("back-wide", DevicePosition::Back)]);
    assert_eq!(registry.list_devices(), registry.list_devices());
}
