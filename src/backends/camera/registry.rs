// SPDX-License-Identifier: GPL-3.0-only

//! Device registry
//!
//! Enumerates capture devices through the active backend, keeps only the
//! lens classes usable for document capture and picks the default device.

use super::types::*;
use super::{CaptureBackend, get_backend_for_type};
use crate::errors::ConfigurationError;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Device registry
///
/// Thin query layer over a [`CaptureBackend`]. Holds no device state; every
/// call to [`list_devices`](Self::list_devices) re-enumerates.
#[derive(Clone)]
pub struct DeviceRegistry {
    backend: Arc<dyn CaptureBackend>,
}

impl DeviceRegistry {
    pub fn new(backend: Arc<dyn CaptureBackend>) -> Self {
        Self { backend }
    }

    /// Create a registry for a backend type
    pub fn for_type(backend_type: CaptureBackendType) -> Self {
        info!(backend = %backend_type, "Creating device registry");
        Self::new(get_backend_for_type(backend_type))
    }

    /// Backend shared with sessions opened from this registry
    pub fn backend(&self) -> Arc<dyn CaptureBackend> {
        Arc::clone(&self.backend)
    }

    /// Enumerate wide-angle and telephoto devices at any position
    ///
    /// Order is the backend's enumeration order.
    pub fn list_devices(&self) -> Result<Vec<CaptureDevice>, ConfigurationError> {
        let devices = match self.backend.enumerate_devices() {
            Ok(devices) => devices,
            Err(e) => {
                warn!(error = %e, backend = %self.backend.backend_type(), "Device enumeration failed");
                return Err(ConfigurationError::NoDevices);
            }
        };

        let total = devices.len();
        let devices: Vec<CaptureDevice> = devices
            .into_iter()
            .filter(|device| {
                let keep = device.class.is_capture_class();
                if !keep {
                    debug!(device = %device.name, class = %device.class, "Skipping device class");
                }
                keep
            })
            .collect();

        info!(total, usable = devices.len(), "Capture devices enumerated");

        if devices.is_empty() {
            Err(ConfigurationError::NoDevices)
        } else {
            Ok(devices)
        }
    }

    /// Pick the default device: the back camera when present
    ///
    /// Falls back to the first listed device, since desktop webcams do not
    /// report a position.
    pub fn select_default(devices: &[CaptureDevice]) -> Result<CaptureDevice, ConfigurationError> {
        Self::select(devices, DevicePosition::Back)
            .or_else(|| devices.first().cloned())
            .ok_or(ConfigurationError::NoDevices)
    }

    /// First device at `position`, if any
    pub fn select(devices: &[CaptureDevice], position: DevicePosition) -> Option<CaptureDevice> {
        devices.iter().find(|d| d.position == position).cloned()
    }
}

impl std::fmt::Debug for DeviceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceRegistry")
            .field("backend_type", &self.backend.backend_type())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::virtual_camera::{VirtualBackend, VirtualDevice};

    fn device(id: &str, position: DevicePosition, class: DeviceClass) -> CaptureDevice {
        CaptureDevice {
            id: id.to_string(),
            name: id.to_string(),
            path: format!("virtual:{}", id),
            position,
            class,
        }
    }

    #[test]
    fn filters_out_non_capture_classes() {
        let backend = VirtualBackend::new(vec![
            VirtualDevice::new(device("ir", DevicePosition::Front, DeviceClass::Infrared)),
            VirtualDevice::new(device("tele", DevicePosition::Back, DeviceClass::Telephoto)),
            VirtualDevice::new(device("uw", DevicePosition::Back, DeviceClass::UltraWide)),
        ]);
        let registry = DeviceRegistry::new(Arc::new(backend));

        let devices = registry.list_devices().unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].id, "tele");
    }

    #[test]
    fn only_unusable_devices_is_no_devices() {
        let backend = VirtualBackend::new(vec![VirtualDevice::new(device(
            "ir",
            DevicePosition::Front,
            DeviceClass::Infrared,
        ))]);
        let registry = DeviceRegistry::new(Arc::new(backend));
        assert_eq!(registry.list_devices(), Err(ConfigurationError::NoDevices));
    }

    #[test]
    fn select_default_falls_back_to_first() {
        let devices = vec![
            device("a", DevicePosition::Unspecified, DeviceClass::WideAngle),
            device("b", DevicePosition::Front, DeviceClass::WideAngle),
        ];
        assert_eq!(DeviceRegistry::select_default(&devices).unwrap().id, "a");
        assert_eq!(
            DeviceRegistry::select_default(&[]),
            Err(ConfigurationError::NoDevices)
        );
    }
}
