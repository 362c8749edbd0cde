// SPDX-License-Identifier: GPL-3.0-only

//! Device orientation from iio-sensor-proxy
//!
//! Talks to `net.hadess.SensorProxy` on the system bus. The accelerometer
//! must be claimed before the proxy publishes readings; the claim is dropped
//! by the service when our connection goes away, or explicitly through
//! [`OrientationSensor::release`].

use crate::constants::sensor_proxy;
use crate::errors::{AppError, AppResult};
use crate::pipeline::orientation::OrientationReading;
use futures::StreamExt;
use tracing::{debug, info, warn};

/// Claimed accelerometer on the system bus
pub struct OrientationSensor {
    proxy: zbus::Proxy<'static>,
}

impl OrientationSensor {
    /// Connect to iio-sensor-proxy and claim the accelerometer
    pub async fn connect() -> AppResult<Self> {
        let connection = zbus::Connection::system().await?;
        let proxy = zbus::Proxy::new(
            &connection,
            sensor_proxy::SERVICE,
            sensor_proxy::PATH,
            sensor_proxy::INTERFACE,
        )
        .await?;

        let has_accelerometer: bool = proxy
            .get_property(sensor_proxy::HAS_ACCELEROMETER_PROPERTY)
            .await?;
        if !has_accelerometer {
            return Err(AppError::Sensor("No accelerometer available".to_string()));
        }

        let () = proxy.call("ClaimAccelerometer", &()).await?;
        info!("Accelerometer claimed");

        Ok(Self { proxy })
    }

    /// Latest reading published by the service
    pub async fn current(&self) -> AppResult<OrientationReading> {
        let value: String = self
            .proxy
            .get_property(sensor_proxy::ORIENTATION_PROPERTY)
            .await?;
        Ok(OrientationReading::from_sensor_proxy(&value))
    }

    /// Report the current reading, then every change, until the service goes away
    pub async fn watch<F>(&self, mut on_reading: F) -> AppResult<()>
    where
        F: FnMut(OrientationReading),
    {
        let mut changes = self
            .proxy
            .receive_property_changed::<String>(sensor_proxy::ORIENTATION_PROPERTY)
            .await;

        on_reading(self.current().await?);

        while let Some(change) = changes.next().await {
            match change.get().await {
                Ok(value) => {
                    debug!(value = %value, "Accelerometer orientation changed");
                    on_reading(OrientationReading::from_sensor_proxy(&value));
                }
                Err(e) => warn!(error = %e, "Could not read orientation change"),
            }
        }

        info!("Orientation change stream ended");
        Ok(())
    }

    /// Give the accelerometer back to the service
    pub async fn release(self) -> AppResult<()> {
        let () = self.proxy.call("ReleaseAccelerometer", &()).await?;
        debug!("Accelerometer released");
        Ok(())
    }
}

impl std::fmt::Debug for OrientationSensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrientationSensor")
            .field("service", &sensor_proxy::SERVICE)
            .finish()
    }
}
