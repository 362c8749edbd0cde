// SPDX-License-Identifier: GPL-3.0-only

//! Backend abstraction layer for capture hardware and sensors
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                Pipeline Layer               │
//! └────────────────────┬────────────────────────┘
//!                      │
//! ┌────────────────────┴────────────────────────┐
//! │                Backend Layer                │
//! │  ┌──────────────────┐  ┌─────────────────┐  │
//! │  │      Camera      │  │   Orientation   │  │
//! │  │ (V4L2 / virtual) │  │ (iio over D-Bus)│  │
//! │  └──────────────────┘  └─────────────────┘  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`camera`]: Device enumeration and frame capture
//! - [`orientation_sensor`]: Accelerometer orientation from iio-sensor-proxy

pub mod camera;
pub mod orientation_sensor;
