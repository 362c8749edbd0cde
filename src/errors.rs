// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the capture pipeline

use crate::analyzer::AnalyzerError;
use crate::backends::camera::BackendError;
use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Top-level error type used by the command line front end
#[derive(Debug, Clone)]
pub enum AppError {
    /// Capture pipeline could not be configured or started
    Configuration(ConfigurationError),
    /// Analyzer refused to initialize
    Analyzer(AnalyzerError),
    /// Configuration file errors
    Config(String),
    /// Orientation sensor errors
    Sensor(String),
    /// Generic error with message
    Other(String),
}

/// Errors raised while configuring or (re)starting a capture session
///
/// Each failure is reported once to the caller; nothing is retried
/// internally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// No device of the capture classes exists
    NoDevices,
    /// The device could not be opened (busy, permission denied, unplugged)
    InputUnavailable {
        device: String,
        reason: BackendError,
    },
    /// `configure` called on a session that is not Idle
    AlreadyConfigured,
    /// `start` called before a successful `configure`
    NotConfigured,
}

impl ConfigurationError {
    pub fn input_unavailable(device: &str, reason: BackendError) -> Self {
        ConfigurationError::InputUnavailable {
            device: device.to_string(),
            reason,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Configuration(e) => write!(f, "Capture error: {}", e),
            AppError::Analyzer(e) => write!(f, "{}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Sensor(msg) => write!(f, "Orientation sensor error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationError::NoDevices => write!(f, "No capture devices found"),
            ConfigurationError::InputUnavailable { device, reason } => {
                write!(f, "Input unavailable for {}: {}", device, reason)
            }
            ConfigurationError::AlreadyConfigured => write!(f, "Session already configured"),
            ConfigurationError::NotConfigured => write!(f, "Session not configured"),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for ConfigurationError {}

impl From<ConfigurationError> for AppError {
    fn from(err: ConfigurationError) -> Self {
        AppError::Configuration(err)
    }
}

impl From<AnalyzerError> for AppError {
    fn from(err: AnalyzerError) -> Self {
        AppError::Analyzer(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<zbus::Error> for AppError {
    fn from(err: zbus::Error) -> Self {
        AppError::Sensor(err.to_string())
    }
}
