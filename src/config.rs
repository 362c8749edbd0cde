// SPDX-License-Identifier: GPL-3.0-only

//! User configuration
//!
//! Stored as JSON in `$XDG_CONFIG_HOME/prescreen-capture/config.json`. A
//! missing file means defaults; unknown keys are ignored and missing keys
//! take their default values.

use crate::backends::camera::{CaptureBackendType, DevicePosition, Resolution};
use crate::constants::{API_KEY_ENV, DEFAULT_CONFIDENCE_THRESHOLD, SessionPreset};
use crate::errors::{AppError, AppResult};
use crate::pipeline::VideoGravity;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Directory under the user config dir
pub const CONFIG_DIR_NAME: &str = "prescreen-capture";

pub const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Analyzer API key; the environment variable takes precedence
    pub api_key: Option<String>,
    /// Camera to prefer over the default (back) camera
    pub preferred_position: Option<DevicePosition>,
    /// Capture resolution preset
    pub preset: SessionPreset,
    /// Results below this confidence are not printed
    pub confidence_threshold: f32,
    /// Capture backend
    pub backend: CaptureBackendType,
    /// Preview scaling mode
    pub video_gravity: VideoGravity,
    /// Follow the device orientation sensor
    pub orientation_sensor: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            preferred_position: None,
            preset: SessionPreset::default(),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            backend: CaptureBackendType::default(),
            video_gravity: VideoGravity::default(),
            orientation_sensor: true,
        }
    }
}

impl Config {
    /// Location of the config file, if the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load from the default location
    pub fn load() -> AppResult<Self> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => {
                warn!("No config directory on this platform, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load from `path`; a missing file yields the defaults
    pub fn load_from(path: &Path) -> AppResult<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        let config: Config = serde_json::from_str(&contents)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        info!(path = %path.display(), "Loaded config");
        Ok(config.validated())
    }

    /// Write to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        debug!(path = %path.display(), "Saved config");
        Ok(())
    }

    /// Clamp out-of-range values
    fn validated(mut self) -> Self {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            warn!(
                threshold = self.confidence_threshold,
                default = DEFAULT_CONFIDENCE_THRESHOLD,
                "Confidence threshold out of range, using default"
            );
            self.confidence_threshold = DEFAULT_CONFIDENCE_THRESHOLD;
        }
        self
    }

    /// API key from the environment, falling back to the config file
    pub fn api_key(&self) -> Option<String> {
        self.api_key_with(None)
    }

    /// API key with a command line value taking precedence over the
    /// environment and the config file
    pub fn api_key_with(&self, flag: Option<&str>) -> Option<String> {
        resolve_api_key(
            flag,
            std::env::var(API_KEY_ENV).ok().as_deref(),
            self.api_key.as_deref(),
        )
    }

    pub fn resolution(&self) -> Resolution {
        self.preset.resolution()
    }
}

/// First non-blank key of flag, environment and file, in that order
fn resolve_api_key(flag: Option<&str>, env: Option<&str>, file: Option<&str>) -> Option<String> {
    [flag, env, file]
        .into_iter()
        .flatten()
        .find(|key| !key.trim().is_empty())
        .map(str::to_string)
}
