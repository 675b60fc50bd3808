/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 17/10/26
******************************************************************************/

//! Acquisition configuration.
//!
//! Settings are plain JSON. Every field has a default, so `{}` is a valid
//! configuration.
//!
//! # Examples
//!
//! ```
//! use acquisition_rs::config::AcquisitionConfig;
//!
//! let config = AcquisitionConfig::from_json_str(r#"{"name": "timelapse"}"#).unwrap();
//! assert_eq!(config.name, "timelapse");
//! assert_eq!(config.notification_capacity, 100);
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default acquisition name.
pub const DEFAULT_ACQUISITION_NAME: &str = "default_acquisition_name";

/// Default capacity of the notification stream.
pub const DEFAULT_NOTIFICATION_CAPACITY: usize = 100;

/// Errors raised while loading or checking a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {message}")]
    Io {
        /// File that failed to load.
        path: PathBuf,
        /// OS error message.
        message: String,
    },

    /// The JSON was invalid.
    #[error("invalid config: {message}")]
    Parse {
        /// Deserializer message.
        message: String,
    },

    /// The notification stream needs room for at least one notification.
    #[error("notification_capacity must be at least 1")]
    ZeroCapacity,

    /// The acquisition name was empty.
    #[error("acquisition name cannot be empty")]
    EmptyName,
}

/// Settings of one acquisition run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Name of the acquisition; also names the dataset.
    pub name: String,
    /// Save directory. Data stays in memory when unset.
    pub directory: Option<PathBuf>,
    /// Capacity of the bounded notification stream.
    pub notification_capacity: usize,
    /// Log every notification at debug level.
    pub debug: bool,
    /// Name of the viewer attached to the acquisition, if any.
    pub viewer: Option<String>,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_ACQUISITION_NAME.to_string(),
            directory: None,
            notification_capacity: DEFAULT_NOTIFICATION_CAPACITY,
            debug: false,
            viewer: None,
        }
    }
}

impl AcquisitionConfig {
    /// Creates a default configuration with the given name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Parses and checks a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for invalid JSON, or the error from
    /// [`validate`](Self::validate).
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and checks a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`from_json_str`](Self::from_json_str).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_json_str(&json)
    }

    /// Checks the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroCapacity`] or [`ConfigError::EmptyName`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.notification_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        Ok(())
    }
}
