//! Configuration loading traits and types.
//!
//! This module provides a standardized way to load TOML configuration files
//! for the SBC hardware layer and the tools built on it.
//!
//! # Usage
//!
//! ```rust,no_run
//! use sbc_common::config::{ConfigLoader, ConfigError, HalConfig};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = HalConfig::load(Path::new("/etc/sbc/hal.toml"))?;
//!     config.validate()?;
//!     println!("sysfs at {}", config.paths.sysfs_root.display());
//!     Ok(())
//! }
//! ```

use crate::consts::{
    DEFAULT_DEV_ROOT, DEFAULT_MEM_DEVICE, DEFAULT_PROCFS_ROOT, DEFAULT_SYSFS_ROOT,
    HAL_SERVICE_NAME,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Common configuration fields.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "sbc_hal"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

fn default_service_name() -> String {
    HAL_SERVICE_NAME.to_string()
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            service_name: default_service_name(),
        }
    }
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Filesystem roots probed by the drivers.
///
/// Tests point these at temporary directories holding a fake tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Root of sysfs (`/sys`).
    pub sysfs_root: PathBuf,
    /// Root of device nodes (`/dev`).
    pub dev_root: PathBuf,
    /// Root of procfs (`/proc`).
    pub procfs_root: PathBuf,
    /// Device used to map physical memory.
    pub mem_device: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            sysfs_root: PathBuf::from(DEFAULT_SYSFS_ROOT),
            dev_root: PathBuf::from(DEFAULT_DEV_ROOT),
            procfs_root: PathBuf::from(DEFAULT_PROCFS_ROOT),
            mem_device: PathBuf::from(DEFAULT_MEM_DEVICE),
        }
    }
}

/// Driver selection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DriversConfig {
    /// Drivers never handed to the bring-up scheduler.
    pub disabled: Vec<String>,
    /// Force a CPU family (`"h3"`, `"a64"`) instead of probing the device tree.
    pub family: Option<String>,
}

impl DriversConfig {
    /// Whether the named driver was disabled in configuration.
    pub fn is_disabled(&self, name: &str) -> bool {
        self.disabled.iter().any(|d| d == name)
    }
}

/// An extra physical header described in configuration.
///
/// # TOML Example
///
/// ```toml
/// [[headers]]
/// name = "J8"
/// rows = [["GROUND", "V3_3"], ["PA12", "PA11"]]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderConfig {
    /// Header name, used as the alias prefix (`J8_3`).
    pub name: String,
    /// Pin names, row-major.
    pub rows: Vec<Vec<String>>,
}

/// Top-level configuration of the hardware layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HalConfig {
    /// Logging and service identity.
    pub shared: SharedConfig,
    /// Filesystem roots.
    pub paths: PathsConfig,
    /// Driver selection.
    pub drivers: DriversConfig,
    /// Additional headers.
    pub headers: Vec<HeaderConfig>,
}

impl HalConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - `service_name` is empty
    /// - a header has an empty name or no pins
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        for header in &self.headers {
            if header.name.is_empty() {
                return Err(ConfigError::ValidationError(
                    "header name cannot be empty".to_string(),
                ));
            }
            if header.rows.iter().all(|row| row.is_empty()) {
                return Err(ConfigError::ValidationError(format!(
                    "header '{}' has no pins",
                    header.name
                )));
            }
        }
        Ok(())
    }

    /// Load from `path`, falling back to defaults when the file is absent.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(ConfigError::FileNotFound) => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }
}

/// Trait for loading configuration from TOML files.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Any serde-deserializable struct can use ConfigLoader.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}
