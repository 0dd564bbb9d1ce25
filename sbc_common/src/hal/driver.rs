//! Driver contract, bring-up report and HAL error types.
//!
//! This module defines:
//! - `Driver` trait - one bring-up unit per hardware family
//! - `HalError` enum - error taxonomy of the hardware layer
//! - `BringupReport` - the only externally visible outcome of bring-up

use crate::registry::RegistryError;
use serde::Serialize;
use thiserror::Error;

/// Error types for HAL operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HalError {
    /// Cyclic driver prerequisites or a malformed driver set. Fatal to
    /// bring-up; no `init` runs.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Access to physical memory or a device node was denied.
    #[error("Permission denied: {0} (try running as root)")]
    PermissionDenied(String),

    /// The hardware this driver handles is not present.
    #[error("Not applicable: {0}")]
    NotApplicable(String),

    /// Registry failure.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Operation invalid for the pin's current function.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// The pin is not wired on this CPU package, or is not a GPIO.
    #[error("Pin unavailable: {0}")]
    Unavailable(String),

    /// sysfs or device node I/O failed.
    #[error("I/O error: {0}")]
    Io(String),

    /// Bring-up already ran in this process.
    #[error("Bring-up already performed")]
    AlreadyInitialized,
}

impl From<std::io::Error> for HalError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::PermissionDenied => HalError::PermissionDenied(e.to_string()),
            _ => HalError::Io(e.to_string()),
        }
    }
}

/// A bring-up unit for one hardware family.
///
/// `C` is the context handed to `init`; the HAL passes its registries so a
/// driver can publish the pins and buses it brings up.
///
/// # Lifecycle
///
/// Drivers are created once at startup and live for the process lifetime.
/// The scheduler calls `init` at most once, after every name in
/// `prerequisites` has loaded.
///
/// # Outcome of `init`
///
/// | Return | Report |
/// |--------|--------|
/// | `Ok(true)` | Loaded |
/// | `Ok(false)` | Skipped (hardware absent) |
/// | `Err(HalError::NotApplicable(_))` | Skipped |
/// | any other `Err` | Failed |
pub trait Driver<C: ?Sized>: Send {
    /// Unique driver name (e.g. "allwinner-gpio").
    fn name(&self) -> &'static str;

    /// Drivers that must have loaded before this one may run.
    fn prerequisites(&self) -> &[&'static str] {
        &[]
    }

    /// Drivers preferably run before this one. Never gates execution.
    fn after(&self) -> &[&'static str] {
        &[]
    }

    /// Bring up the hardware family.
    ///
    /// Hardware detection must come first: a driver for absent hardware
    /// returns `Ok(false)` even when it also lacks privilege.
    fn init(&mut self, ctx: &C) -> Result<bool, HalError>;
}

/// Terminal state of one driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverState {
    /// `init` succeeded and the hardware is in use.
    Loaded,
    /// Not applicable, or a prerequisite did not load.
    Skipped,
    /// `init` returned an error.
    Failed,
}

/// A skipped or failed driver with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriverOutcome {
    /// Driver name.
    pub driver: String,
    /// Human-readable reason.
    pub reason: String,
}

/// Outcome of one bring-up. Immutable once produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BringupReport {
    /// Drivers in load order.
    pub loaded: Vec<String>,
    /// Drivers not applicable or blocked by a prerequisite.
    pub skipped: Vec<DriverOutcome>,
    /// Drivers whose `init` failed.
    pub failed: Vec<DriverOutcome>,
}

impl BringupReport {
    /// State `driver` ended in, if it took part in bring-up.
    pub fn state_of(&self, driver: &str) -> Option<DriverState> {
        if self.loaded.iter().any(|d| d == driver) {
            Some(DriverState::Loaded)
        } else if self.skipped.iter().any(|o| o.driver == driver) {
            Some(DriverState::Skipped)
        } else if self.failed.iter().any(|o| o.driver == driver) {
            Some(DriverState::Failed)
        } else {
            None
        }
    }

    /// Reason recorded for a skipped or failed driver.
    pub fn reason_of(&self, driver: &str) -> Option<&str> {
        self.skipped
            .iter()
            .chain(self.failed.iter())
            .find(|o| o.driver == driver)
            .map(|o| o.reason.as_str())
    }

    /// Whether any driver failed (skips are not failures).
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}
