//! HAL core: configuration, driver set and bring-up.
//!
//! The `Hal` struct is the main entry point. It owns the context the
//! drivers populate and the scheduler that runs them.

use crate::bringup::Bringup;
use crate::context::{HalContext, Registries};
use crate::drivers::BUILTIN_DRIVERS;
use crate::pin::Pin;
use sbc_common::config::HalConfig;
use sbc_common::hal::driver::{BringupReport, Driver, HalError};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A hardware abstraction layer instance.
pub struct Hal {
    context: HalContext,
    bringup: Bringup<HalContext>,
}

impl Hal {
    /// Create a HAL with every built-in driver not disabled in `config`.
    ///
    /// # Errors
    /// `Configuration` if the configuration does not validate.
    pub fn new(config: HalConfig) -> Result<Self, HalError> {
        let mut hal = Self::bare(config)?;
        for (name, factory) in BUILTIN_DRIVERS {
            if hal.context.config().drivers.is_disabled(name) {
                info!("Driver '{}' disabled by configuration", name);
                continue;
            }
            hal.bringup.register(factory())?;
        }
        Ok(hal)
    }

    /// Create a HAL with no drivers registered.
    pub fn bare(config: HalConfig) -> Result<Self, HalError> {
        config
            .validate()
            .map_err(|e| HalError::Configuration(e.to_string()))?;
        Ok(Self {
            context: HalContext::new(config),
            bringup: Bringup::new(),
        })
    }

    /// Add a driver. Only allowed before [`Hal::init`].
    pub fn register(&mut self, driver: Box<dyn Driver<HalContext>>) -> Result<(), HalError> {
        self.bringup.register(driver)
    }

    /// Names of the registered drivers, in registration order.
    pub fn driver_names(&self) -> Vec<&'static str> {
        self.bringup.names()
    }

    /// Bring up every driver. Later calls return the first report.
    ///
    /// # Errors
    /// `Configuration` when driver prerequisites form a cycle; nothing has
    /// been initialized in that case.
    pub fn init(&mut self) -> Result<BringupReport, HalError> {
        let report = self.bringup.run(&self.context)?;
        let registries = self.context.registries();
        debug!(
            "{} pins, {} I2C, {} SPI, {} 1-Wire, {} headers",
            registries.pins.len(),
            registries.i2c.len(),
            registries.spi.len(),
            registries.onewire.len(),
            registries.headers.all().len()
        );
        Ok(report)
    }

    /// Report of the completed bring-up.
    pub fn report(&self) -> Option<&BringupReport> {
        self.bringup.report()
    }

    /// The context shared with drivers.
    pub fn context(&self) -> &HalContext {
        &self.context
    }

    /// The resource registries.
    pub fn registries(&self) -> &Registries {
        self.context.registries()
    }

    /// Resolve a pin by name or alias.
    pub fn pin(&self, name: &str) -> Result<Arc<Pin>, HalError> {
        self.registries().pin(name)
    }

    /// Release edge detection on every pin.
    pub fn shutdown(&self) {
        for (name, pin) in self.registries().pins.all() {
            if let Err(e) = pin.halt() {
                warn!("Failed to halt {}: {}", name, e);
            }
        }
        info!("HAL shut down");
    }
}

impl std::fmt::Debug for Hal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hal")
            .field("drivers", &self.bringup.names())
            .field("report", &self.bringup.report())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sbc_common::config::HeaderConfig;

    #[test]
    fn registers_builtin_drivers() {
        let hal = Hal::new(HalConfig::default()).unwrap();
        assert_eq!(hal.driver_names().len(), BUILTIN_DRIVERS.len());
        assert!(hal.report().is_none());
    }

    #[test]
    fn disabled_drivers_are_not_registered() {
        let mut config = HalConfig::default();
        config.drivers.disabled = vec!["sysfs-spi".to_string(), "board-headers".to_string()];
        let hal = Hal::new(config).unwrap();
        let names = hal.driver_names();
        assert!(!names.contains(&"sysfs-spi"));
        assert!(!names.contains(&"board-headers"));
        assert!(names.contains(&"sysfs-i2c"));
    }

    #[test]
    fn invalid_config_rejected() {
        let mut config = HalConfig::default();
        config.headers.push(HeaderConfig {
            name: String::new(),
            rows: vec![vec!["GROUND".to_string()]],
        });
        assert!(matches!(Hal::new(config), Err(HalError::Configuration(_))));
    }

    #[test]
    fn unknown_pin() {
        let hal = Hal::bare(HalConfig::default()).unwrap();
        assert!(matches!(hal.pin("PA0"), Err(HalError::Registry(_))));
    }
}
