//! Registries and the context handed to every driver.

use crate::bus::{I2cBusRef, OneWireBusRef, SpiPortRef};
use crate::drivers::allwinner::FamilyTable;
use crate::pin::Pin;
use crate::sysfs::SysfsGpio;
use parking_lot::RwLock;
use sbc_common::config::{HalConfig, PathsConfig};
use sbc_common::hal::driver::HalError;
use sbc_common::hal::header::{HeaderPosition, HeaderRegistry};
use sbc_common::registry::{RegistryError, ResourceRegistry};
use std::sync::Arc;

/// One registry per resource kind.
///
/// Built empty at startup, filled by drivers during bring-up. Tests build
/// their own instances.
#[derive(Debug)]
pub struct Registries {
    /// GPIO and power pins (`PA12`, alias `GPIO12`, `P1_3`).
    pub pins: ResourceRegistry<Arc<Pin>>,
    /// I2C buses (`I2C0`, alias `/dev/i2c-0`).
    pub i2c: ResourceRegistry<Arc<I2cBusRef>>,
    /// SPI ports (`SPI0.0`, alias `/dev/spidev0.0`).
    pub spi: ResourceRegistry<Arc<SpiPortRef>>,
    /// 1-Wire masters (`OneWire1`).
    pub onewire: ResourceRegistry<Arc<OneWireBusRef>>,
    /// Physical headers.
    pub headers: HeaderRegistry,
}

impl Registries {
    /// Empty registries.
    pub fn new() -> Self {
        Self {
            pins: ResourceRegistry::new("pin"),
            i2c: ResourceRegistry::new("i2c"),
            spi: ResourceRegistry::new("spi"),
            onewire: ResourceRegistry::new("onewire"),
            headers: HeaderRegistry::new(),
        }
    }

    /// Resolve a pin by canonical name or alias.
    pub fn pin(&self, name: &str) -> Result<Arc<Pin>, HalError> {
        self.pins
            .by_name(name)
            .ok_or_else(|| RegistryError::UnknownName(name.to_string()).into())
    }

    /// Header position of a pin given by canonical name or alias
    /// (`PA2`, `GPIO2`, `P1_3`). `None` when the pin is on no header.
    pub fn header_position(&self, pin: &str) -> Option<HeaderPosition> {
        let canonical = self.pins.canonical_name(pin);
        self.headers.position(canonical.as_deref().unwrap_or(pin))
    }

    /// Whether a pin, by any of its names, sits on a header.
    pub fn is_connected(&self, pin: &str) -> bool {
        self.header_position(pin).is_some()
    }
}

impl Default for Registries {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything a driver may touch during `init`.
#[derive(Debug)]
pub struct HalContext {
    config: HalConfig,
    registries: Registries,
    sysfs: RwLock<Option<Arc<SysfsGpio>>>,
    family: RwLock<Option<&'static FamilyTable>>,
}

impl HalContext {
    /// Fresh context over `config`.
    pub fn new(config: HalConfig) -> Self {
        Self {
            config,
            registries: Registries::new(),
            sysfs: RwLock::new(None),
            family: RwLock::new(None),
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &HalConfig {
        &self.config
    }

    /// Filesystem roots.
    pub fn paths(&self) -> &PathsConfig {
        &self.config.paths
    }

    /// The registries.
    pub fn registries(&self) -> &Registries {
        &self.registries
    }

    /// Sysfs GPIO catalog, once `sysfs-gpio` has loaded.
    pub fn sysfs(&self) -> Option<Arc<SysfsGpio>> {
        self.sysfs.read().clone()
    }

    pub(crate) fn set_sysfs(&self, sysfs: Arc<SysfsGpio>) {
        *self.sysfs.write() = Some(sysfs);
    }

    /// CPU family detected by the register driver.
    pub fn family(&self) -> Option<&'static FamilyTable> {
        *self.family.read()
    }

    pub(crate) fn set_family(&self, family: &'static FamilyTable) {
        *self.family.write() = Some(family);
    }
}
