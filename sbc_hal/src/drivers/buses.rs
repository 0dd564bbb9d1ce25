//! Bus discovery from device nodes and sysfs.

use crate::bus::{I2cBusRef, I2cPins, OneWireBusRef, SpiPins, SpiPortRef, pin_with_role};
use crate::context::HalContext;
use crate::sysfs::io_error;
use sbc_common::hal::driver::{Driver, HalError};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Entries of `dir` whose file name parses with `parse`, sorted by key.
/// A missing directory yields nothing.
fn scan<K: Ord>(
    dir: &Path,
    parse: impl Fn(&str) -> Option<K>,
) -> Result<Vec<(K, PathBuf)>, HalError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(io_error(dir, e)),
    };
    let mut found = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| io_error(dir, e))?;
        if let Some(key) = parse(&entry.file_name().to_string_lossy()) {
            found.push((key, entry.path()));
        }
    }
    found.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(found)
}

fn parse_i2c(name: &str) -> Option<u32> {
    name.strip_prefix("i2c-")?.parse().ok()
}

fn parse_spidev(name: &str) -> Option<(u32, u32)> {
    let (bus, cs) = name.strip_prefix("spidev")?.split_once('.')?;
    Some((bus.parse().ok()?, cs.parse().ok()?))
}

fn parse_w1_master(name: &str) -> Option<u32> {
    name.strip_prefix("w1_bus_master")?.parse().ok()
}

/// `/dev/i2c-N` adapters.
#[derive(Debug, Default)]
pub struct SysfsI2c;

impl Driver<HalContext> for SysfsI2c {
    fn name(&self) -> &'static str {
        "sysfs-i2c"
    }

    fn after(&self) -> &[&'static str] {
        &["allwinner-gpio"]
    }

    fn init(&mut self, ctx: &HalContext) -> Result<bool, HalError> {
        let found = scan(&ctx.paths().dev_root, parse_i2c)?;
        if found.is_empty() {
            return Ok(false);
        }
        let registries = ctx.registries();
        for (number, path) in found {
            let scl = pin_with_role(&registries.pins, &format!("I2C{number}_SCL"));
            let sda = pin_with_role(&registries.pins, &format!("I2C{number}_SDA"));
            let pins = scl.zip(sda).map(|(scl, sda)| I2cPins { scl, sda });
            let bus = Arc::new(I2cBusRef::new(number, &path, pins));
            registries.i2c.register(bus.name(), Arc::clone(&bus))?;
            registries
                .i2c
                .register_alias(&path.to_string_lossy(), bus.name())?;
            debug!("{} at {}", bus.name(), path.display());
        }
        info!("{} I2C buses", registries.i2c.len());
        Ok(true)
    }
}

/// `/dev/spidevB.C` ports.
#[derive(Debug, Default)]
pub struct SysfsSpi;

impl SysfsSpi {
    fn pins(ctx: &HalContext, bus: u32, cs: u32) -> Option<SpiPins> {
        let pins = &ctx.registries().pins;
        let role = |signal: &str| pin_with_role(pins, &format!("SPI{bus}_{signal}"));
        Some(SpiPins {
            clk: role("CLK")?,
            mosi: role("MOSI")?,
            miso: role("MISO")?,
            cs: role(&format!("CS{cs}"))?,
        })
    }
}

impl Driver<HalContext> for SysfsSpi {
    fn name(&self) -> &'static str {
        "sysfs-spi"
    }

    fn after(&self) -> &[&'static str] {
        &["allwinner-gpio"]
    }

    fn init(&mut self, ctx: &HalContext) -> Result<bool, HalError> {
        let found = scan(&ctx.paths().dev_root, parse_spidev)?;
        if found.is_empty() {
            return Ok(false);
        }
        let registry = &ctx.registries().spi;
        for ((bus, cs), path) in found {
            let port = Arc::new(SpiPortRef::new(bus, cs, &path, Self::pins(ctx, bus, cs)));
            registry.register(port.name(), Arc::clone(&port))?;
            registry.register_alias(&path.to_string_lossy(), port.name())?;
            debug!("{} at {}", port.name(), path.display());
        }
        info!("{} SPI ports", registry.len());
        Ok(true)
    }
}

/// Kernel w1 bus masters.
#[derive(Debug, Default)]
pub struct SysfsOneWire;

impl Driver<HalContext> for SysfsOneWire {
    fn name(&self) -> &'static str {
        "sysfs-onewire"
    }

    fn init(&mut self, ctx: &HalContext) -> Result<bool, HalError> {
        let devices = ctx.paths().sysfs_root.join("bus/w1/devices");
        let found = scan(&devices, parse_w1_master)?;
        if found.is_empty() {
            return Ok(false);
        }
        let registry = &ctx.registries().onewire;
        for (number, _) in found {
            let bus = Arc::new(OneWireBusRef::new(number, &devices));
            registry.register(bus.name(), Arc::clone(&bus))?;
        }
        info!("{} 1-Wire masters", registry.len());
        Ok(true)
    }
}

/// Factory for the I2C discovery driver.
pub fn create_i2c_driver() -> Box<dyn Driver<HalContext>> {
    Box::new(SysfsI2c)
}

/// Factory for the SPI discovery driver.
pub fn create_spi_driver() -> Box<dyn Driver<HalContext>> {
    Box::new(SysfsSpi)
}

/// Factory for the 1-Wire discovery driver.
pub fn create_onewire_driver() -> Box<dyn Driver<HalContext>> {
    Box::new(SysfsOneWire)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::allwinner::{register_bank, tables};
    use sbc_common::config::HalConfig;
    use tempfile::TempDir;

    fn context(tmp: &TempDir) -> HalContext {
        let mut config = HalConfig::default();
        config.paths.sysfs_root = tmp.path().join("sys");
        config.paths.dev_root = tmp.path().join("dev");
        HalContext::new(config)
    }

    #[test]
    fn node_names() {
        assert_eq!(parse_i2c("i2c-10"), Some(10));
        assert_eq!(parse_i2c("i2c-dev"), None);
        assert_eq!(parse_spidev("spidev1.0"), Some((1, 0)));
        assert_eq!(parse_spidev("spidev1"), None);
        assert_eq!(parse_w1_master("w1_bus_master2"), Some(2));
        assert_eq!(parse_w1_master("28-0316a2794aff"), None);
    }

    #[test]
    fn nothing_found_is_not_used() {
        let tmp = TempDir::new().unwrap();
        let ctx = context(&tmp);
        assert!(!create_i2c_driver().init(&ctx).unwrap());
        assert!(!create_spi_driver().init(&ctx).unwrap());
        assert!(!create_onewire_driver().init(&ctx).unwrap());
    }

    #[test]
    fn i2c_buses_with_pins() {
        let tmp = TempDir::new().unwrap();
        let dev = tmp.path().join("dev");
        fs::create_dir_all(&dev).unwrap();
        fs::write(dev.join("i2c-0"), "").unwrap();
        fs::write(dev.join("i2c-7"), "").unwrap();
        fs::write(dev.join("null"), "").unwrap();
        let ctx = context(&tmp);
        register_bank(&ctx, &tables::H3, &tables::H3.main).unwrap();

        assert!(create_i2c_driver().init(&ctx).unwrap());
        let i2c = &ctx.registries().i2c;
        assert_eq!(i2c.len(), 2);
        let bus = i2c.by_name(&dev.join("i2c-0").to_string_lossy()).unwrap();
        assert_eq!(bus.name(), "I2C0");
        let pins = bus.pins().unwrap();
        assert_eq!((pins.scl.name(), pins.sda.name()), ("PA11", "PA12"));
        assert!(i2c.by_name("I2C7").unwrap().pins().is_none());
    }

    #[test]
    fn spi_ports_with_pins() {
        let tmp = TempDir::new().unwrap();
        let dev = tmp.path().join("dev");
        fs::create_dir_all(&dev).unwrap();
        fs::write(dev.join("spidev0.0"), "").unwrap();
        fs::write(dev.join("spidev1.1"), "").unwrap();
        let ctx = context(&tmp);
        register_bank(&ctx, &tables::H3, &tables::H3.main).unwrap();

        assert!(create_spi_driver().init(&ctx).unwrap());
        let spi = &ctx.registries().spi;
        let port = spi.by_name("SPI0.0").unwrap();
        let pins = port.pins().unwrap();
        assert_eq!(pins.clk.name(), "PC2");
        assert_eq!(pins.cs.name(), "PC3");
        // no SPI1_CS1 on the H3
        assert!(spi.by_name("SPI1.1").unwrap().pins().is_none());
    }

    #[test]
    fn onewire_masters() {
        let tmp = TempDir::new().unwrap();
        let devices = tmp.path().join("sys/bus/w1/devices");
        fs::create_dir_all(devices.join("w1_bus_master1")).unwrap();
        fs::create_dir_all(devices.join("28-0316a2794aff")).unwrap();
        let ctx = context(&tmp);

        assert!(create_onewire_driver().init(&ctx).unwrap());
        let bus = ctx.registries().onewire.by_name("OneWire1").unwrap();
        assert_eq!(bus.path(), devices.join("w1_bus_master1"));
        assert_eq!(ctx.registries().onewire.len(), 1);
    }
}
