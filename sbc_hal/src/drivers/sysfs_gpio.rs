//! Generic GPIO through `/sys/class/gpio`.
//!
//! Publishes every line of every gpio chip as `GPIO<n>`. Register drivers
//! that run later replace these entries with register-backed pins and keep
//! the sysfs line as their shadow.

use crate::context::HalContext;
use crate::pin::Pin;
use crate::sysfs::SysfsGpio;
use sbc_common::hal::driver::{Driver, HalError};
use std::sync::Arc;
use tracing::info;

/// Sysfs GPIO driver.
#[derive(Debug, Default)]
pub struct SysfsGpioDriver;

impl Driver<HalContext> for SysfsGpioDriver {
    fn name(&self) -> &'static str {
        "sysfs-gpio"
    }

    fn init(&mut self, ctx: &HalContext) -> Result<bool, HalError> {
        let Some(gpio) = SysfsGpio::probe(&ctx.paths().sysfs_root)? else {
            return Ok(false);
        };
        let gpio = Arc::new(gpio);
        let pins = &ctx.registries().pins;
        let mut count = 0;
        for number in gpio.lines() {
            let Some(line) = gpio.line(number) else {
                continue;
            };
            let name = format!("GPIO{number}");
            pins.register(&name, Arc::new(Pin::sysfs(&name, Arc::new(line))))?;
            count += 1;
        }
        info!("sysfs gpio: {} chips, {} lines", gpio.chips().len(), count);
        ctx.set_sysfs(gpio);
        Ok(true)
    }
}

/// Factory function to create the sysfs GPIO driver.
pub fn create_driver() -> Box<dyn Driver<HalContext>> {
    Box::new(SysfsGpioDriver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sbc_common::config::HalConfig;
    use sbc_common::hal::types::Level;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn publishes_every_line() {
        let tmp = TempDir::new().unwrap();
        let chip = tmp.path().join("class/gpio/gpiochip0");
        fs::create_dir_all(&chip).unwrap();
        fs::write(chip.join("base"), "0\n").unwrap();
        fs::write(chip.join("ngpio"), "4\n").unwrap();
        let line = tmp.path().join("class/gpio/gpio2");
        fs::create_dir_all(&line).unwrap();
        fs::write(line.join("direction"), "in\n").unwrap();
        fs::write(line.join("value"), "1\n").unwrap();

        let mut config = HalConfig::default();
        config.paths.sysfs_root = tmp.path().to_path_buf();
        let ctx = HalContext::new(config);

        assert!(create_driver().init(&ctx).unwrap());
        assert_eq!(ctx.registries().pins.len(), 4);
        assert!(ctx.sysfs().is_some());
        let pin = ctx.registries().pin("GPIO2").unwrap();
        assert_eq!(pin.number(), Some(2));
        assert_eq!(pin.read().unwrap(), Level::High);
    }

    #[test]
    fn absent_tree_is_not_used() {
        let tmp = TempDir::new().unwrap();
        let mut config = HalConfig::default();
        config.paths.sysfs_root = tmp.path().to_path_buf();
        let ctx = HalContext::new(config);
        assert!(!create_driver().init(&ctx).unwrap());
        assert!(ctx.sysfs().is_none());
    }
}
