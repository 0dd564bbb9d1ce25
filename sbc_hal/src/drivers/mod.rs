//! Built-in drivers.
//!
//! - [`sysfs_gpio`] - every line of `/sys/class/gpio` as `GPIO<n>`
//! - [`allwinner`] - memory-mapped PIO banks of Allwinner SoCs
//! - [`headers`] - physical headers of known boards
//! - [`buses`] - I2C, SPI and 1-Wire discovery
//!
//! # Adding New Drivers
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement `Driver<HalContext>` from `sbc_common::hal::driver`
//! 3. Add a factory to [`BUILTIN_DRIVERS`]

pub mod allwinner;
pub mod buses;
pub mod headers;
pub mod sysfs_gpio;

use crate::context::HalContext;
use sbc_common::hal::driver::Driver;

/// Factory function type for creating driver instances.
pub type DriverFactory = fn() -> Box<dyn Driver<HalContext>>;

/// Every built-in driver, by name.
pub static BUILTIN_DRIVERS: &[(&str, DriverFactory)] = &[
    ("sysfs-gpio", sysfs_gpio::create_driver),
    ("allwinner-gpio", allwinner::create_driver),
    ("allwinner-gpio-pl", allwinner::create_pl_driver),
    ("board-headers", headers::create_driver),
    ("sysfs-i2c", buses::create_i2c_driver),
    ("sysfs-spi", buses::create_spi_driver),
    ("sysfs-onewire", buses::create_onewire_driver),
];
