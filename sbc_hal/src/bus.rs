//! Bus handles: I2C, SPI and 1-Wire.
//!
//! Each bus kind has a `*Ref` held in its registry and, where the kernel
//! exposes a character device, an open handle that closes on drop.

pub mod i2c;
pub mod onewire;
pub mod spi;

pub use i2c::{I2cBus, I2cBusRef, I2cPins};
pub use onewire::OneWireBusRef;
pub use spi::{SpiMode, SpiPins, SpiPort, SpiPortRef};

use crate::pin::Pin;
use sbc_common::registry::ResourceRegistry;
use std::sync::Arc;

/// First pin whose alternate functions include `role`.
pub(crate) fn pin_with_role(pins: &ResourceRegistry<Arc<Pin>>, role: &str) -> Option<Arc<Pin>> {
    pins.all()
        .into_iter()
        .map(|(_, pin)| pin)
        .find(|pin| pin.alternates().any(|r| r == role))
}
