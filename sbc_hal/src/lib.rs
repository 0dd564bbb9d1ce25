//! # SBC HAL Library
//!
//! Name-based access to the GPIO pins, I2C buses, SPI ports and 1-Wire
//! masters of single-board computers.
//!
//! Per-family drivers implement `Driver<HalContext>` from
//! `sbc_common::hal::driver`. At startup the bring-up scheduler runs them
//! once in prerequisite order; each one that finds its hardware fills the
//! registries. Application code then resolves resources by name or alias
//! (`PA12`, `GPIO12`, `P1_3`, `/dev/i2c-0`) and drives them.
//!
//! # Module Structure
//!
//! - [`bringup`] - Driver scheduler and bring-up report
//! - [`bus`] - I2C, SPI and 1-Wire handles
//! - [`context`] - Registries and the context handed to drivers
//! - [`core`] - `Hal` entry point
//! - [`drivers`] - Built-in drivers and family tables
//! - [`pin`] - Pin function controller
//! - [`sysfs`] - `/sys/class/gpio` fallback
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                              sbc_hal                             │
//! │  ┌─────────────┐    ┌──────────────┐    ┌─────────────────────┐  │
//! │  │  Registries │◄───│     Hal      │───►│  Bringup scheduler  │  │
//! │  │ pins, buses │    │              │    │  (prereq ordering)  │  │
//! │  └──────▲──────┘    └──────────────┘    └──────────┬──────────┘  │
//! │         │                                          │ init()      │
//! │         │               ┌──────────────────────────▼──────────┐  │
//! │         └───────────────│  drivers: sysfs-gpio, allwinner-*,  │  │
//! │                         │  board-headers, sysfs-i2c/spi/w1    │  │
//! │                         └──────────────┬──────────────────────┘  │
//! │                                        ▼                         │
//! │                         ┌─────────────────────────────────────┐  │
//! │                         │ sbc_mmio RegisterGroup │ sysfs gpio │  │
//! │                         └─────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use sbc_common::config::HalConfig;
//! use sbc_common::hal::types::{Direction, Level};
//! use sbc_hal::Hal;
//!
//! let mut hal = Hal::new(HalConfig::default())?;
//! let report = hal.init()?;
//! if report.has_failures() {
//!     eprintln!("{:?}", report.failed);
//! }
//! let led = hal.pin("P1_7")?;
//! led.set_direction(Direction::Out(Level::High))?;
//! # Ok::<(), sbc_common::hal::driver::HalError>(())
//! ```

#![deny(missing_docs)]

pub mod bringup;
pub mod bus;
pub mod context;
pub mod core;
pub mod drivers;
pub mod pin;
pub mod sysfs;

// Re-export key types for convenience
pub use crate::bringup::Bringup;
pub use crate::context::{HalContext, Registries};
pub use crate::core::Hal;
pub use crate::drivers::{BUILTIN_DRIVERS, DriverFactory};
pub use crate::pin::{Pin, PinSpec};
pub use crate::sysfs::{SysfsGpio, SysfsPin};
