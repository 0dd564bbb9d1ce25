//! Common re-exports.
//!
//! ```rust
//! use sbc_common::prelude::*;
//! ```

pub use crate::config::{ConfigError, ConfigLoader, HalConfig, LogLevel};
pub use crate::hal::driver::{BringupReport, Driver, DriverOutcome, DriverState, HalError};
pub use crate::hal::header::{Header, HeaderPosition, HeaderRegistry};
pub use crate::hal::types::{Capabilities, Direction, Drive, Edge, Function, Level, Pull};
pub use crate::registry::{RegistryError, ResourceRegistry};
