//! SBC Common Library
//!
//! This crate provides the types shared by every SBC hardware crate and by
//! the tools that consume them.
//!
//! # Module Structure
//!
//! - [`config`] - Configuration loading traits and the HAL configuration
//! - [`consts`] - Default filesystem locations and service names
//! - [`hal`] - Driver contract, error taxonomy, pin value types, headers
//! - [`registry`] - Generic name/alias resource registry
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use sbc_common::registry::ResourceRegistry;
//!
//! let buses: ResourceRegistry<u32> = ResourceRegistry::new("i2c");
//! buses.register("I2C1", 1).unwrap();
//! buses.register_alias("/dev/i2c-1", "I2C1").unwrap();
//! assert_eq!(buses.by_name("/dev/i2c-1"), Some(1));
//! ```

pub mod config;
pub mod consts;
pub mod hal;
pub mod prelude;
pub mod registry;
