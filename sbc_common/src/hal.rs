//! Hardware abstraction layer contract and value types.
//!
//! This module contains the driver contract, the bring-up report, the
//! error taxonomy shared by every HAL crate, pin value types and the
//! physical header tables.

pub mod driver;
pub mod header;
pub mod types;
