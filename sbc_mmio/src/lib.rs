//! # SBC Memory-Mapped Register Access
//!
//! Maps physical address ranges into the process and overlays typed
//! register layouts on them. Used by the per-family GPIO drivers to reach
//! the pin controller without going through the kernel.
//!
//! ## Features
//!
//! - **Explicit failure**: a denied mapping is `MmioError::PermissionDenied`,
//!   never an empty or silent no-op mapping
//! - **Checked overlays**: every typed view is bounds- and alignment-checked
//! - **Lock-free registers**: `RegisterGroup` words are atomics; each field
//!   update is a two-step masked write on a single word
//! - **Test doubles**: anonymous mappings behave exactly like physical ones
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐    ┌─────────────────┐
//! │  /dev/mem       │    │ PhysicalMapping │    │  MappedGroups   │
//! │  (phys window)  ├───►│  (memmap2)      ├───►│  [RegisterGroup]│
//! └─────────────────┘    └─────────────────┘    └────────┬────────┘
//!                                                        │ shared by
//!                                               ┌────────▼────────┐
//!                                               │  pins of group  │
//!                                               └─────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use sbc_mmio::{MappedGroups, MmioResult};
//!
//! # fn main() -> MmioResult<()> {
//! // Two zeroed groups, as a stand-in for a mapped pin controller
//! let groups = MappedGroups::anonymous(2)?;
//! let port_b = groups.group(1).expect("mapped");
//!
//! port_b.set_function(3, 1); // PB3 -> output
//! port_b.set_level(3, true);
//! assert!(port_b.level(3));
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! ```rust,no_run
//! use sbc_mmio::{MmioError, PhysicalMapping};
//! use std::path::Path;
//!
//! match PhysicalMapping::open(Path::new("/dev/mem"), 0x01C2_0800, 0x400) {
//!     Ok(mapping) => { /* overlay registers */ }
//!     Err(MmioError::PermissionDenied { path }) => {
//!         eprintln!("{path}: try running as root");
//!     }
//!     Err(e) => eprintln!("Unexpected error: {}", e),
//! }
//! ```
//!
//! ## Thread Safety
//!
//! - **PhysicalMapping**: `Send + Sync`; only atomic overlays are exposed
//! - **RegisterGroup**: shared without locks; only single-word operations

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod gpio;
pub mod mapping;

pub use error::{MmioError, MmioResult};
pub use gpio::{FUNCTION_SENTINEL, GROUP_SIZE, MappedGroups, RegisterGroup};
pub use mapping::{PhysicalMapping, RegisterBlock, page_size};
