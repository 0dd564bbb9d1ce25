//! Allwinner PIO banks.
//!
//! Every supported family shares the same register layout; only the base
//! addresses, the populated ports and the alternate function names differ,
//! so a family is a [`FamilyTable`] and one pair of drivers serves all of
//! them.

mod driver;
pub mod tables;

pub use driver::{AllwinnerGpio, AllwinnerGpioPl};

use crate::context::HalContext;
use crate::pin::{Pin, PinSpec};
use crate::sysfs::read_trimmed;
use sbc_common::hal::driver::{Driver, HalError};
use sbc_common::hal::types::Pull;
use sbc_mmio::{GROUP_SIZE, MappedGroups, PhysicalMapping};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// One contiguous block of register groups.
#[derive(Debug)]
pub struct Bank {
    /// Physical address of the first group.
    pub base: u64,
    /// Port index of the group at `base`.
    pub first_group: usize,
    /// Populated ports as `(port index, pin count)`.
    pub ports: &'static [(usize, u32)],
    /// Alternate function names per pin; pins not listed have none.
    pub alternates: &'static [(&'static str, [&'static str; 5])],
}

impl Bank {
    /// Register groups to map, from `first_group` to the last populated port.
    pub fn group_count(&self) -> usize {
        self.ports
            .iter()
            .map(|(port, _)| port + 1 - self.first_group)
            .max()
            .unwrap_or(0)
    }

    /// Every pin of the bank in port order.
    pub fn pins(&self) -> impl Iterator<Item = PinSpec> + '_ {
        self.ports.iter().flat_map(move |&(group, count)| {
            (0..count).map(move |offset| {
                let name = pin_name(group, offset);
                let alternates = self
                    .alternates
                    .iter()
                    .find(|(pin, _)| *pin == name)
                    .map(|(_, roles)| *roles)
                    .unwrap_or([""; 5]);
                PinSpec {
                    name,
                    group,
                    offset,
                    alternates,
                }
            })
        })
    }
}

/// Data describing one CPU family.
#[derive(Debug)]
pub struct FamilyTable {
    /// Short name, matched against `drivers.family` in the configuration.
    pub name: &'static str,
    /// Device-tree `compatible` strings identifying the family.
    pub compatible: &'static [&'static str],
    /// The main PIO bank.
    pub main: Bank,
    /// The always-on R_PIO bank (port L), when present.
    pub pl: Option<Bank>,
    /// Pins the package does not wire out.
    pub missing: &'static [&'static str],
}

impl FamilyTable {
    /// Whether the package wires `pin` out.
    pub fn is_available(&self, pin: &str) -> bool {
        !self.missing.contains(&pin)
    }
}

/// Factory function to create the main bank driver.
pub fn create_driver() -> Box<dyn Driver<HalContext>> {
    Box::new(AllwinnerGpio::new())
}

/// Factory function to create the PL bank driver.
pub fn create_pl_driver() -> Box<dyn Driver<HalContext>> {
    Box::new(AllwinnerGpioPl::new())
}

/// `PA0`, `PL12`, ...
pub fn pin_name(group: usize, offset: u32) -> String {
    let port = char::from(b'A' + group as u8);
    format!("P{port}{offset}")
}

/// Work out which family this board carries.
///
/// A `drivers.family` setting wins; otherwise the device-tree
/// `compatible` list is matched. `Ok(None)` means no supported family.
pub fn detect_family(ctx: &HalContext) -> Result<Option<&'static FamilyTable>, HalError> {
    if let Some(forced) = &ctx.config().drivers.family {
        return tables::FAMILIES
            .iter()
            .copied()
            .find(|f| f.name == forced.as_str())
            .map(Some)
            .ok_or_else(|| HalError::Configuration(format!("unknown CPU family '{forced}'")));
    }

    let Some(compatible) = read_devicetree(ctx, "compatible") else {
        debug!("no device-tree compatible string");
        return Ok(None);
    };
    let entries: Vec<&str> = compatible
        .split('\0')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    Ok(tables::FAMILIES
        .iter()
        .copied()
        .find(|f| f.compatible.iter().any(|c| entries.contains(c))))
}

/// Read a device-tree property from sysfs, falling back to procfs.
pub(crate) fn read_devicetree(ctx: &HalContext, property: &str) -> Option<String> {
    let paths = ctx.paths();
    let candidates: [PathBuf; 2] = [
        paths.sysfs_root.join("firmware/devicetree/base").join(property),
        paths.procfs_root.join("device-tree").join(property),
    ];
    candidates.iter().find_map(|p| read_trimmed(p).ok())
}

/// Register every pin of `bank` (canonical physical name, alias `GPIO<n>`).
///
/// A sysfs pin already published under `GPIO<n>` is replaced; its line
/// becomes the shadow of the register-backed pin.
pub(crate) fn register_bank(
    ctx: &HalContext,
    family: &FamilyTable,
    bank: &Bank,
) -> Result<Vec<Arc<Pin>>, HalError> {
    let pins = &ctx.registries().pins;
    let sysfs = ctx.sysfs();
    let mut registered = Vec::new();

    for spec in bank.pins() {
        let number = spec.number();
        let alias = format!("GPIO{number}");
        if pins.canonical_name(&alias).as_deref() == Some(alias.as_str()) {
            pins.unregister(&alias)?;
        }

        let shadow = sysfs.as_ref().and_then(|s| s.line(number)).map(Arc::new);
        let pin = Arc::new(Pin::registers(
            &spec,
            spec.group - bank.first_group,
            family.is_available(&spec.name),
            Pull::Float,
            shadow,
        ));
        pins.register(&spec.name, Arc::clone(&pin))?;
        pins.register_alias(&alias, &spec.name)?;
        registered.push(pin);
    }

    debug!(
        "{}: registered {} pins at {:#x}",
        family.name,
        registered.len(),
        bank.base
    );
    Ok(registered)
}

/// Map `bank` through the memory device and attach it to `pins`.
pub(crate) fn map_bank(ctx: &HalContext, bank: &Bank, pins: &[Arc<Pin>]) -> Result<(), HalError> {
    let count = bank.group_count();
    let mapping = PhysicalMapping::open(&ctx.paths().mem_device, bank.base, count * GROUP_SIZE)?;
    let groups = Arc::new(MappedGroups::new(mapping, 0, GROUP_SIZE, count)?);
    for pin in pins {
        pin.attach(Arc::clone(&groups));
    }
    info!("mapped {} register groups at {:#x}", count, bank.base);
    Ok(())
}
