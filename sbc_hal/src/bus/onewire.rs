//! 1-Wire bus masters exposed by the kernel `w1` subsystem.

use crate::sysfs::{io_error, read_trimmed};
use sbc_common::hal::driver::HalError;
use std::fs;
use std::path::{Path, PathBuf};

/// A registered 1-Wire bus master.
#[derive(Debug)]
pub struct OneWireBusRef {
    name: String,
    number: u32,
    master: PathBuf,
}

impl OneWireBusRef {
    /// Master `number` at `{devices}/w1_bus_master{number}`.
    pub fn new(number: u32, devices: &Path) -> Self {
        Self {
            name: format!("OneWire{number}"),
            number,
            master: devices.join(format!("w1_bus_master{number}")),
        }
    }

    /// Canonical name, e.g. "OneWire1".
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Master number.
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Master directory in sysfs.
    pub fn path(&self) -> &Path {
        &self.master
    }

    /// Slave ids currently on the bus, e.g. "28-0316a2794aff".
    pub fn devices(&self) -> Result<Vec<String>, HalError> {
        let text = read_trimmed(&self.master.join("w1_master_slaves"))?;
        Ok(text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && *l != "not found.")
            .map(str::to_string)
            .collect())
    }

    /// Raw `w1_slave` text of slave `id`. The kernel performs the bus
    /// transaction on read.
    pub fn read_slave(&self, id: &str) -> Result<String, HalError> {
        if id.is_empty() || id.contains('/') || id.starts_with('.') {
            return Err(HalError::Unsupported(format!("invalid 1-Wire id '{id}'")));
        }
        let path = self.slave_root().join(id).join("w1_slave");
        fs::read_to_string(&path).map_err(|e| io_error(&path, e))
    }

    fn slave_root(&self) -> &Path {
        self.master.parent().unwrap_or(&self.master)
    }
}
