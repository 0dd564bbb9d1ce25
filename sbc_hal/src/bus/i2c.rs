//! I2C buses behind `/dev/i2c-N`.

use crate::pin::Pin;
use crate::sysfs::io_error;
use sbc_common::hal::driver::HalError;
use std::fs::{File, OpenOptions};
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

const I2C_M_RD: u16 = 0x0001;

#[repr(C)]
struct I2cMsg {
    addr: u16,
    flags: u16,
    len: u16,
    buf: *mut u8,
}

#[repr(C)]
struct I2cRdwrIoctlData {
    msgs: *mut I2cMsg,
    nmsgs: u32,
}

mod ioctl {
    use super::I2cRdwrIoctlData;

    nix::ioctl_write_ptr_bad!(i2c_rdwr, 0x0707, I2cRdwrIoctlData);
}

/// Clock and data pins of a bus.
#[derive(Debug, Clone)]
pub struct I2cPins {
    /// Clock.
    pub scl: Arc<Pin>,
    /// Data.
    pub sda: Arc<Pin>,
}

/// A registered I2C bus.
#[derive(Debug)]
pub struct I2cBusRef {
    name: String,
    number: u32,
    path: PathBuf,
    pins: Option<I2cPins>,
}

impl I2cBusRef {
    /// Bus `number` reached through the device node at `path`.
    pub fn new(number: u32, path: &Path, pins: Option<I2cPins>) -> Self {
        Self {
            name: format!("I2C{number}"),
            number,
            path: path.to_path_buf(),
            pins,
        }
    }

    /// Canonical name, e.g. "I2C0".
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adapter number.
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Device node.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Pins carrying the bus, when the pin tables know them.
    pub fn pins(&self) -> Option<&I2cPins> {
        self.pins.as_ref()
    }

    /// Open the adapter. Dropping the handle closes it.
    pub fn open(&self) -> Result<I2cBus, HalError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.path)
            .map_err(|e| io_error(&self.path, e))?;
        debug!("opened {} ({})", self.name, self.path.display());
        Ok(I2cBus {
            file,
            name: self.name.clone(),
        })
    }
}

/// An open I2C adapter.
#[derive(Debug)]
pub struct I2cBus {
    file: File,
    name: String,
}

impl I2cBus {
    /// Write `write`, then read into `read`, as one combined transaction
    /// with a repeated start. Either buffer may be empty.
    pub fn transact(&mut self, addr: u16, write: &[u8], read: &mut [u8]) -> Result<(), HalError> {
        if write.is_empty() && read.is_empty() {
            return Ok(());
        }
        let too_long = |len: usize| len > u16::MAX as usize;
        if too_long(write.len()) || too_long(read.len()) {
            return Err(HalError::Unsupported(format!(
                "{}: transfers are limited to {} bytes",
                self.name,
                u16::MAX
            )));
        }

        let mut msgs = Vec::with_capacity(2);
        if !write.is_empty() {
            msgs.push(I2cMsg {
                addr,
                flags: 0,
                len: write.len() as u16,
                // The kernel only reads from a write message.
                buf: write.as_ptr() as *mut u8,
            });
        }
        if !read.is_empty() {
            msgs.push(I2cMsg {
                addr,
                flags: I2C_M_RD,
                len: read.len() as u16,
                buf: read.as_mut_ptr(),
            });
        }
        let data = I2cRdwrIoctlData {
            msgs: msgs.as_mut_ptr(),
            nmsgs: msgs.len() as u32,
        };

        // SAFETY: every message points into a live buffer of `len` bytes.
        unsafe { ioctl::i2c_rdwr(self.file.as_raw_fd(), &data) }
            .map_err(|e| HalError::Io(format!("{} addr {addr:#04x}: {e}", self.name)))?;
        Ok(())
    }

    /// Plain write to `addr`.
    pub fn write(&mut self, addr: u16, data: &[u8]) -> Result<(), HalError> {
        self.transact(addr, data, &mut [])
    }

    /// Plain read from `addr`.
    pub fn read(&mut self, addr: u16, buf: &mut [u8]) -> Result<(), HalError> {
        self.transact(addr, &[], buf)
    }

    /// Bus name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_and_paths() {
        let bus = I2cBusRef::new(1, Path::new("/dev/i2c-1"), None);
        assert_eq!(bus.name(), "I2C1");
        assert_eq!(bus.number(), 1);
        assert!(bus.pins().is_none());
    }

    #[test]
    fn ioctl_on_non_adapter_is_io_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let bus = I2cBusRef::new(3, file.path(), None);
        let mut handle = bus.open().unwrap();
        assert!(handle.transact(0x50, &[], &mut []).is_ok());
        assert!(matches!(handle.write(0x50, &[0x00]), Err(HalError::Io(_))));
    }

    #[test]
    fn oversized_transfer_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut handle = I2cBusRef::new(3, file.path(), None).open().unwrap();
        let mut big = vec![0u8; u16::MAX as usize + 1];
        assert!(matches!(
            handle.read(0x50, &mut big),
            Err(HalError::Unsupported(_))
        ));
    }

    #[test]
    fn missing_node_is_io_error() {
        let bus = I2cBusRef::new(9, Path::new("/nonexistent/i2c-9"), None);
        assert!(matches!(bus.open(), Err(HalError::Io(_))));
    }
}
