//! SPI ports behind `/dev/spidevB.C`.

use crate::pin::Pin;
use crate::sysfs::io_error;
use sbc_common::hal::driver::HalError;
use static_assertions::const_assert_eq;
use std::fs::{File, OpenOptions};
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

const SPI_IOC_MAGIC: u8 = b'k';

#[repr(C)]
#[derive(Debug, Default)]
struct SpiIocTransfer {
    tx_buf: u64,
    rx_buf: u64,
    len: u32,
    speed_hz: u32,
    delay_usecs: u16,
    bits_per_word: u8,
    cs_change: u8,
    tx_nbits: u8,
    rx_nbits: u8,
    word_delay_usecs: u8,
    pad: u8,
}

const_assert_eq!(std::mem::size_of::<SpiIocTransfer>(), 32);

mod ioctl {
    use super::{SPI_IOC_MAGIC, SpiIocTransfer};

    nix::ioctl_write_ptr!(spi_write_mode, SPI_IOC_MAGIC, 1, u8);
    nix::ioctl_write_ptr!(spi_write_bits_per_word, SPI_IOC_MAGIC, 3, u8);
    nix::ioctl_write_ptr!(spi_write_max_speed_hz, SPI_IOC_MAGIC, 4, u32);
    nix::ioctl_write_buf!(spi_message, SPI_IOC_MAGIC, 0, SpiIocTransfer);
}

/// Clock polarity and phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpiMode {
    /// CPOL=0, CPHA=0.
    #[default]
    Mode0,
    /// CPOL=0, CPHA=1.
    Mode1,
    /// CPOL=1, CPHA=0.
    Mode2,
    /// CPOL=1, CPHA=1.
    Mode3,
}

impl SpiMode {
    fn bits(self) -> u8 {
        match self {
            SpiMode::Mode0 => 0,
            SpiMode::Mode1 => 1,
            SpiMode::Mode2 => 2,
            SpiMode::Mode3 => 3,
        }
    }
}

/// Pins carrying a port.
#[derive(Debug, Clone)]
pub struct SpiPins {
    /// Clock.
    pub clk: Arc<Pin>,
    /// Controller out.
    pub mosi: Arc<Pin>,
    /// Controller in.
    pub miso: Arc<Pin>,
    /// Chip select of this port.
    pub cs: Arc<Pin>,
}

/// A registered SPI port (bus plus chip select).
#[derive(Debug)]
pub struct SpiPortRef {
    name: String,
    bus: u32,
    chip_select: u32,
    path: PathBuf,
    pins: Option<SpiPins>,
}

impl SpiPortRef {
    /// Port `bus`.`chip_select` reached through `path`.
    pub fn new(bus: u32, chip_select: u32, path: &Path, pins: Option<SpiPins>) -> Self {
        Self {
            name: format!("SPI{bus}.{chip_select}"),
            bus,
            chip_select,
            path: path.to_path_buf(),
            pins,
        }
    }

    /// Canonical name, e.g. "SPI0.0".
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bus number.
    pub fn bus(&self) -> u32 {
        self.bus
    }

    /// Chip select.
    pub fn chip_select(&self) -> u32 {
        self.chip_select
    }

    /// Device node.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Pins carrying the port, when the pin tables know them.
    pub fn pins(&self) -> Option<&SpiPins> {
        self.pins.as_ref()
    }

    /// Open the port. Dropping the handle closes it.
    pub fn open(&self) -> Result<SpiPort, HalError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.path)
            .map_err(|e| io_error(&self.path, e))?;
        debug!("opened {} ({})", self.name, self.path.display());
        Ok(SpiPort {
            file,
            name: self.name.clone(),
            speed_hz: 0,
            bits_per_word: 8,
        })
    }
}

/// An open SPI port.
#[derive(Debug)]
pub struct SpiPort {
    file: File,
    name: String,
    speed_hz: u32,
    bits_per_word: u8,
}

impl SpiPort {
    /// Set mode, word size and maximum clock.
    pub fn configure(&mut self, mode: SpiMode, bits_per_word: u8, max_hz: u32) -> Result<(), HalError> {
        if bits_per_word == 0 || max_hz == 0 {
            return Err(HalError::Unsupported(format!(
                "{}: word size and clock must be non-zero",
                self.name
            )));
        }
        let fd = self.file.as_raw_fd();
        let mode_bits = mode.bits();
        // SAFETY: each pointer refers to a live local of the expected type.
        unsafe {
            ioctl::spi_write_mode(fd, &mode_bits).map_err(|e| self.ioctl_error("mode", e))?;
            ioctl::spi_write_bits_per_word(fd, &bits_per_word)
                .map_err(|e| self.ioctl_error("bits per word", e))?;
            ioctl::spi_write_max_speed_hz(fd, &max_hz).map_err(|e| self.ioctl_error("speed", e))?;
        }
        self.speed_hz = max_hz;
        self.bits_per_word = bits_per_word;
        debug!("{}: {:?}, {} bits, {} Hz", self.name, mode, bits_per_word, max_hz);
        Ok(())
    }

    /// Full-duplex transfer. `read` is either empty or as long as `write`.
    pub fn tx(&mut self, write: &[u8], read: &mut [u8]) -> Result<(), HalError> {
        if !read.is_empty() && read.len() != write.len() {
            return Err(HalError::Unsupported(format!(
                "{}: read buffer must match write length ({} != {})",
                self.name,
                read.len(),
                write.len()
            )));
        }
        if write.is_empty() {
            return Ok(());
        }
        let len = u32::try_from(write.len()).map_err(|_| {
            HalError::Unsupported(format!("{}: transfer too long", self.name))
        })?;
        let transfer = SpiIocTransfer {
            tx_buf: write.as_ptr() as u64,
            rx_buf: if read.is_empty() {
                0
            } else {
                read.as_mut_ptr() as u64
            },
            len,
            speed_hz: self.speed_hz,
            bits_per_word: self.bits_per_word,
            ..Default::default()
        };
        // SAFETY: the buffers outlive the call and hold `len` bytes.
        unsafe { ioctl::spi_message(self.file.as_raw_fd(), std::slice::from_ref(&transfer)) }
            .map_err(|e| self.ioctl_error("transfer", e))?;
        Ok(())
    }

    /// Port name.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn ioctl_error(&self, what: &str, e: nix::Error) -> HalError {
        HalError::Io(format!("{} {what}: {e}", self.name))
    }
}
