//! Sysfs GPIO fallback.
//!
//! Lines exported through `/sys/class/gpio`. Used directly when no register
//! driver claims a line, and as the edge-detection shadow of
//! register-backed pins.

use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use parking_lot::Mutex;
use sbc_common::hal::driver::HalError;
use sbc_common::hal::types::{Edge, Level};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::os::fd::AsFd;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

const EXPORT_RETRIES: u32 = 5;
const EXPORT_RETRY_DELAY: Duration = Duration::from_millis(20);

/// One `gpiochipN` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpioChip {
    /// Kernel label, e.g. "1c20800.pinctrl".
    pub label: String,
    /// First line number.
    pub base: u32,
    /// Number of lines.
    pub ngpio: u32,
}

impl GpioChip {
    /// Whether `number` belongs to this chip.
    pub fn contains(&self, number: u32) -> bool {
        number >= self.base && number - self.base < self.ngpio
    }
}

/// Catalog of the gpio chips visible in sysfs.
#[derive(Debug)]
pub struct SysfsGpio {
    root: PathBuf,
    chips: Vec<GpioChip>,
}

impl SysfsGpio {
    /// Probe `{sysfs_root}/class/gpio`. `Ok(None)` when the tree is absent.
    pub fn probe(sysfs_root: &Path) -> Result<Option<Self>, HalError> {
        let root = sysfs_root.join("class/gpio");
        if !root.is_dir() {
            return Ok(None);
        }

        let mut chips = Vec::new();
        for entry in fs::read_dir(&root).map_err(|e| io_error(&root, e))? {
            let entry = entry.map_err(|e| io_error(&root, e))?;
            let name = entry.file_name();
            if !name.to_string_lossy().starts_with("gpiochip") {
                continue;
            }
            let dir = entry.path();
            let chip = GpioChip {
                label: read_trimmed(&dir.join("label")).unwrap_or_default(),
                base: parse_u32(&dir.join("base"))?,
                ngpio: parse_u32(&dir.join("ngpio"))?,
            };
            debug!(
                "gpiochip '{}' lines {}..{}",
                chip.label,
                chip.base,
                chip.base + chip.ngpio
            );
            chips.push(chip);
        }
        chips.sort_by_key(|c| c.base);

        Ok(Some(Self { root, chips }))
    }

    /// Chips sorted by base.
    pub fn chips(&self) -> &[GpioChip] {
        &self.chips
    }

    /// Every line number of every chip.
    pub fn lines(&self) -> impl Iterator<Item = u32> + '_ {
        self.chips.iter().flat_map(|c| c.base..c.base + c.ngpio)
    }

    /// Whether some chip owns `number`.
    pub fn contains(&self, number: u32) -> bool {
        self.chips.iter().any(|c| c.contains(number))
    }

    /// Handle on line `number`. No I/O happens until it is used.
    pub fn line(&self, number: u32) -> Option<SysfsPin> {
        self.contains(number).then(|| SysfsPin {
            number,
            class_root: self.root.clone(),
            value: Mutex::new(None),
        })
    }
}

/// Direction read back from a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineDirection {
    /// Input.
    In,
    /// Output.
    Out,
}

/// One sysfs GPIO line.
#[derive(Debug)]
pub struct SysfsPin {
    number: u32,
    class_root: PathBuf,
    value: Mutex<Option<File>>,
}

impl SysfsPin {
    /// Kernel line number.
    pub fn number(&self) -> u32 {
        self.number
    }

    fn dir(&self) -> PathBuf {
        self.class_root.join(format!("gpio{}", self.number))
    }

    /// Whether `gpioN/` exists.
    pub fn is_exported(&self) -> bool {
        self.dir().is_dir()
    }

    /// Export the line if needed, waiting briefly for its directory.
    pub fn export(&self) -> Result<(), HalError> {
        if self.is_exported() {
            return Ok(());
        }
        let export = self.class_root.join("export");
        write_file(&export, &self.number.to_string())?;
        for _ in 0..EXPORT_RETRIES {
            if self.is_exported() {
                debug!("exported gpio{}", self.number);
                return Ok(());
            }
            std::thread::sleep(EXPORT_RETRY_DELAY);
        }
        Err(HalError::Io(format!(
            "exporting gpio{} did not create {}",
            self.number,
            self.dir().display()
        )))
    }

    /// Current direction.
    pub fn direction(&self) -> Result<LineDirection, HalError> {
        let path = self.dir().join("direction");
        match read_trimmed(&path)?.as_str() {
            "in" => Ok(LineDirection::In),
            "out" | "low" | "high" => Ok(LineDirection::Out),
            other => Err(HalError::Io(format!(
                "{}: unexpected direction '{other}'",
                path.display()
            ))),
        }
    }

    /// Switch to input.
    pub fn set_input(&self) -> Result<(), HalError> {
        self.export()?;
        write_file(&self.dir().join("direction"), "in")
    }

    /// Switch to output, driving `level` without a glitch.
    pub fn set_output(&self, level: Level) -> Result<(), HalError> {
        self.export()?;
        let value = if level.is_high() { "high" } else { "low" };
        write_file(&self.dir().join("direction"), value)
    }

    /// Read the line level.
    pub fn read(&self) -> Result<Level, HalError> {
        let mut guard = self.value.lock();
        let file = self.open_value(&mut *guard)?;
        let path = self.dir().join("value");
        let mut buf = String::new();
        file.seek(SeekFrom::Start(0))
            .and_then(|_| file.read_to_string(&mut buf))
            .map_err(|e| io_error(&path, e))?;
        buf.parse::<Level>().map_err(HalError::Io)
    }

    /// Drive the line; must be an output.
    pub fn write(&self, level: Level) -> Result<(), HalError> {
        let mut guard = self.value.lock();
        let file = self.open_value(&mut *guard)?;
        let path = self.dir().join("value");
        let byte: &[u8] = if level.is_high() { b"1" } else { b"0" };
        file.seek(SeekFrom::Start(0))
            .and_then(|_| file.write_all(byte))
            .map_err(|e| io_error(&path, e))
    }

    /// Configured edge.
    pub fn edge(&self) -> Result<Edge, HalError> {
        let path = self.dir().join("edge");
        read_trimmed(&path)?.parse::<Edge>().map_err(HalError::Io)
    }

    /// Select the edge that wakes `wait_for_edge`. Any edge other than
    /// `None` switches the line to input first.
    pub fn set_edge(&self, edge: Edge) -> Result<(), HalError> {
        self.export()?;
        if edge != Edge::None {
            write_file(&self.dir().join("direction"), "in")?;
        }
        write_file(&self.dir().join("edge"), edge.as_sysfs())
    }

    /// Block until the configured edge fires. `None` waits forever.
    /// Returns `false` on timeout.
    pub fn wait_for_edge(&self, timeout: Option<Duration>) -> Result<bool, HalError> {
        let path = self.dir().join("value");
        let mut file = {
            let mut guard = self.value.lock();
            self.open_value(&mut *guard)?
                .try_clone()
                .map_err(|e| io_error(&path, e))?
        };
        // A pending event is cleared by reading the value.
        drain(&mut file).map_err(|e| io_error(&path, e))?;

        let timeout = match timeout {
            None => PollTimeout::NONE,
            Some(d) => PollTimeout::try_from(d)
                .map_err(|_| HalError::Io(format!("timeout {d:?} out of range")))?,
        };

        let ready = loop {
            let mut fds = [PollFd::new(
                file.as_fd(),
                PollFlags::POLLPRI | PollFlags::POLLERR,
            )];
            match poll(&mut fds, timeout) {
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(HalError::Io(format!("poll {}: {e}", path.display()))),
                Ok(n) => break n,
            }
        };
        if ready == 0 {
            return Ok(false);
        }
        drain(&mut file).map_err(|e| io_error(&path, e))?;
        Ok(true)
    }

    /// Turn edge detection off and close the value file. Idempotent.
    pub fn halt(&self) -> Result<(), HalError> {
        self.value.lock().take();
        if self.is_exported() {
            write_file(&self.dir().join("edge"), Edge::None.as_sysfs())?;
        }
        Ok(())
    }

    fn open_value<'a>(&self, slot: &'a mut Option<File>) -> Result<&'a mut File, HalError> {
        if slot.is_none() {
            self.export()?;
            let path = self.dir().join("value");
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .open(&path)
                .or_else(|_| File::open(&path))
                .map_err(|e| io_error(&path, e))?;
            *slot = Some(file);
        }
        slot.as_mut()
            .ok_or_else(|| HalError::Io(format!("gpio{} value not open", self.number)))
    }
}

fn drain(file: &mut File) -> std::io::Result<()> {
    let mut buf = [0u8; 8];
    file.seek(SeekFrom::Start(0))?;
    file.read(&mut buf).map(|_| ())
}

pub(crate) fn io_error(path: &Path, e: std::io::Error) -> HalError {
    match e.kind() {
        std::io::ErrorKind::PermissionDenied => {
            HalError::PermissionDenied(path.display().to_string())
        }
        _ => HalError::Io(format!("{}: {e}", path.display())),
    }
}

pub(crate) fn read_trimmed(path: &Path) -> Result<String, HalError> {
    fs::read_to_string(path)
        .map(|s| s.trim_matches(|c: char| c.is_whitespace() || c == '\0').to_string())
        .map_err(|e| io_error(path, e))
}

fn parse_u32(path: &Path) -> Result<u32, HalError> {
    let text = read_trimmed(path)?;
    text.parse::<u32>()
        .map_err(|e| HalError::Io(format!("{}: '{text}': {e}", path.display())))
}

fn write_file(path: &Path, content: &str) -> Result<(), HalError> {
    OpenOptions::new()
        .write(true)
        .truncate(true)
        .open(path)
        .and_then(|mut f| f.write_all(content.as_bytes()))
        .map_err(|e| io_error(path, e))
}
