//! Pin function controller.
//!
//! One [`Pin`] type covers every family. A pin is backed by either
//!
//! - a register group shared with up to 31 siblings (memory-mapped), with
//!   an optional sysfs shadow for edge detection and read-only fallback,
//! - a sysfs line only, or
//! - nothing at all (power rails and unconnected positions).
//!
//! Register operations never take a lock: each one is a single-word
//! access through [`RegisterGroup`]. A register-backed pin whose mapping
//! was denied refuses every mutation with `PermissionDenied` and answers
//! read-only queries from sysfs when it can.

use crate::sysfs::{LineDirection, SysfsPin};
use parking_lot::Mutex;
use sbc_common::consts::PINS_PER_GROUP;
use sbc_common::hal::driver::HalError;
use sbc_common::hal::types::{Capabilities, Direction, Drive, Edge, Function, Level, Pull};
use sbc_mmio::{MappedGroups, RegisterGroup};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::debug;

/// Function code: input.
pub const FN_IN: u32 = 0;
/// Function code: output.
pub const FN_OUT: u32 = 1;
/// Function code: first alternate function.
pub const FN_ALT1: u32 = 2;
/// Function code: disabled (the reset value on most banks).
pub const FN_DISABLED: u32 = 7;

const ALT_NAMES: [&str; 5] = ["ALT1", "ALT2", "ALT3", "ALT4", "ALT5"];

/// Static description of one multiplexed pin in a family table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinSpec {
    /// Physical name, e.g. "PA12".
    pub name: String,
    /// Port index (A = 0).
    pub group: usize,
    /// Position inside the port (0..32).
    pub offset: u32,
    /// Role names of alternate functions 1..=5; `""` where unused.
    pub alternates: [&'static str; 5],
}

impl PinSpec {
    /// Logical (kernel) number, `32 * group + offset`.
    pub fn number(&self) -> u32 {
        self.group as u32 * PINS_PER_GROUP + self.offset
    }

    /// Alternate function index (1-based) serving `role`.
    pub fn alternate_index(&self, role: &str) -> Option<u8> {
        self.alternates
            .iter()
            .position(|r| !r.is_empty() && *r == role)
            .map(|i| i as u8 + 1)
    }
}

enum Backing {
    Power,
    Registers {
        groups: OnceLock<Arc<MappedGroups>>,
        group: usize,
        offset: u32,
        shadow: Option<Arc<SysfsPin>>,
    },
    Sysfs(Arc<SysfsPin>),
}

#[derive(Default)]
struct EdgeState {
    edge: Edge,
    delegate: Option<Arc<SysfsPin>>,
}

/// A physical pin.
pub struct Pin {
    name: String,
    number: Option<u32>,
    available: bool,
    default_pull: Pull,
    alternates: [&'static str; 5],
    backing: Backing,
    edge: Mutex<EdgeState>,
}

impl Pin {
    /// Power rail or other position with no GPIO behind it.
    pub fn power(name: &str) -> Self {
        Self {
            name: name.to_string(),
            number: None,
            available: false,
            default_pull: Pull::Float,
            alternates: [""; 5],
            backing: Backing::Power,
            edge: Mutex::new(EdgeState::default()),
        }
    }

    /// Pin served only by a sysfs line.
    pub fn sysfs(name: &str, line: Arc<SysfsPin>) -> Self {
        Self {
            name: name.to_string(),
            number: Some(line.number()),
            available: true,
            default_pull: Pull::Float,
            alternates: [""; 5],
            backing: Backing::Sysfs(line),
            edge: Mutex::new(EdgeState::default()),
        }
    }

    /// Register-backed pin. `group` indexes the register groups of the
    /// bank mapping the pin will be attached to.
    pub fn registers(
        spec: &PinSpec,
        group: usize,
        available: bool,
        default_pull: Pull,
        shadow: Option<Arc<SysfsPin>>,
    ) -> Self {
        Self {
            name: spec.name.clone(),
            number: Some(spec.number()),
            available,
            default_pull,
            alternates: spec.alternates,
            backing: Backing::Registers {
                groups: OnceLock::new(),
                group,
                offset: spec.offset,
                shadow,
            },
            edge: Mutex::new(EdgeState::default()),
        }
    }

    /// Attach the bank mapping once it exists. Later calls are ignored.
    pub fn attach(&self, groups: Arc<MappedGroups>) -> bool {
        match &self.backing {
            Backing::Registers { groups: slot, .. } => slot.set(groups).is_ok(),
            _ => false,
        }
    }

    /// Physical name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Logical number; `None` for power pins.
    pub fn number(&self) -> Option<u32> {
        self.number
    }

    /// Whether this CPU package wires the pin out.
    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Pull applied at reset.
    pub fn default_pull(&self) -> Pull {
        self.default_pull
    }

    /// Whether register access is live.
    pub fn is_mapped(&self) -> bool {
        self.mapped().is_some()
    }

    /// Whether the pin carries a GPIO (not a rail).
    pub fn is_gpio(&self) -> bool {
        !matches!(self.backing, Backing::Power)
    }

    /// Role names of the alternate functions, unused ones omitted.
    pub fn alternates(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.alternates.iter().copied().filter(|r| !r.is_empty())
    }

    /// Functions this pin can be switched to.
    pub fn supported_functions(&self) -> Vec<&'static str> {
        if !self.available || !self.is_gpio() {
            return Vec::new();
        }
        let mut functions = vec!["In", "Out"];
        if matches!(self.backing, Backing::Registers { .. }) {
            functions.extend(self.alternates());
        }
        functions
    }

    /// What the pin can do right now.
    pub fn capabilities(&self) -> Capabilities {
        if !self.available {
            return Capabilities::empty();
        }
        match &self.backing {
            Backing::Power => Capabilities::empty(),
            Backing::Sysfs(_) => Capabilities::INPUT | Capabilities::OUTPUT | Capabilities::EDGE,
            Backing::Registers { shadow, .. } => {
                let mut caps = Capabilities::INPUT
                    | Capabilities::OUTPUT
                    | Capabilities::PULL
                    | Capabilities::DRIVE;
                if self.alternates().next().is_some() {
                    caps |= Capabilities::ALTERNATE;
                }
                if shadow.is_some() {
                    caps |= Capabilities::EDGE;
                }
                caps
            }
        }
    }

    /// Current function.
    pub fn function(&self) -> Function {
        if !self.available {
            return Function::Disabled;
        }
        if let Some((group, offset)) = self.mapped() {
            return self.decode(group, offset);
        }
        let Some(line) = self.sysfs_view() else {
            return Function::Disabled;
        };
        match line.direction() {
            Ok(LineDirection::In) => Function::In {
                pull: self.default_pull,
                edge: self.edge.lock().edge,
            },
            Ok(LineDirection::Out) => match line.read() {
                Ok(level) => Function::Out { level },
                Err(_) => Function::Disabled,
            },
            Err(_) => Function::Disabled,
        }
    }

    /// Switch between input and output.
    ///
    /// Output sets the level bit before selecting the function so the pin
    /// never drives the stale level.
    pub fn set_direction(&self, direction: Direction) -> Result<(), HalError> {
        self.ensure_available()?;
        match &self.backing {
            Backing::Sysfs(line) => match direction {
                Direction::In(Pull::Float) => line.set_input(),
                Direction::In(pull) => Err(HalError::Unsupported(format!(
                    "{}: pull {pull} needs register access",
                    self.name
                ))),
                Direction::Out(level) => {
                    self.release_edge()?;
                    line.set_output(level)
                }
            },
            _ => {
                let (group, offset) = self.writable()?;
                match direction {
                    Direction::In(pull) => {
                        group.set_function(offset, FN_IN);
                        group.set_pull(offset, pull_code(pull));
                    }
                    Direction::Out(level) => {
                        self.release_edge()?;
                        group.set_level(offset, level.is_high());
                        group.set_function(offset, FN_OUT);
                    }
                }
                debug!("{} -> {:?}", self.name, direction);
                Ok(())
            }
        }
    }

    /// Level of the pin.
    pub fn read(&self) -> Result<Level, HalError> {
        self.ensure_available()?;
        if let Some((group, offset)) = self.mapped() {
            return Ok(Level::from(group.level(offset)));
        }
        match self.sysfs_view() {
            Some(line) => line.read(),
            None => Err(self.not_mapped()),
        }
    }

    /// Drive an output.
    pub fn write_level(&self, level: Level) -> Result<(), HalError> {
        self.ensure_available()?;
        if let Backing::Sysfs(line) = &self.backing {
            if line.direction()? != LineDirection::Out {
                return Err(self.wrong_function("an output", "In"));
            }
            return line.write(level);
        }
        let (group, offset) = self.writable()?;
        let code = group.function(offset);
        if code != FN_OUT {
            let current = self.decode(group, offset).to_string();
            return Err(self.wrong_function("an output", &current));
        }
        group.set_level(offset, level.is_high());
        Ok(())
    }

    /// Pull resistor; `default_pull` when registers are not mapped.
    pub fn pull(&self) -> Pull {
        match self.mapped() {
            Some((group, offset)) => pull_from_code(group.pull(offset)),
            None => self.default_pull,
        }
    }

    /// Change the pull resistor of an input.
    pub fn configure_pull(&self, pull: Pull) -> Result<(), HalError> {
        self.ensure_available()?;
        self.ensure_registers("pull configuration")?;
        let (group, offset) = self.writable()?;
        if group.function(offset) != FN_IN {
            let current = self.decode(group, offset).to_string();
            return Err(self.wrong_function("an input", &current));
        }
        group.set_pull(offset, pull_code(pull));
        Ok(())
    }

    /// Drive strength; `None` when registers are not mapped.
    pub fn drive(&self) -> Option<Drive> {
        self.mapped()
            .map(|(group, offset)| Drive::from_code(group.drive(offset)))
    }

    /// Change the output drive strength.
    pub fn set_drive(&self, drive: Drive) -> Result<(), HalError> {
        self.ensure_available()?;
        self.ensure_registers("drive strength")?;
        let (group, offset) = self.writable()?;
        group.set_drive(offset, drive.code());
        Ok(())
    }

    /// Route the pin to the peripheral signal `role` (e.g. "I2C0_SCL").
    pub fn set_alternate(&self, role: &str) -> Result<(), HalError> {
        self.ensure_available()?;
        self.ensure_registers("function multiplexing")?;
        let index = self
            .alternates
            .iter()
            .position(|r| !r.is_empty() && *r == role)
            .ok_or_else(|| {
                HalError::Unsupported(format!("{} has no function {role}", self.name))
            })?;
        let (group, offset) = self.writable()?;
        self.release_edge()?;
        group.set_function(offset, FN_ALT1 + index as u32);
        debug!("{} -> {}", self.name, role);
        Ok(())
    }

    /// Disconnect the pin from every function.
    pub fn disable(&self) -> Result<(), HalError> {
        self.ensure_available()?;
        self.ensure_registers("disabling")?;
        let (group, offset) = self.writable()?;
        self.release_edge()?;
        group.set_function(offset, FN_DISABLED);
        Ok(())
    }

    /// Start (or with `Edge::None`, stop) edge detection.
    ///
    /// Register banks do not expose edge interrupts to user space, so the
    /// pin delegates to its sysfs line and remembers the delegation until
    /// [`Pin::halt`].
    pub fn enable_edge_detection(&self, edge: Edge) -> Result<(), HalError> {
        self.ensure_available()?;
        if edge == Edge::None {
            return self.release_edge();
        }
        if let Some((group, offset)) = self.mapped() {
            let code = group.function(offset);
            if code != FN_IN {
                let current = self.decode(group, offset).to_string();
                return Err(self.wrong_function("an input", &current));
            }
        }
        let line = self.sysfs_view().ok_or_else(|| {
            HalError::Unsupported(format!(
                "{}: edge detection needs the sysfs gpio tree",
                self.name
            ))
        })?;
        line.set_edge(edge)?;

        let mut state = self.edge.lock();
        state.edge = edge;
        state.delegate = Some(line);
        debug!("{}: edge detection {} via sysfs", self.name, edge.as_sysfs());
        Ok(())
    }

    /// Block until the enabled edge fires. `None` waits forever; returns
    /// `false` on timeout.
    pub fn wait_for_edge(&self, timeout: Option<Duration>) -> Result<bool, HalError> {
        self.ensure_available()?;
        let delegate = self.edge.lock().delegate.clone();
        match delegate {
            Some(line) => line.wait_for_edge(timeout),
            None => Err(HalError::Unsupported(format!(
                "{}: edge detection not enabled",
                self.name
            ))),
        }
    }

    /// Release edge detection. Idempotent.
    pub fn halt(&self) -> Result<(), HalError> {
        self.release_edge()
    }

    fn release_edge(&self) -> Result<(), HalError> {
        let delegate = {
            let mut state = self.edge.lock();
            state.edge = Edge::None;
            state.delegate.take()
        };
        match delegate {
            Some(line) => line.halt(),
            None => Ok(()),
        }
    }

    fn decode(&self, group: &RegisterGroup, offset: u32) -> Function {
        match group.function(offset) {
            FN_IN => Function::In {
                pull: pull_from_code(group.pull(offset)),
                edge: self.edge.lock().edge,
            },
            FN_OUT => Function::Out {
                level: Level::from(group.level(offset)),
            },
            code @ 2..=6 => {
                let slot = (code - FN_ALT1) as usize;
                let role = match self.alternates[slot] {
                    "" => ALT_NAMES[slot],
                    role => role,
                };
                Function::Alternate {
                    index: slot as u8 + 1,
                    role,
                }
            }
            // 7, the sentinel, and reserved codes
            _ => Function::Disabled,
        }
    }

    fn mapped(&self) -> Option<(&RegisterGroup, u32)> {
        match &self.backing {
            Backing::Registers {
                groups,
                group,
                offset,
                ..
            } => groups.get()?.group(*group).map(|g| (g, *offset)),
            _ => None,
        }
    }

    fn writable(&self) -> Result<(&RegisterGroup, u32), HalError> {
        self.mapped().ok_or_else(|| self.not_mapped())
    }

    fn sysfs_view(&self) -> Option<Arc<SysfsPin>> {
        match &self.backing {
            Backing::Sysfs(line) => Some(Arc::clone(line)),
            Backing::Registers { shadow, .. } => shadow.clone(),
            Backing::Power => None,
        }
    }

    fn ensure_available(&self) -> Result<(), HalError> {
        if !self.is_gpio() {
            return Err(HalError::Unavailable(format!("{} is not a GPIO", self.name)));
        }
        if !self.available {
            return Err(HalError::Unavailable(format!(
                "{} is not wired on this CPU package",
                self.name
            )));
        }
        Ok(())
    }

    fn ensure_registers(&self, what: &str) -> Result<(), HalError> {
        match self.backing {
            Backing::Registers { .. } => Ok(()),
            _ => Err(HalError::Unsupported(format!(
                "{}: {what} needs register access",
                self.name
            ))),
        }
    }

    fn not_mapped(&self) -> HalError {
        HalError::PermissionDenied(format!("{}: registers not mapped", self.name))
    }

    fn wrong_function(&self, wanted: &str, current: &str) -> HalError {
        HalError::Unsupported(format!("{} is not {wanted} ({current})", self.name))
    }
}

impl std::fmt::Debug for Pin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pin")
            .field("name", &self.name)
            .field("number", &self.number)
            .field("available", &self.available)
            .field("mapped", &self.is_mapped())
            .finish()
    }
}

fn pull_code(pull: Pull) -> u32 {
    match pull {
        Pull::Float => 0,
        Pull::Up => 1,
        Pull::Down => 2,
    }
}

fn pull_from_code(code: u32) -> Pull {
    match code {
        1 => Pull::Up,
        2 => Pull::Down,
        _ => Pull::Float,
    }
}
