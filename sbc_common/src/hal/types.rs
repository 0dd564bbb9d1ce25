//! Pin value types.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Digital level of a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Logic 0.
    #[default]
    Low,
    /// Logic 1.
    High,
}

impl Level {
    /// `true` for `High`.
    pub fn is_high(self) -> bool {
        self == Level::High
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high { Level::High } else { Level::Low }
    }
}

impl std::ops::Not for Level {
    type Output = Level;

    fn not(self) -> Level {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Level::Low => "Low",
            Level::High => "High",
        })
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "0" | "low" | "l" => Ok(Level::Low),
            "1" | "high" | "h" => Ok(Level::High),
            other => Err(format!("invalid level '{other}'")),
        }
    }
}

/// Pull resistor configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pull {
    /// No pull resistor.
    #[default]
    Float,
    /// Pull up to the I/O rail.
    Up,
    /// Pull down to ground.
    Down,
}

impl fmt::Display for Pull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Pull::Float => "Float",
            Pull::Up => "PullUp",
            Pull::Down => "PullDown",
        })
    }
}

/// Edge that wakes an edge wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Edge {
    /// Edge detection off.
    #[default]
    None,
    /// Low to high.
    Rising,
    /// High to low.
    Falling,
    /// Either transition.
    Both,
}

impl Edge {
    /// Value written to a sysfs `edge` file.
    pub fn as_sysfs(self) -> &'static str {
        match self {
            Edge::None => "none",
            Edge::Rising => "rising",
            Edge::Falling => "falling",
            Edge::Both => "both",
        }
    }
}

impl FromStr for Edge {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Edge::None),
            "rising" => Ok(Edge::Rising),
            "falling" => Ok(Edge::Falling),
            "both" => Ok(Edge::Both),
            other => Err(format!("invalid edge '{other}'")),
        }
    }
}

/// Output drive strength, one of the four hardware steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Drive {
    /// Weakest.
    Level0,
    /// Reset default on most families.
    #[default]
    Level1,
    /// Strong.
    Level2,
    /// Strongest.
    Level3,
}

impl Drive {
    /// 2-bit register code.
    pub fn code(self) -> u32 {
        match self {
            Drive::Level0 => 0,
            Drive::Level1 => 1,
            Drive::Level2 => 2,
            Drive::Level3 => 3,
        }
    }

    /// Decode a 2-bit register field.
    pub fn from_code(code: u32) -> Self {
        match code & 0x3 {
            0 => Drive::Level0,
            1 => Drive::Level1,
            2 => Drive::Level2,
            _ => Drive::Level3,
        }
    }
}

/// Requested direction of a GPIO.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Input with the given pull.
    In(Pull),
    /// Output driving the given level.
    Out(Level),
}

/// Current function of a pin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Function {
    /// Pin disconnected from every function.
    Disabled,
    /// Digital input.
    In {
        /// Pull resistor.
        pull: Pull,
        /// Edge detection.
        edge: Edge,
    },
    /// Digital output.
    Out {
        /// Driven level.
        level: Level,
    },
    /// Peripheral signal selected through the multiplexer.
    Alternate {
        /// 1-based alternate index (1..=5).
        index: u8,
        /// Role of the signal, e.g. "I2C0_SCL".
        role: &'static str,
    },
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Function::Disabled => f.write_str("Disabled"),
            Function::In { pull, edge } => match edge {
                Edge::None => write!(f, "In/{pull}"),
                edge => write!(f, "In/{pull}/{}", edge.as_sysfs()),
            },
            Function::Out { level } => write!(f, "Out/{level}"),
            Function::Alternate { role, .. } => f.write_str(role),
        }
    }
}

bitflags! {
    /// What a pin can do on this board.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        /// Digital input.
        const INPUT = 1 << 0;
        /// Digital output.
        const OUTPUT = 1 << 1;
        /// Configurable pull resistor.
        const PULL = 1 << 2;
        /// Blocking wait for edges.
        const EDGE = 1 << 3;
        /// Peripheral multiplexing.
        const ALTERNATE = 1 << 4;
        /// Configurable drive strength.
        const DRIVE = 1 << 5;
    }
}
