use serde::{Deserialize, Serialize};

use crate::hal::Address;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Widen,
    Narrow,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Widen => "OPEN",
            Self::Narrow => "CLOSE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Widen,
    Narrow,
    Hold,
}

impl Action {
    pub fn direction(self) -> Option<Direction> {
        match self {
            Self::Widen => Some(Direction::Widen),
            Self::Narrow => Some(Direction::Narrow),
            Self::Hold => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Widen => "WIDEN",
            Self::Narrow => "NARROW",
            Self::Hold => "HOLD",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuatorCommand {
    pub action: Action,
    pub duration_ms: u64,
}

impl ActuatorCommand {
    pub fn hold() -> Self {
        Self {
            action: Action::Hold,
            duration_ms: 0,
        }
    }

    pub fn pulse(direction: Direction, duration_ms: u64) -> Self {
        Self {
            action: match direction {
                Direction::Widen => Action::Widen,
                Direction::Narrow => Action::Narrow,
            },
            duration_ms,
        }
    }
}

/// Side effect requested by the engine, carried out in order by the runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineAction {
    Backlight(bool),
    Write { line: u8, column: u8, text: String },
    Actuate(ActuatorCommand),
    Persist { address: Address, value: f32 },
}

impl EngineAction {
    pub fn write(line: u8, text: String) -> Self {
        Self::Write {
            line,
            column: 0,
            text,
        }
    }
}
