//! Shared deterministic types for the controller core.
//!
//! The persisted shapes are the typed view of the JSON state document. The
//! store writes back through the document it loaded, so fields not named
//! here survive a save. [`Deltas`] is the resolved form used by the delta
//! engine.

use serde::{Deserialize, Serialize};

/// Red, green, blue scaling factors, in that order.
pub type Gamma = [f64; 3];

pub const RESET_BRIGHTNESS: f64 = 1.0;
pub const RESET_GAMMA: Gamma = [1.0, 1.0, 1.0];
pub const DEFAULT_BRIGHTNESS_DELTA: f64 = 0.1;
pub const DEFAULT_GAMMA_DELTA: Gamma = [0.0, 0.025, 0.05];

/// CLI word that targets every entry.
pub const BROADCAST_TARGET: &str = "all";

/// One adjustment requested for an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Direction {
    Brighter,
    Dimmer,
    Redder,
    Bluer,
    Reset,
}

impl Direction {
    /// Parse a flag name with its leading dashes already stripped.
    pub fn from_flag(flag: &str) -> Option<Self> {
        match flag {
            "brighter" => Some(Self::Brighter),
            "dimmer" => Some(Self::Dimmer),
            "redder" => Some(Self::Redder),
            "bluer" => Some(Self::Bluer),
            "reset" => Some(Self::Reset),
            _ => None,
        }
    }
}

/// Brightness and gamma as sent to the display tool.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Levels {
    pub brightness: f64,
    pub gamma: Gamma,
}

impl Levels {
    pub const RESET: Levels = Levels {
        brightness: RESET_BRIGHTNESS,
        gamma: RESET_GAMMA,
    };
}

/// Step sizes for one entry after defaults have been filled in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Deltas {
    pub brightness_delta: f64,
    pub gamma_delta: Gamma,
}

impl Default for Deltas {
    fn default() -> Self {
        Self {
            brightness_delta: DEFAULT_BRIGHTNESS_DELTA,
            gamma_delta: DEFAULT_GAMMA_DELTA,
        }
    }
}

/// One display in the full-control document (a JSON array of these).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRecord {
    /// Output name as known to the display tool (e.g. `HDMI-1`).
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub brightness: f64,
    pub gamma: Gamma,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness_delta: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gamma_delta: Option<Gamma>,
}

impl OutputRecord {
    pub fn levels(&self) -> Levels {
        Levels {
            brightness: self.brightness,
            gamma: self.gamma,
        }
    }

    pub fn set_levels(&mut self, levels: Levels) {
        self.brightness = levels.brightness;
        self.gamma = levels.gamma;
    }

    /// Resolve this record's step sizes, falling back to `defaults`.
    pub fn deltas(&self, defaults: &Deltas) -> Deltas {
        Deltas {
            brightness_delta: self.brightness_delta.unwrap_or(defaults.brightness_delta),
            gamma_delta: self.gamma_delta.unwrap_or(defaults.gamma_delta),
        }
    }

    /// True when `identifier` is this record's output name or alias.
    pub fn matches(&self, identifier: &str) -> bool {
        self.output == identifier || self.alias.as_deref() == Some(identifier)
    }
}

/// Mini document: several outputs driven with one shared brightness/gamma.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedState {
    pub outputs: Vec<String>,
    pub brightness: f64,
    pub gamma: Gamma,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness_delta: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gamma_delta: Option<Gamma>,
}

impl SharedState {
    pub fn levels(&self) -> Levels {
        Levels {
            brightness: self.brightness,
            gamma: self.gamma,
        }
    }

    pub fn set_levels(&mut self, levels: Levels) {
        self.brightness = levels.brightness;
        self.gamma = levels.gamma;
    }

    pub fn deltas(&self, defaults: &Deltas) -> Deltas {
        Deltas {
            brightness_delta: self.brightness_delta.unwrap_or(defaults.brightness_delta),
            gamma_delta: self.gamma_delta.unwrap_or(defaults.gamma_delta),
        }
    }
}

/// Either persisted document shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateDocument {
    Outputs(Vec<OutputRecord>),
    Shared(SharedState),
}
