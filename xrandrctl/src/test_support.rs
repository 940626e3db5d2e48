//! Test-only helpers: state fixtures and a recording command runner.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};

use crate::core::types::{OutputRecord, RESET_GAMMA, SharedState};
use crate::io::executor::{CommandRunner, ExecOutcome};

/// Two outputs: `HDMI-1` (alias `primary`) and `DVI-1` with its own
/// brightness step of 0.15.
pub const SCENARIO_STATE: &str = r#"[
  {"output": "HDMI-1", "alias": "primary", "brightness": 1.0, "gamma": [1.0, 1.0, 1.0]},
  {"output": "DVI-1", "brightness": 1.0, "gamma": [1.0, 1.0, 1.0], "brightness_delta": 0.15}
]
"#;

const TOLERANCE: f64 = 1e-9;

/// Assert two floats are equal up to accumulated rounding error.
#[track_caller]
pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < TOLERANCE,
        "expected {expected}, got {actual}"
    );
}

/// Write `contents` as `outputs.json` under `dir` and return its path.
pub fn write_state(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join("outputs.json");
    fs::write(&path, contents).expect("write state fixture");
    path
}

/// Record at reset levels with no explicit deltas.
pub fn record(output: &str, alias: Option<&str>) -> OutputRecord {
    OutputRecord {
        output: output.to_string(),
        alias: alias.map(str::to_string),
        brightness: 1.0,
        gamma: RESET_GAMMA,
        brightness_delta: None,
        gamma_delta: None,
    }
}

/// Shared document at reset levels.
pub fn shared(outputs: &[&str]) -> SharedState {
    SharedState {
        outputs: outputs.iter().map(|s| s.to_string()).collect(),
        brightness: 1.0,
        gamma: RESET_GAMMA,
        brightness_delta: None,
        gamma_delta: None,
    }
}

/// Runner that records every argument list and never spawns anything.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    calls: RefCell<Vec<Vec<String>>>,
    /// Outputs whose command exits with status 1.
    failing: HashSet<String>,
    /// Every call returns `Err`, as if the program could not be spawned.
    error_all: bool,
}

impl RecordingRunner {
    pub fn failing_for(outputs: &[&str]) -> Self {
        Self {
            failing: outputs.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn erroring() -> Self {
        Self {
            error_all: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.borrow().clone()
    }

    /// The `--output` value of each call, in call order.
    pub fn outputs(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|args| output_of(args))
            .collect()
    }
}

impl CommandRunner for RecordingRunner {
    fn execute(&self, args: &[String]) -> Result<ExecOutcome> {
        self.calls.borrow_mut().push(args.to_vec());
        if self.error_all {
            return Err(anyhow!("spawn failed"));
        }
        match output_of(args) {
            Some(output) if self.failing.contains(&output) => {
                Ok(ExecOutcome::failed(1, "cannot find output"))
            }
            _ => Ok(ExecOutcome::succeeded()),
        }
    }
}

fn output_of(args: &[String]) -> Option<String> {
    args.iter()
        .position(|arg| arg == "--output")
        .and_then(|index| args.get(index + 1))
        .cloned()
}
