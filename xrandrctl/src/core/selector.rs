//! Parse positional instructions into ordered selectors.
//!
//! Grammar: `[target] flag... [target flag...]...`. A token not starting with
//! `-` names a target; the flags after it apply to that target until the
//! next target. Flags with no preceding target, or after `all`, broadcast.

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::core::types::{BROADCAST_TARGET, Direction};
use crate::error::{ControlError, Result};

const FROM_FILE_FLAG: &str = "from-file";

/// One `(target, directions)` group from the command line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selector {
    /// Output name or alias; `None` means every entry.
    pub target: Option<String>,
    pub directions: BTreeSet<Direction>,
    /// Document to load this target's levels from instead of stepping.
    pub preset: Option<PathBuf>,
}

impl Selector {
    pub fn broadcast(directions: impl IntoIterator<Item = Direction>) -> Self {
        Self {
            target: None,
            directions: directions.into_iter().collect(),
            preset: None,
        }
    }

    pub fn targeted(target: &str, directions: impl IntoIterator<Item = Direction>) -> Self {
        Self {
            target: Some(target.to_string()),
            ..Self::broadcast(directions)
        }
    }
}

/// Parse raw instruction tokens (program name already removed).
pub fn parse_selectors<S: AsRef<str>>(tokens: &[S]) -> Result<Vec<Selector>> {
    let mut selectors = Vec::new();
    let mut iter = tokens.iter().map(AsRef::as_ref).peekable();

    while let Some(&first) = iter.peek() {
        let mut selector = Selector::default();
        if !first.starts_with('-') {
            iter.next();
            if first != BROADCAST_TARGET {
                selector.target = Some(first.to_string());
            }
        }

        while let Some(&token) = iter.peek() {
            if !token.starts_with('-') {
                break;
            }
            iter.next();
            let flag = token.trim_start_matches('-');
            if flag == FROM_FILE_FLAG {
                let path = iter.next().ok_or_else(|| {
                    ControlError::InvalidArguments(format!("{} requires a file path", token))
                })?;
                selector.preset = Some(PathBuf::from(path.trim()));
                continue;
            }
            let direction = Direction::from_flag(flag).ok_or_else(|| {
                ControlError::InvalidArguments(format!("unknown option '{}'", token))
            })?;
            selector.directions.insert(direction);
        }

        selectors.push(selector);
    }

    Ok(selectors)
}
