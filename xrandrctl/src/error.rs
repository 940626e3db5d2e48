//! Error kinds surfaced by a controller run.
//!
//! Fatal kinds abort the run before (or instead of) persisting. Recoverable
//! kinds are collected per selector or per output and reported at the end.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ControlError {
    /// The state document failed schema or invariant checks.
    #[error("malformed state {}: {reason}", .path.display())]
    MalformedState { path: PathBuf, reason: String },

    /// The state document could not be read at all.
    #[error("read state {}: {source}", .path.display())]
    StateUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A selector named an identifier that matches no output or alias.
    #[error("unknown output '{0}'")]
    UnknownOutput(String),

    /// A `--from-file` preset could not supply levels for an output.
    #[error("preset {} for '{output}': {reason}", .path.display())]
    PresetUnavailable {
        path: PathBuf,
        output: String,
        reason: String,
    },

    /// The display tool failed for one output.
    #[error("command for output '{output}' failed: {reason}")]
    ExternalCommandFailed { output: String, reason: String },

    /// The updated document could not be written back.
    #[error("persist state {}: {source:#}", .path.display())]
    PersistFailure {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// The instruction list could not be parsed.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
}

pub type Result<T> = std::result::Result<T, ControlError>;
