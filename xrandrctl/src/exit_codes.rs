//! Stable exit codes for the `xrandrctl` binary.

use crate::error::ControlError;

/// Every requested adjustment was applied and persisted.
pub const OK: i32 = 0;
/// At least one selector or output failed; the rest were applied and persisted.
pub const FAILED: i32 = 1;
/// Invalid arguments or config, or the state document is unreadable/malformed.
pub const INVALID: i32 = 2;
/// Adjustments may have been applied but the state document could not be written.
pub const PERSIST_FAILED: i32 = 3;

/// Exit code for an error that ended the run.
pub fn for_error(err: &ControlError) -> i32 {
    match err {
        ControlError::PersistFailure { .. } => PERSIST_FAILED,
        ControlError::UnknownOutput(_)
        | ControlError::PresetUnavailable { .. }
        | ControlError::ExternalCommandFailed { .. } => FAILED,
        ControlError::MalformedState { .. }
        | ControlError::StateUnreadable { .. }
        | ControlError::InvalidArguments(_) => INVALID,
    }
}
