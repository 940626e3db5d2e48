//! Incremental brightness/gamma control for `xrandr` outputs.
//!
//! The controller keeps the last applied brightness and gamma of each
//! output in a JSON document, steps them on request, and hands the new
//! values to the display tool. It never queries the tool for the current
//! state, so the document is the source of truth between runs.
//!
//! - **[`core`]**: Pure, deterministic logic (selector parsing, delta
//!   arithmetic, command arguments, document invariants). No I/O.
//! - **[`io`]**: Side-effecting operations (state document, config file,
//!   process execution). Isolated to enable fakes in tests.
//!
//! [`dispatch`] coordinates the two to implement a single CLI invocation.

pub mod core;
pub mod dispatch;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
