//! Diagnostic tracing for the controller.
//!
//! Events go to stderr and never to stdout, which carries `--dry-run`
//! command lines. Nothing here affects what gets applied or persisted.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`. Defaults to `info` if unset, which logs every applied
/// entry and the display tool's output.
///
/// # Example
/// ```bash
/// RUST_LOG=xrandrctl=debug xrandrctl primary --dimmer
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
