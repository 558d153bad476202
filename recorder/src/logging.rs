//! Tracing bootstrap for hosts embedding the recorder.
//!
//! [`LogSink`](crate::sink::LogSink) reports through `tracing` at `info`, so
//! step lines only show up when a subscriber accepts that level.

use anyhow::{Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber.
///
/// Reads `RUST_LOG`, falling back to `default_directive` (e.g. `"info"`).
/// Output: stderr, compact format. Fails if a global subscriber already exists.
///
/// # Example
/// ```bash
/// RUST_LOG=startup_recorder=info,warn my-host
/// ```
pub fn init(default_directive: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .map_err(|err| anyhow!("invalid log directive {default_directive:?}: {err}"))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init()
        .map_err(|err| anyhow!("install tracing subscriber: {err}"))
}
