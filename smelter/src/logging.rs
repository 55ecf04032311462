//! Tracing setup for the agent.
//!
//! Log lines are the only externally observable record of intermediate state:
//! every terminal outcome (published, no-op, failure) is reported here rather
//! than through the process exit status. They are human-readable and must not
//! be treated as a machine-readable protocol.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`. Defaults to `info` if unset, since the log is the
/// product output. Output: stderr, compact format with timestamps.
///
/// # Example
/// ```bash
/// RUST_LOG=smelter=debug smelter octocat hello-world src/main.rs
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
