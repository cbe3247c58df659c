//! Tracing/logging initialization.
//!
//! Structured JSON logs, filtered via `RUST_LOG`. Handlers emit `info` per
//! dispatched command and `warn` on quantity anomalies (negative on-hand,
//! cost-layer shortfalls), so a default `info` filter captures both.

use tracing_subscriber::EnvFilter;

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}
