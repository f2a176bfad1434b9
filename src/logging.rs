//! Diagnostic logging on stderr.
//!
//! Stdout carries command output (JSON payloads, tables), so every
//! `tracing` event goes to stderr. The filter is read from `RCLUCK_LOG`
//! using the usual `EnvFilter` syntax, e.g. `RCLUCK_LOG=rcluck=debug`.

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "RCLUCK_LOG";
const DEFAULT_FILTER: &str = "warn";

pub fn init_logging() {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
