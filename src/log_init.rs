//! Structured logging initialization via `tracing` + `tracing-subscriber`.

use std::path::Path;
use tracing_subscriber::fmt;
use tracing_subscriber::EnvFilter;

/// Initializes the global `tracing` subscriber. Honors `RUST_LOG`, defaulting
/// to `info` when unset. Safe to call once per process; a second call is a
/// no-op rather than a panic, so tests can call it freely.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

/// Logs the resolved runtime configuration at startup, one line per field.
pub fn log_startup_banner(db_path: &Path, persistence_enabled: bool, retention_seconds: f64) {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "aura starting");
    tracing::info!(
        persistence_enabled,
        db_path = %db_path.display(),
        retention_seconds,
        "runtime configuration resolved"
    );
}
