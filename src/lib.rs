//! Aura: a local-only desktop system monitor with a DVR-backed cockpit UI.
//!
//! The system is organized into functional modules:
//! - **error**: unified error type
//! - **clock**: monotonic clock, wall clock, cooperative cancellation, fixed-interval scheduler
//! - **log_init**: structured logging setup
//! - **telemetry**: periodic CPU/memory/process/disk/network/thermal/GPU collection
//! - **store**: DVR store — durable, retention-pruned, downsampled telemetry history
//! - **config**: runtime configuration resolution (CLI/env/config file/default)
//! - **cockpit**: per-tick controller and style sequencer driving the cockpit UI
//! - **cli**: argument parsing and mode dispatch

#![allow(dead_code)]

pub mod cli;
pub mod clock;
pub mod cockpit;
pub mod config;
pub mod error;
pub mod log_init;
pub mod store;
pub mod telemetry;

pub use error::{AppError, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
