//! Runtime CLI surface: argument parsing, mode dispatch, and JSON snapshot
//! emission.

use crate::config::{CliOverrides, RuntimeConfig};
use crate::error::{AppError, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "aura", about = "Local-only desktop system monitor with a DVR-backed cockpit")]
pub struct Cli {
    /// Emit one snapshot as a single JSON object and exit.
    #[arg(long)]
    pub json: bool,

    /// Stream snapshots continuously at `--interval` cadence.
    #[arg(long)]
    pub watch: bool,

    /// Sampling interval in seconds for `--watch` (strictly positive, finite).
    #[arg(long, default_value = "1.0")]
    pub interval: String,

    /// Stop `--watch` after emitting N snapshots.
    #[arg(long)]
    pub count: Option<u64>,

    /// Force persistence off regardless of config/env/default.
    #[arg(long)]
    pub no_persist: bool,

    /// Override the DVR database file path.
    #[arg(long)]
    pub db_path: Option<PathBuf>,

    /// Override the retention window in seconds.
    #[arg(long)]
    pub retention_seconds: Option<f64>,

    /// Read back the N most recent persisted samples and exit.
    #[arg(long)]
    pub latest: Option<u64>,

    /// Lower bound (unix timestamp) for a persisted readback.
    #[arg(long)]
    pub since: Option<f64>,

    /// Upper bound (unix timestamp) for a persisted readback.
    #[arg(long)]
    pub until: Option<f64>,

    /// Launch the interactive cockpit UI. Mutually exclusive with
    /// `--json`/`--watch`/readback flags.
    #[arg(long)]
    pub gui: bool,
}

/// Which top-level mode the parsed CLI resolves to.
#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Snapshot,
    Watch { interval: f64, count: Option<u64> },
    Readback { latest: Option<u64>, since: Option<f64>, until: Option<f64> },
    Gui,
}

impl Cli {
    /// Parses `--interval` (accepted as text so a boolean-looking value such
    /// as `true` is rejected rather than silently coerced) and resolves the
    /// overall dispatch mode, enforcing `--gui`'s mutual exclusivity.
    pub fn resolve_mode(&self) -> Result<Mode> {
        let readback_requested = self.latest.is_some() || self.since.is_some() || self.until.is_some();

        if self.gui {
            if self.json || self.watch || readback_requested {
                return Err(AppError::InvalidArgument(
                    "--gui is mutually exclusive with read/watch/json modes".to_string(),
                ));
            }
            return Ok(Mode::Gui);
        }

        if readback_requested {
            return Ok(Mode::Readback {
                latest: self.latest,
                since: self.since,
                until: self.until,
            });
        }

        if self.watch {
            let interval = parse_interval(&self.interval)?;
            return Ok(Mode::Watch { interval, count: self.count });
        }

        Ok(Mode::Snapshot)
    }

    pub fn cli_overrides(&self) -> CliOverrides {
        CliOverrides {
            no_persist: self.no_persist,
            db_path: self.db_path.clone(),
            retention_seconds: self.retention_seconds,
        }
    }
}

/// Accepts only a positive, finite decimal number; rejects booleans,
/// negatives, zero, NaN and infinities.
fn parse_interval(raw: &str) -> Result<f64> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("true") || trimmed.eq_ignore_ascii_case("false") {
        return Err(interval_error());
    }
    let value: f64 = trimmed.parse().map_err(|_| interval_error())?;
    if !value.is_finite() || value <= 0.0 {
        return Err(interval_error());
    }
    Ok(value)
}

fn interval_error() -> AppError {
    AppError::InvalidArgument("interval must be a positive finite number".to_string())
}

/// JSON snapshot as written to stdout in `--json`/`--watch` mode.
#[derive(Debug, serde::Serialize)]
pub struct JsonSnapshot {
    pub timestamp: f64,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub disk_read_bps: f64,
    pub disk_write_bps: f64,
    pub network_recv_bps: f64,
    pub network_sent_bps: f64,
}

impl From<&crate::telemetry::sample::Sample> for JsonSnapshot {
    fn from(s: &crate::telemetry::sample::Sample) -> Self {
        JsonSnapshot {
            timestamp: s.timestamp,
            cpu_percent: s.cpu_percent,
            memory_percent: s.memory_percent,
            disk_read_bps: s.disk_read_bps,
            disk_write_bps: s.disk_write_bps,
            network_recv_bps: s.network_recv_bps,
            network_sent_bps: s.network_sent_bps,
        }
    }
}

/// Process exit code, mirroring the three codes the CLI surface defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Ok = 0,
    UsageOrRuntimeError = 1,
    Cancelled = 130,
}

/// Writes one JSON-encoded snapshot line to `out`, flushing immediately.
/// A write failure against a closed stream (`BrokenPipe`) is treated as a
/// clean shutdown (exit 0); any other I/O error surfaces as a failure
/// rather than being masked as a closed stream.
pub fn emit_json_line(out: &mut impl Write, snapshot: &JsonSnapshot) -> ExitCode {
    let line = match serde_json::to_string(snapshot) {
        Ok(line) => line,
        Err(_) => return ExitCode::UsageOrRuntimeError,
    };
    if let Err(e) = writeln!(out, "{line}") {
        return exit_code_for_write_error(&e);
    }
    if let Err(e) = out.flush() {
        return exit_code_for_write_error(&e);
    }
    ExitCode::Ok
}

fn exit_code_for_write_error(e: &std::io::Error) -> ExitCode {
    match e.kind() {
        std::io::ErrorKind::BrokenPipe => ExitCode::Ok,
        _ => ExitCode::UsageOrRuntimeError,
    }
}

/// Applies CLI overrides on top of env/config/default layers to produce the
/// runtime configuration this process will use for persistence.
pub fn resolve_runtime_config(cli: &Cli) -> Result<RuntimeConfig> {
    crate::config::resolve(&cli.cli_overrides())
}
