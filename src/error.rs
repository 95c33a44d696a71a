//! Unified error type for Aura.
//!
//! A single flat enum instead of a per-subsystem hierarchy: the telemetry, store,
//! config and cockpit layers all funnel into the same six kinds so the CLI boundary
//! only has to handle one type.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /// A CLI flag, environment variable or config value failed validation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A collector, scheduler or controller operation failed at runtime.
    #[error("runtime error: {0}")]
    Runtime(String),

    /// Filesystem or OS-level I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// DVR store failure (open, append, query, migration).
    #[error("store error: {0}")]
    Store(String),

    /// A bounded resource (channel, ring buffer, retention budget) is exhausted.
    #[error("capacity exceeded: {0}")]
    Capacity(String),

    /// A requested sensor or data source has no reading on this platform/host.
    #[error("unavailable: {0}")]
    Unavailable(String),
}

impl From<toml::de::Error> for AppError {
    fn from(e: toml::de::Error) -> Self {
        AppError::InvalidArgument(format!("config parse error: {e}"))
    }
}

impl From<toml::ser::Error> for AppError {
    fn from(e: toml::ser::Error) -> Self {
        AppError::Runtime(format!("config serialize error: {e}"))
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        AppError::Store(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_are_kind_prefixed() {
        let e = AppError::InvalidArgument("bad interval".into());
        assert_eq!(e.to_string(), "invalid argument: bad interval");

        let e = AppError::Unavailable("gpu telemetry".into());
        assert_eq!(e.to_string(), "unavailable: gpu telemetry");
    }

    #[test]
    fn io_error_converts_via_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let app_err: AppError = io_err.into();
        assert!(matches!(app_err, AppError::Io(_)));
    }
}
