//! Runtime configuration resolution: CLI > env > TOML config file > platform
//! defaults.
//!
//! Path resolution uses `dirs::config_dir()`/`dirs::data_dir()` for the
//! platform-specific config and database locations.

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where the resolved `db_path`/`retention_seconds` ultimately came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DbSource {
    Cli,
    Env,
    Config,
    Auto,
    Disabled,
}

/// The fully resolved, immutable runtime configuration. Read once at
/// startup; no component mutates it afterward.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    pub persistence_enabled: bool,
    pub retention_seconds: f64,
    pub db_source: DbSource,
    pub db_path: PathBuf,
}

impl RuntimeConfig {
    fn disabled() -> Self {
        RuntimeConfig {
            persistence_enabled: false,
            retention_seconds: 0.0,
            db_source: DbSource::Disabled,
            db_path: PathBuf::new(),
        }
    }

    fn enabled(db_path: PathBuf, retention_seconds: f64, source: DbSource) -> Self {
        RuntimeConfig {
            persistence_enabled: true,
            retention_seconds,
            db_source: source,
            db_path,
        }
    }
}

/// CLI-supplied overrides, already parsed and validated by `clap`.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub no_persist: bool,
    pub db_path: Option<PathBuf>,
    pub retention_seconds: Option<f64>,
}

/// TOML-shaped config file contents. Keys: `persistence.db_path`,
/// `persistence.retention_seconds`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub persistence: PersistenceSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistenceSection {
    pub db_path: Option<String>,
    pub retention_seconds: Option<f64>,
}

const DEFAULT_RETENTION_SECONDS: f64 = 7.0 * 24.0 * 3600.0;

/// Resolves the `RuntimeConfig` by CLI > env > config file > platform
/// default. `--no-persist` short-circuits everything else to
/// `persistence_enabled = false`.
pub fn resolve(cli: &CliOverrides) -> Result<RuntimeConfig> {
    if cli.no_persist {
        return Ok(RuntimeConfig::disabled());
    }

    let config_file = load_config_file(&default_config_file_path()?).unwrap_or_default();

    let retention_seconds = resolve_retention_seconds(cli, &config_file)?;
    let (db_path, source) = resolve_db_path(cli, &config_file)?;

    Ok(RuntimeConfig::enabled(db_path, retention_seconds, source))
}

fn resolve_retention_seconds(cli: &CliOverrides, config_file: &ConfigFile) -> Result<f64> {
    if let Some(seconds) = cli.retention_seconds {
        return validate_retention(seconds, "--retention-seconds");
    }
    if let Ok(raw) = std::env::var("AURA_RETENTION_SECONDS") {
        let seconds: f64 = raw
            .parse()
            .map_err(|_| AppError::InvalidArgument(format!("AURA_RETENTION_SECONDS is not a number: {raw}")))?;
        return validate_retention(seconds, "AURA_RETENTION_SECONDS");
    }
    if let Some(seconds) = config_file.persistence.retention_seconds {
        return validate_retention(seconds, "persistence.retention_seconds");
    }
    Ok(DEFAULT_RETENTION_SECONDS)
}

fn validate_retention(seconds: f64, origin: &str) -> Result<f64> {
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(AppError::InvalidArgument(format!(
            "{origin} must be a positive, finite number of seconds"
        )));
    }
    Ok(seconds)
}

fn resolve_db_path(cli: &CliOverrides, config_file: &ConfigFile) -> Result<(PathBuf, DbSource)> {
    if let Some(path) = &cli.db_path {
        return Ok((path.clone(), DbSource::Cli));
    }
    if let Ok(raw) = std::env::var("AURA_DB_PATH") {
        if raw.trim().is_empty() {
            return Err(AppError::InvalidArgument("AURA_DB_PATH must not be empty".into()));
        }
        return Ok((PathBuf::from(raw), DbSource::Env));
    }
    if let Some(path) = &config_file.persistence.db_path {
        if path.trim().is_empty() {
            return Err(AppError::InvalidArgument("persistence.db_path must not be empty".into()));
        }
        return Ok((PathBuf::from(path), DbSource::Config));
    }
    Ok((platform_default_db_path()?, DbSource::Auto))
}

/// Roaming app data on Windows, application support on macOS, XDG data dir
/// on Linux, with a `.`-prefixed fallback in the current directory when the
/// platform directory can't be determined.
fn platform_default_db_path() -> Result<PathBuf> {
    let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    Ok(base.join("aura").join("aura.sqlite3"))
}

fn default_config_file_path() -> Result<PathBuf> {
    let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    Ok(base.join("aura").join("config.toml"))
}

fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)?;
    let parsed: ConfigFile = toml::from_str(&content)?;
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_persist_overrides_everything() {
        let cli = CliOverrides {
            no_persist: true,
            db_path: Some(PathBuf::from("/tmp/should-be-ignored.db")),
            retention_seconds: Some(60.0),
        };
        let config = resolve(&cli).unwrap();
        assert!(!config.persistence_enabled);
        assert_eq!(config.db_source, DbSource::Disabled);
        assert_eq!(config.db_path, PathBuf::new());
    }

    #[test]
    fn cli_db_path_wins_over_everything_else() {
        let cli = CliOverrides {
            no_persist: false,
            db_path: Some(PathBuf::from("/tmp/explicit.db")),
            retention_seconds: Some(120.0),
        };
        let config = resolve(&cli).unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/explicit.db"));
        assert_eq!(config.db_source, DbSource::Cli);
        assert_eq!(config.retention_seconds, 120.0);
    }

    #[test]
    fn invalid_retention_seconds_fails_fast() {
        let cli = CliOverrides {
            no_persist: false,
            db_path: None,
            retention_seconds: Some(-1.0),
        };
        assert!(resolve(&cli).is_err());

        let cli_nan = CliOverrides {
            no_persist: false,
            db_path: None,
            retention_seconds: Some(f64::NAN),
        };
        assert!(resolve(&cli_nan).is_err());
    }

    #[test]
    fn persistence_enabled_false_iff_disabled_source_iff_empty_path() {
        let cli = CliOverrides {
            no_persist: true,
            ..Default::default()
        };
        let config = resolve(&cli).unwrap();
        assert_eq!(!config.persistence_enabled, config.db_source == DbSource::Disabled);
        assert_eq!(config.db_source == DbSource::Disabled, config.db_path.as_os_str().is_empty());
    }

    #[test]
    fn toml_config_file_parses_persistence_section() {
        let toml_str = r#"
            [persistence]
            db_path = "/var/lib/aura/aura.sqlite3"
            retention_seconds = 604800
        "#;
        let parsed: ConfigFile = toml::from_str(toml_str).unwrap();
        assert_eq!(parsed.persistence.db_path.as_deref(), Some("/var/lib/aura/aura.sqlite3"));
        assert_eq!(parsed.persistence.retention_seconds, Some(604800.0));
    }
}
