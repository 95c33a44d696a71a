//! DVR Store: an append-only, time-indexed store for telemetry samples.
//!
//! Backed by `rusqlite` (bundled SQLite) behind an internal mutex — callers
//! never block on each other longer than a single statement takes, which is
//! exactly SQLite's synchronous, single-statement-at-a-time execution model.

mod lttb;

use crate::error::{AppError, Result};
use crate::telemetry::sample::Sample;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub use lttb::downsample_lttb;

/// Current on-disk schema version. Version `1` is the legacy layout that
/// keyed rows on `timestamp` as the primary key; version `2` (current) uses
/// a synthetic `id` primary key with a `timestamp` index, so duplicate
/// timestamps can coexist per the append contract.
const CURRENT_SCHEMA_VERSION: i64 = 2;

pub struct DvrStore {
    conn: Mutex<Connection>,
    retention_seconds: f64,
    #[allow(dead_code)]
    path: PathBuf,
}

impl DvrStore {
    /// Creates parent directories if missing, opens (or creates and
    /// migrates) the schema, prunes stale entries, and returns a handle.
    pub fn open(path: &Path, retention_seconds: f64) -> Result<Self> {
        if !(retention_seconds > 0.0) || !retention_seconds.is_finite() {
            return Err(AppError::InvalidArgument(
                "retention_seconds must be a positive, finite number".into(),
            ));
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        remove_stale_temp_file(path);

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "FULL")?;

        migrate_schema(&conn)?;
        prune(&conn, retention_seconds)?;

        Ok(DvrStore {
            conn: Mutex::new(conn),
            retention_seconds,
            path: path.to_path_buf(),
        })
    }

    /// Durable insert. Rows with duplicate timestamps are preserved: the
    /// primary key is a synthetic id, never the timestamp.
    pub fn append(&self, sample: &Sample) -> Result<()> {
        let conn = self.conn.lock().expect("dvr store mutex poisoned");
        conn.execute(
            "INSERT INTO samples (
                timestamp, cpu_percent, memory_percent,
                disk_read_bps, disk_write_bps, network_recv_bps, network_sent_bps
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                sample.timestamp,
                sample.cpu_percent,
                sample.memory_percent,
                sample.disk_read_bps,
                sample.disk_write_bps,
                sample.network_recv_bps,
                sample.network_sent_bps,
            ],
        )?;
        prune(&conn, self.retention_seconds)?;
        Ok(())
    }

    pub fn count(&self) -> Result<u64> {
        let conn = self.conn.lock().expect("dvr store mutex poisoned");
        prune(&conn, self.retention_seconds)?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM samples", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Last `n` rows, timestamp ascending.
    pub fn latest(&self, n: u64) -> Result<Vec<Sample>> {
        let conn = self.conn.lock().expect("dvr store mutex poisoned");
        prune(&conn, self.retention_seconds)?;
        let mut stmt = conn.prepare(
            "SELECT timestamp, cpu_percent, memory_percent, disk_read_bps, disk_write_bps,
                    network_recv_bps, network_sent_bps
             FROM (SELECT * FROM samples ORDER BY timestamp DESC LIMIT ?1)
             ORDER BY timestamp ASC",
        )?;
        let rows = stmt
            .query_map(params![n as i64], row_to_sample)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Rows with `start <= ts <= end`; either bound is optional.
    pub fn between(&self, start: Option<f64>, end: Option<f64>) -> Result<Vec<Sample>> {
        let conn = self.conn.lock().expect("dvr store mutex poisoned");
        prune(&conn, self.retention_seconds)?;
        let start = start.unwrap_or(f64::NEG_INFINITY);
        let end = end.unwrap_or(f64::INFINITY);
        let mut stmt = conn.prepare(
            "SELECT timestamp, cpu_percent, memory_percent, disk_read_bps, disk_write_bps,
                    network_recv_bps, network_sent_bps
             FROM samples WHERE timestamp >= ?1 AND timestamp <= ?2 ORDER BY timestamp ASC",
        )?;
        let rows = stmt
            .query_map(params![start, end], row_to_sample)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// `between` followed by LTTB to `resolution` points.
    pub fn query_timeline(&self, start: Option<f64>, end: Option<f64>, resolution: usize) -> Result<Vec<Sample>> {
        let rows = self.between(start, end)?;
        Ok(downsample_lttb(&rows, resolution.max(3)))
    }

    pub fn close(self) -> Result<()> {
        let conn = self.conn.into_inner().expect("dvr store mutex poisoned");
        conn.close().map_err(|(_, e)| AppError::from(e))
    }
}

fn row_to_sample(row: &rusqlite::Row) -> rusqlite::Result<Sample> {
    Ok(Sample {
        timestamp: row.get(0)?,
        cpu_percent: row.get(1)?,
        memory_percent: row.get(2)?,
        disk_read_bps: row.get(3)?,
        disk_write_bps: row.get(4)?,
        network_recv_bps: row.get(5)?,
        network_sent_bps: row.get(6)?,
    })
}

fn remove_stale_temp_file(path: &Path) {
    let tmp = path.with_extension("tmp");
    let _ = std::fs::remove_file(tmp);
}

fn prune(conn: &Connection, retention_seconds: f64) -> Result<()> {
    let horizon = crate::clock::wall_seconds() - retention_seconds;
    conn.execute("DELETE FROM samples WHERE timestamp < ?1", params![horizon])?;
    Ok(())
}

fn migrate_schema(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_meta (version INTEGER NOT NULL)",
        [],
    )?;
    let version: Option<i64> = conn
        .query_row("SELECT version FROM schema_meta LIMIT 1", [], |row| row.get(0))
        .optional()?;

    match version {
        Some(v) if v == CURRENT_SCHEMA_VERSION => Ok(()),
        Some(v) => Err(AppError::Store(format!("unsupported schema version {v}"))),
        None => {
            let legacy_exists: bool = conn
                .query_row(
                    "SELECT 1 FROM sqlite_master WHERE type='table' AND name='samples'",
                    [],
                    |_| Ok(true),
                )
                .optional()?
                .unwrap_or(false);

            create_current_schema(conn)?;
            if legacy_exists {
                migrate_legacy_rows(conn)?;
            } else {
                conn.execute("ALTER TABLE samples_v2 RENAME TO samples", [])?;
            }
            conn.execute("INSERT INTO schema_meta (version) VALUES (?1)", params![CURRENT_SCHEMA_VERSION])?;
            Ok(())
        }
    }
}

fn create_current_schema(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS samples_v2 (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp REAL NOT NULL,
            cpu_percent REAL NOT NULL,
            memory_percent REAL NOT NULL,
            disk_read_bps REAL NOT NULL,
            disk_write_bps REAL NOT NULL,
            network_recv_bps REAL NOT NULL,
            network_sent_bps REAL NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_samples_v2_timestamp ON samples_v2 (timestamp)",
        [],
    )?;
    Ok(())
}

/// Reads every row out of a legacy `timestamp`-primary-key `samples` table
/// and rewrites it under the synthetic-id layout, then swaps the names so
/// `samples` always refers to the current table.
fn migrate_legacy_rows(conn: &Connection) -> Result<()> {
    let has_synthetic_id: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='samples' \
             AND sql LIKE '%id INTEGER PRIMARY KEY%'",
            [],
            |_| Ok(true),
        )
        .optional()?
        .unwrap_or(false);
    if has_synthetic_id {
        // Already current-shaped under the old name; just rename.
        conn.execute("DROP TABLE samples_v2", [])?;
        conn.execute("ALTER TABLE samples RENAME TO samples_v2", [])?;
        return Ok(());
    }

    conn.execute(
        "INSERT INTO samples_v2 (
            timestamp, cpu_percent, memory_percent,
            disk_read_bps, disk_write_bps, network_recv_bps, network_sent_bps
        )
        SELECT timestamp, cpu_percent, memory_percent,
               disk_read_bps, disk_write_bps, network_recv_bps, network_sent_bps
        FROM samples ORDER BY timestamp ASC",
        [],
    )?;
    conn.execute("DROP TABLE samples", [])?;
    conn.execute("ALTER TABLE samples_v2 RENAME TO samples", [])?;
    Ok(())
}
