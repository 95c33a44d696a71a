//! DVR store retention scenario: appending a sample far outside the
//! retention window followed by one inside it should leave exactly the
//! in-window row behind.

use aura::store::DvrStore;
use aura::telemetry::sample::Sample;

#[test]
fn append_prunes_rows_older_than_retention_horizon() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("aura.sqlite3");
    let store = DvrStore::open(&db_path, 60.0).unwrap();

    let now = aura::clock::wall_seconds();
    let stale = Sample {
        timestamp: now - 120.0,
        ..Sample::zero(now - 120.0)
    };
    let fresh = Sample {
        timestamp: now,
        ..Sample::zero(now)
    };

    store.append(&stale).unwrap();
    store.append(&fresh).unwrap();

    assert_eq!(store.count().unwrap(), 1);
    let latest = store.latest(1).unwrap();
    assert_eq!(latest.len(), 1);
    assert!((latest[0].timestamp - now).abs() < 1.0);
}

#[test]
fn duplicate_timestamp_appends_are_both_retained() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("aura.sqlite3");
    let store = DvrStore::open(&db_path, 3600.0).unwrap();

    let now = aura::clock::wall_seconds();
    let a = Sample { cpu_percent: 10.0, ..Sample::zero(now) };
    let b = Sample { cpu_percent: 20.0, ..Sample::zero(now) };
    store.append(&a).unwrap();
    store.append(&b).unwrap();

    assert_eq!(store.count().unwrap(), 2);
}
