// crates/stride-store-sqlite/tests/sqlite_store_unit.rs
// ============================================================================
// Module: SQLite Step Store Unit Tests
// Description: Targeted tests for the SQLite-backed step store.
// Purpose: Validate configuration guards, schema versioning, persistence
//          across reopen, and cross-handle visibility.
// ============================================================================

//! ## Overview
//! Unit-level tests for `SQLite` store invariants:
//! - Configuration validation (empty path, zero busy timeout)
//! - Schema version gating on open
//! - Key/value persistence across process-style reopen
//! - Visibility between two handles on the same database file
//! - Engine reconciliation over the durable store

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::path::Path;
use std::path::PathBuf;

use rusqlite::Connection;
use stride_core::Granularity;
use stride_core::ReconcileEngine;
use stride_core::StepStore;
use stride_core::TOTAL_COUNT_KEY;
use stride_store_sqlite::SqliteJournalMode;
use stride_store_sqlite::SqliteStepStore;
use stride_store_sqlite::SqliteStoreConfig;
use stride_store_sqlite::SqliteStoreError;
use stride_store_sqlite::SqliteSyncMode;
use tempfile::TempDir;
use time::Date;
use time::Month;
use time::OffsetDateTime;

type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Builds a store configuration pointing at `path`.
fn config_at(path: &Path) -> SqliteStoreConfig {
    SqliteStoreConfig {
        path: path.to_path_buf(),
        busy_timeout_ms: 5_000,
        journal_mode: SqliteJournalMode::Wal,
        sync_mode: SqliteSyncMode::Full,
    }
}

#[test]
fn empty_path_is_rejected() {
    let config = SqliteStoreConfig {
        path: PathBuf::new(),
        busy_timeout_ms: 5_000,
        journal_mode: SqliteJournalMode::Wal,
        sync_mode: SqliteSyncMode::Full,
    };
    let result = SqliteStepStore::open(&config);
    assert!(matches!(result, Err(SqliteStoreError::Invalid(_))));
}

#[test]
fn zero_busy_timeout_is_rejected() -> TestResult {
    let dir = TempDir::new()?;
    let mut config = config_at(&dir.path().join("stride.db"));
    config.busy_timeout_ms = 0;
    let result = SqliteStepStore::open(&config);
    assert!(matches!(result, Err(SqliteStoreError::Invalid(_))));
    Ok(())
}

#[test]
fn values_persist_across_reopen() -> TestResult {
    let dir = TempDir::new()?;
    let config = config_at(&dir.path().join("stride.db"));

    {
        let store = SqliteStepStore::open(&config)?;
        store.set("pedometerDayData", r#"{"2024-06-01":{"steps":5,"offset":0,"buffer":0}}"#)?;
        store.set(TOTAL_COUNT_KEY, "5")?;
    }

    let reopened = SqliteStepStore::open(&config)?;
    assert_eq!(reopened.get(TOTAL_COUNT_KEY)?.as_deref(), Some("5"));
    assert!(reopened.get("pedometerDayData")?.is_some());
    Ok(())
}

#[test]
fn set_overwrites_and_remove_deletes() -> TestResult {
    let dir = TempDir::new()?;
    let store = SqliteStepStore::open(&config_at(&dir.path().join("stride.db")))?;

    store.set("key", "one")?;
    store.set("key", "two")?;
    assert_eq!(store.get("key")?.as_deref(), Some("two"));

    store.remove("key")?;
    assert!(store.get("key")?.is_none());
    // Removing an absent key is not an error.
    store.remove("key")?;
    Ok(())
}

#[test]
fn writes_are_visible_across_handles() -> TestResult {
    let dir = TempDir::new()?;
    let config = config_at(&dir.path().join("stride.db"));
    let writer = SqliteStepStore::open(&config)?;
    let reader = SqliteStepStore::open(&config)?;

    writer.set(TOTAL_COUNT_KEY, "123")?;
    assert_eq!(reader.get(TOTAL_COUNT_KEY)?.as_deref(), Some("123"));
    Ok(())
}

#[test]
fn newer_schema_version_is_refused() -> TestResult {
    let dir = TempDir::new()?;
    let path = dir.path().join("stride.db");
    {
        let store = SqliteStepStore::open(&config_at(&path))?;
        store.readiness()?;
    }
    {
        let connection = Connection::open(&path)?;
        connection.execute("UPDATE store_meta SET version = 999", [])?;
    }
    let result = SqliteStepStore::open(&config_at(&path));
    assert!(matches!(result, Err(SqliteStoreError::VersionMismatch(_))));
    Ok(())
}

#[test]
fn delete_journal_mode_opens() -> TestResult {
    let dir = TempDir::new()?;
    let mut config = config_at(&dir.path().join("stride.db"));
    config.journal_mode = SqliteJournalMode::Delete;
    config.sync_mode = SqliteSyncMode::Normal;
    let store = SqliteStepStore::open(&config)?;
    store.readiness()?;
    Ok(())
}

#[test]
fn engine_reconciles_over_the_durable_store() -> TestResult {
    let dir = TempDir::new()?;
    let config = config_at(&dir.path().join("stride.db"));
    let now: OffsetDateTime = Date::from_calendar_date(2024, Month::June, 1)?
        .with_hms(10, 0, 0)?
        .assume_utc();
    let engine = ReconcileEngine::default();

    {
        let store = SqliteStepStore::open(&config)?;
        let outcome = engine.reconcile(&store, Granularity::Day, 120, now)?;
        assert_eq!(outcome.steps, 120);
    }

    // A fresh handle (a second process, in production) continues the bucket.
    let store = SqliteStepStore::open(&config)?;
    let outcome = engine.reconcile(&store, Granularity::Day, 150, now)?;
    assert_eq!(outcome.steps, 150);
    assert_eq!(engine.lifetime_total(&store)?, 150);
    Ok(())
}
