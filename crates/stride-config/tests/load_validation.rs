// crates/stride-config/tests/load_validation.rs
// ============================================================================
// Module: Config Load & Validation Tests
// Description: Validate TOML loading, path guards, and limit validation.
// Purpose: Ensure configuration loading is strict and fail-closed.
// ============================================================================

//! Configuration loading and validation tests.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use stride_config::ConfigError;
use stride_config::StrideConfig;
use stride_core::MAX_LOG_ENTRIES;
use stride_store_sqlite::SqliteJournalMode;
use stride_store_sqlite::SqliteSyncMode;
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Writes `contents` to a temp config file and returns its path.
fn write_config(dir: &TempDir, contents: &str) -> Result<PathBuf, std::io::Error> {
    let path = dir.path().join("stride.toml");
    fs::write(&path, contents)?;
    Ok(path)
}

#[test]
fn no_path_yields_validated_defaults() -> TestResult {
    let config = StrideConfig::load(None)?;
    assert_eq!(config.store.path, PathBuf::from("stride.db"));
    assert_eq!(config.store.busy_timeout_ms, 5_000);
    assert_eq!(config.store.journal_mode, SqliteJournalMode::Wal);
    assert_eq!(config.store.sync_mode, SqliteSyncMode::Full);
    assert_eq!(config.log.max_entries, MAX_LOG_ENTRIES);
    Ok(())
}

#[test]
fn full_document_loads() -> TestResult {
    let dir = TempDir::new()?;
    let path = write_config(
        &dir,
        r#"
[store]
path = "/var/lib/stride/steps.db"
busy_timeout_ms = 250
journal_mode = "delete"
sync_mode = "normal"

[log]
max_entries = 100
"#,
    )?;
    let config = StrideConfig::load(Some(&path))?;
    assert_eq!(config.store.path, PathBuf::from("/var/lib/stride/steps.db"));
    assert_eq!(config.store.busy_timeout_ms, 250);
    assert_eq!(config.store.journal_mode, SqliteJournalMode::Delete);
    assert_eq!(config.store.sync_mode, SqliteSyncMode::Normal);
    assert_eq!(config.log.max_entries, 100);
    Ok(())
}

#[test]
fn partial_document_fills_defaults() -> TestResult {
    let dir = TempDir::new()?;
    let path = write_config(&dir, "[store]\npath = \"steps.db\"\n")?;
    let config = StrideConfig::load(Some(&path))?;
    assert_eq!(config.store.busy_timeout_ms, 5_000);
    assert_eq!(config.log.max_entries, MAX_LOG_ENTRIES);
    Ok(())
}

#[test]
fn missing_file_is_an_io_error() {
    let result = StrideConfig::load(Some(Path::new("/nonexistent/stride.toml")));
    assert!(matches!(result, Err(ConfigError::Io(_))));
}

#[test]
fn overlong_path_component_is_rejected() {
    let component = "x".repeat(300);
    let path = PathBuf::from(component);
    let result = StrideConfig::load(Some(&path));
    match result {
        Err(ConfigError::Invalid(message)) => {
            assert!(message.contains("component too long"));
        }
        other => panic!("expected invalid path error, got {other:?}"),
    }
}

#[test]
fn overlong_total_path_is_rejected() {
    let path: PathBuf = (0 .. 40).map(|_| "y".repeat(120)).collect();
    let result = StrideConfig::load(Some(&path));
    match result {
        Err(ConfigError::Invalid(message)) => {
            assert!(message.contains("exceeds max length"));
        }
        other => panic!("expected invalid path error, got {other:?}"),
    }
}

#[test]
fn non_utf8_file_is_rejected() -> TestResult {
    let dir = TempDir::new()?;
    let path = dir.path().join("stride.toml");
    fs::write(&path, [0xFF_u8, 0xFE, 0x00, 0x41])?;
    let result = StrideConfig::load(Some(&path));
    match result {
        Err(ConfigError::Invalid(message)) => assert!(message.contains("utf-8")),
        other => panic!("expected utf-8 error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn malformed_toml_is_a_parse_error() -> TestResult {
    let dir = TempDir::new()?;
    let path = write_config(&dir, "[store\npath = ")?;
    let result = StrideConfig::load(Some(&path));
    assert!(matches!(result, Err(ConfigError::Parse(_))));
    Ok(())
}

#[test]
fn out_of_range_limits_are_rejected() -> TestResult {
    let dir = TempDir::new()?;

    let zero_timeout = write_config(&dir, "[store]\nbusy_timeout_ms = 0\n")?;
    assert!(matches!(
        StrideConfig::load(Some(&zero_timeout)),
        Err(ConfigError::Invalid(_))
    ));

    let oversized_log = write_config(&dir, "[log]\nmax_entries = 501\n")?;
    assert!(matches!(
        StrideConfig::load(Some(&oversized_log)),
        Err(ConfigError::Invalid(_))
    ));

    let zero_log = write_config(&dir, "[log]\nmax_entries = 0\n")?;
    assert!(matches!(StrideConfig::load(Some(&zero_log)), Err(ConfigError::Invalid(_))));
    Ok(())
}

#[test]
fn empty_store_path_is_rejected() -> TestResult {
    let dir = TempDir::new()?;
    let path = write_config(&dir, "[store]\npath = \"\"\n")?;
    let result = StrideConfig::load(Some(&path));
    match result {
        Err(ConfigError::Invalid(message)) => assert!(message.contains("store.path")),
        other => panic!("expected invalid path error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn store_config_carries_the_store_section() -> TestResult {
    let dir = TempDir::new()?;
    let path = write_config(
        &dir,
        "[store]\npath = \"steps.db\"\nbusy_timeout_ms = 750\njournal_mode = \"delete\"\n",
    )?;
    let config = StrideConfig::load(Some(&path))?;
    let store_config = config.store_config();
    assert_eq!(store_config.path, PathBuf::from("steps.db"));
    assert_eq!(store_config.busy_timeout_ms, 750);
    assert_eq!(store_config.journal_mode, SqliteJournalMode::Delete);
    Ok(())
}
