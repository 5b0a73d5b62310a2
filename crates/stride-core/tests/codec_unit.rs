// crates/stride-core/tests/codec_unit.rs
// ============================================================================
// Module: Bucket Codec Tests
// Description: Validate persisted table decoding and degradation rules.
// Purpose: Ensure schema evolution and malformed-payload handling are stable.
// Dependencies: stride-core
// ============================================================================

//! Bucket table codec tests.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use stride_core::Bucket;
use stride_core::BucketKey;
use stride_core::BucketTable;
use stride_core::CodecError;
use stride_core::decode_entry;
use stride_core::decode_table;
use stride_core::encode_table;

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[test]
fn table_round_trips_through_persisted_form() -> TestResult {
    let mut table = BucketTable::new();
    table.insert(
        BucketKey::new("2024-06-01"),
        Bucket {
            steps: 150,
            offset: 20,
            buffer: 3,
        },
    );
    table.insert(
        BucketKey::new("2024-06-02"),
        Bucket {
            steps: 10,
            offset: 170,
            buffer: 3,
        },
    );

    let payload = encode_table(&table)?;
    let decoded = decode_table(&payload)?;
    assert!(decoded.degraded.is_none());
    assert_eq!(decoded.table, table);
    Ok(())
}

#[test]
fn missing_buffer_field_defaults_to_zero() -> TestResult {
    let decoded = decode_table(r#"{"2024-06-01":{"steps":100,"offset":20}}"#)?;
    let bucket = decoded
        .table
        .get(&BucketKey::new("2024-06-01"))
        .copied()
        .expect("entry decoded");
    assert_eq!(bucket.steps, 100);
    assert_eq!(bucket.offset, 20);
    assert_eq!(bucket.buffer, 0);
    Ok(())
}

#[test]
fn malformed_top_level_degrades_to_empty_table() -> TestResult {
    for payload in ["not json", "[1,2,3]", "42", "\"text\"", "null"] {
        let decoded = decode_table(payload)?;
        assert!(decoded.table.is_empty(), "payload {payload} produced entries");
        assert!(decoded.degraded.is_some(), "payload {payload} not flagged");
    }
    Ok(())
}

#[test]
fn malformed_entry_is_a_keyed_error() {
    let result = decode_table(r#"{"2024-06-01":{"steps":"broken","offset":0}}"#);
    match result {
        Err(CodecError::Entry {
            key, ..
        }) => assert_eq!(key, "2024-06-01"),
        other => panic!("expected keyed entry error, got {other:?}"),
    }
}

#[test]
fn entry_lookup_skips_unrelated_malformed_entries() -> TestResult {
    let payload = r#"{"2024-06-01":{"steps":"broken","offset":0},"2024-06-02":{"steps":9,"offset":1}}"#;
    let bucket = decode_entry(payload, &BucketKey::new("2024-06-02"))?.expect("entry decoded");
    assert_eq!(bucket.steps, 9);
    Ok(())
}

#[test]
fn entry_lookup_reports_absence_and_degradation() -> TestResult {
    assert!(decode_entry("not json", &BucketKey::new("2024-06-01"))?.is_none());
    assert!(decode_entry("{}", &BucketKey::new("2024-06-01"))?.is_none());

    let malformed = decode_entry(
        r#"{"2024-06-01":{"steps":"broken","offset":0}}"#,
        &BucketKey::new("2024-06-01"),
    );
    assert!(malformed.is_err());
    Ok(())
}
