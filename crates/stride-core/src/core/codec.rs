// crates/stride-core/src/core/codec.rs
// ============================================================================
// Module: Stride Bucket Codec
// Description: JSON codec for persisted bucket tables.
// Purpose: Serialize bucket tables to the store's string representation with
//          graceful degradation on malformed payloads.
// Dependencies: crate::core::bucket, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Each bucket table persists as a single JSON object keyed by date string,
//! whose values carry integer `steps`, `offset`, and optionally `buffer`
//! fields. Decoding degrades gracefully: a missing `buffer` defaults to zero
//! (schema evolution), and a malformed top-level payload decodes to an empty
//! table with the failure reported so callers can log it. A key that is
//! present but carries malformed fields is a recoverable error scoped to the
//! operation; it is never silently treated as "no entry", because doing so
//! would re-derive the offset from the current raw value and discard the
//! bucket's progress.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::core::bucket::Bucket;
use crate::core::bucket::BucketKey;
use crate::core::bucket::BucketTable;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Bucket codec errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Bucket table could not be encoded.
    #[error("bucket table encode failed: {0}")]
    Encode(String),
    /// A present bucket entry carries malformed fields.
    #[error("bucket entry malformed under key {key}: {detail}")]
    Entry {
        /// Bucket key whose entry failed to decode.
        key: String,
        /// Decode failure detail.
        detail: String,
    },
}

// ============================================================================
// SECTION: Decoded Table
// ============================================================================

/// Result of decoding a bucket table payload.
///
/// # Invariants
/// - `degraded` is `Some` exactly when the top-level payload was malformed
///   and the table was substituted with an empty one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTable {
    /// Decoded bucket table (empty when the payload was malformed).
    pub table: BucketTable,
    /// Top-level decode failure detail, for the caller to log.
    pub degraded: Option<String>,
}

// ============================================================================
// SECTION: Codec Operations
// ============================================================================

/// Encodes a bucket table to its persisted string form.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] when serialization fails.
pub fn encode_table(table: &BucketTable) -> Result<String, CodecError> {
    serde_json::to_string(table).map_err(|err| CodecError::Encode(err.to_string()))
}

/// Decodes a bucket table from its persisted string form.
///
/// # Errors
///
/// Returns [`CodecError::Entry`] when a present entry carries malformed
/// fields. A malformed top-level payload is not an error; it yields an empty
/// table with [`DecodedTable::degraded`] set.
pub fn decode_table(payload: &str) -> Result<DecodedTable, CodecError> {
    let entries = match parse_object(payload) {
        Ok(entries) => entries,
        Err(detail) => {
            return Ok(DecodedTable {
                table: BucketTable::new(),
                degraded: Some(detail),
            });
        }
    };
    let mut table = BucketTable::new();
    for (key, value) in entries {
        let bucket = decode_bucket(&key, value)?;
        table.insert(BucketKey::new(key), bucket);
    }
    Ok(DecodedTable {
        table,
        degraded: None,
    })
}

/// Decodes a single bucket entry without materializing the whole table.
///
/// Read-only queries use this to avoid failing on malformed entries under
/// unrelated keys.
///
/// # Errors
///
/// Returns [`CodecError::Entry`] when the requested entry is present but
/// carries malformed fields. A malformed top-level payload decodes to `None`.
pub fn decode_entry(payload: &str, key: &BucketKey) -> Result<Option<Bucket>, CodecError> {
    let Ok(mut entries) = parse_object(payload) else {
        return Ok(None);
    };
    match entries.remove(key.as_str()) {
        Some(value) => decode_bucket(key.as_str(), value).map(Some),
        None => Ok(None),
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses a payload into its top-level JSON object map.
fn parse_object(payload: &str) -> Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(payload) {
        Ok(Value::Object(entries)) => Ok(entries),
        Ok(other) => Err(format!("expected object, found {}", json_kind(&other))),
        Err(err) => Err(err.to_string()),
    }
}

/// Decodes one bucket value, mapping failures to a keyed entry error.
fn decode_bucket(key: &str, value: Value) -> Result<Bucket, CodecError> {
    serde_json::from_value(value).map_err(|err| CodecError::Entry {
        key: key.to_string(),
        detail: err.to_string(),
    })
}

/// Returns a stable label for a JSON value kind.
const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
