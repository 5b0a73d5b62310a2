// crates/stride-core/src/core/bucket.rs
// ============================================================================
// Module: Stride Bucket Model
// Description: Reconciled step state for one calendar day or hour.
// Purpose: Define the persisted bucket record and its table mapping.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A bucket holds the reconciled step state for a single time unit. Two
//! independent tables exist, keyed at day and hour granularity. Buckets are
//! created on first observation of their key, mutated on every subsequent
//! reading that maps to the same key, and never deleted; unbounded table
//! growth is an accepted property of the persisted format.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Bucket Key
// ============================================================================

/// Date-string key identifying one bucket within a table.
///
/// # Invariants
/// - Daily keys are formatted `YYYY-MM-DD`; hourly keys `YYYY-MM-DD HH`.
/// - Keys are unique within a table; insertion order is irrelevant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BucketKey(String);

impl BucketKey {
    /// Creates a bucket key from its wire string form.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the wire string form of the key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: Bucket Record
// ============================================================================

/// Reconciled step state for one time unit.
///
/// # Invariants
/// - `steps == raw - offset + buffer` at the moment of the last successful
///   write for this bucket.
/// - `steps` is non-decreasing across successive writes to the same bucket.
/// - `steps >= 0` and `buffer >= 0` in every persisted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    /// Reconciled step count for this bucket.
    pub steps: i64,
    /// Raw sensor value corresponding to zero steps within this bucket.
    pub offset: i64,
    /// Accumulated correction applied when an inconsistency was detected.
    /// Legacy records omit the field and decode as zero.
    #[serde(default)]
    pub buffer: i64,
}

// ============================================================================
// SECTION: Bucket Table
// ============================================================================

/// Mapping from bucket key to bucket record for one granularity.
pub type BucketTable = BTreeMap<BucketKey, Bucket>;
