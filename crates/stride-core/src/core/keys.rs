// crates/stride-core/src/core/keys.rs
// ============================================================================
// Module: Stride Bucket Granularity & Store Keys
// Description: Bucket granularities, date-key formatting, and store key names.
// Purpose: Provide deterministic key derivation from caller-supplied time.
// Dependencies: crate::core::bucket, time
// ============================================================================

//! ## Overview
//! Bucket keys are derived from the local calendar value the host supplies;
//! the core never reads wall-clock time directly. Day keys use `YYYY-MM-DD`,
//! hour keys `YYYY-MM-DD HH`. The previous-key computation subtracts one
//! granularity unit and is used only for rollover inheritance.
//!
//! Store key names are fixed by the persisted wire format shared with older
//! deployments and must not be changed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use time::Duration;
use time::OffsetDateTime;

use crate::core::bucket::BucketKey;

// ============================================================================
// SECTION: Store Keys
// ============================================================================

/// Store key holding the daily bucket table.
pub const DAY_TABLE_KEY: &str = "pedometerDayData";
/// Store key holding the hourly bucket table.
pub const HISTORY_TABLE_KEY: &str = "pedometerHistoryData";
/// Store key holding the lifetime step total.
pub const TOTAL_COUNT_KEY: &str = "PEDOMETER_TOTAL_COUNT_PREF";
/// Store key holding the bounded debug log ring.
pub const DEBUG_LOG_KEY: &str = "pedometerDebugLogs";

// ============================================================================
// SECTION: Granularity
// ============================================================================

/// Bucket granularity selecting a table and its rollover cadence.
///
/// # Invariants
/// - Variants are stable; each maps to exactly one store key and key format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    /// Daily buckets, keyed `YYYY-MM-DD`, rolling over once per day.
    Day,
    /// Hourly buckets, keyed `YYYY-MM-DD HH`, rolling over once per hour.
    Hour,
}

impl Granularity {
    /// Returns the store key under which this granularity's table persists.
    #[must_use]
    pub const fn table_key(self) -> &'static str {
        match self {
            Self::Day => DAY_TABLE_KEY,
            Self::Hour => HISTORY_TABLE_KEY,
        }
    }

    /// Derives the bucket key for the supplied moment.
    #[must_use]
    pub fn bucket_key(self, moment: OffsetDateTime) -> BucketKey {
        let date = moment.date();
        match self {
            Self::Day => BucketKey::new(format!(
                "{:04}-{:02}-{:02}",
                date.year(),
                u8::from(date.month()),
                date.day()
            )),
            Self::Hour => BucketKey::new(format!(
                "{:04}-{:02}-{:02} {:02}",
                date.year(),
                u8::from(date.month()),
                date.day(),
                moment.hour()
            )),
        }
    }

    /// Derives the bucket key for one granularity unit before the moment.
    #[must_use]
    pub fn previous_bucket_key(self, moment: OffsetDateTime) -> BucketKey {
        let earlier = match self {
            Self::Day => moment.saturating_sub(Duration::days(1)),
            Self::Hour => moment.saturating_sub(Duration::hours(1)),
        };
        self.bucket_key(earlier)
    }
}
