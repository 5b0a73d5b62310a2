// crates/stride-core/src/runtime/engine.rs
// ============================================================================
// Module: Stride Reconciliation Engine
// Description: Converts raw sensor readings into monotonic bucketed totals.
// Purpose: Detect and repair counter anomalies while keeping reported step
//          counts non-decreasing across crashes, reboots, and restarts.
// Dependencies: crate::core, crate::interfaces, thiserror, time
// ============================================================================

//! ## Overview
//! The engine holds no step state across calls; the store owns everything.
//! Each reading is reconciled once against the daily table and once against
//! the hourly table, with independent offset/buffer state. Anomaly repair
//! trades a small, bounded over-count for the guarantee that reported steps
//! never decrease: when a reading implies a negative delta within the same
//! bucket (a sensor reset without rollover), the buffer grows by
//! `abs(delta) + 1` so the recomputed count strictly exceeds the prior one.
//!
//! Commit order is fixed: the lifetime total is written first, then the
//! bucket table. A table-write failure restores the total best-effort. A
//! crash between the two writes can leave an inflated total; this is the
//! documented approximation of atomicity over a plain key/value store.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;
use time::OffsetDateTime;

use crate::core::bucket::Bucket;
use crate::core::bucket::BucketTable;
use crate::core::codec::CodecError;
use crate::core::codec::DecodedTable;
use crate::core::codec::decode_entry;
use crate::core::codec::decode_table;
use crate::core::codec::encode_table;
use crate::core::keys::Granularity;
use crate::core::keys::HISTORY_TABLE_KEY;
use crate::core::keys::TOTAL_COUNT_KEY;
use crate::core::log::DebugLog;
use crate::core::log::LogEntry;
use crate::core::log::LogLevel;
use crate::interfaces::StepStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Log tag for engine entries.
const TAG: &str = "engine";

/// Largest raw reading accepted from the sensor, chosen so every value is
/// exactly representable as an `f64`.
const MAX_RAW_READING: i64 = 1 << 53;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Reconciliation engine errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Errors cover the read path only; write failures surface as
///   [`CommitStatus::StoreFailed`] so callers keep the last-known-good value.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Step store read failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Persisted bucket entry is malformed.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Outcome classification for a single reconcile pass.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStatus {
    /// Both the lifetime total and the bucket table were durably updated.
    Committed,
    /// The reading implied negative steps even after repair; nothing was
    /// written.
    Rejected,
    /// A durable write was not acknowledged; stores were left at (or
    /// restored to) their pre-attempt values.
    StoreFailed,
}

/// Result of one reconcile pass.
///
/// # Invariants
/// - On [`CommitStatus::Committed`], `steps` is the newly persisted count;
///   otherwise it is the last-known-good count for the bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciliation {
    /// Reported step count for the bucket.
    pub steps: i64,
    /// Commit outcome.
    pub status: CommitStatus,
}

/// Outcome classification for one sensor reading.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadingStatus {
    /// Reconciliation committed durably.
    Committed,
    /// Reading implied negative steps even after repair.
    Rejected,
    /// Durable write was not acknowledged.
    StoreFailed,
    /// Raw value was not a usable reading (negative, non-finite, or out of
    /// range).
    Invalid,
    /// Read path failed (store error or malformed persisted entry).
    Faulted,
}

impl From<CommitStatus> for ReadingStatus {
    fn from(status: CommitStatus) -> Self {
        match status {
            CommitStatus::Committed => Self::Committed,
            CommitStatus::Rejected => Self::Rejected,
            CommitStatus::StoreFailed => Self::StoreFailed,
        }
    }
}

/// Report returned to the host for one sensor reading.
///
/// # Invariants
/// - `daily_steps` carries the daily table's reported count, suitable for
///   caller notification regardless of outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorReport {
    /// Daily-reconciled step count.
    pub daily_steps: i64,
    /// Outcome of the daily reconcile.
    pub daily_status: ReadingStatus,
    /// Outcome of the hourly reconcile.
    pub hourly_status: ReadingStatus,
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Stateless reconciliation engine over a [`StepStore`].
///
/// # Invariants
/// - Holds no step state across calls; all state lives in the store.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcileEngine {
    /// Debug log sink for anomaly and failure reporting.
    log: DebugLog,
}

impl ReconcileEngine {
    /// Creates an engine that reports through the given debug log.
    #[must_use]
    pub const fn new(log: DebugLog) -> Self {
        Self {
            log,
        }
    }

    /// Reconciles one rounded raw reading against one table.
    ///
    /// Implements the bucketed offset/buffer algorithm: rollover inheritance
    /// from the previous bucket, anomaly repair on negative in-bucket deltas,
    /// rejection of readings that stay negative after repair, and the
    /// total-then-table commit with best-effort rollback.
    ///
    /// Repair drives the recomputed count to `old_steps + 1`, so with the
    /// non-negative counts this engine writes, [`CommitStatus::Rejected`] is
    /// a backstop reachable only through a persisted record whose `steps`
    /// went negative outside this engine.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the read path fails (store read error or
    /// a malformed entry under the current or previous key). Write failures
    /// are not errors; they surface as [`CommitStatus::StoreFailed`] with the
    /// last-known-good count.
    pub fn reconcile<S: StepStore + ?Sized>(
        &self,
        store: &S,
        granularity: Granularity,
        raw: i64,
        now: OffsetDateTime,
    ) -> Result<Reconciliation, EngineError> {
        let table_key = granularity.table_key();
        let mut table = self.load_table(store, table_key, now)?;

        let bucket_key = granularity.bucket_key(now);
        let previous_key = granularity.previous_bucket_key(now);

        let (offset, mut buffer, old_steps) = match table.get(&bucket_key) {
            Some(bucket) => (bucket.offset, bucket.buffer, bucket.steps),
            None => match table.get(&previous_key) {
                // Rollover: carry cumulative raw-to-steps alignment across
                // the boundary, assuming the sensor did not reset between
                // buckets.
                Some(previous) => {
                    (previous.offset.saturating_add(previous.steps), previous.buffer, 0)
                }
                // First run, or a gap with no adjacent bucket: the full raw
                // reading counts toward the fresh bucket.
                None => (0, 0, 0),
            },
        };

        let delta =
            raw.saturating_sub(offset).saturating_add(buffer).saturating_sub(old_steps);
        if delta < 0 {
            // A prior buffer adjustment was insufficient, typically because
            // the sensor counter reset without a bucket rollover.
            buffer = buffer.saturating_add(delta.saturating_abs().saturating_add(1));
            self.log.append_best_effort(
                store,
                log_entry(
                    now,
                    LogLevel::Warn,
                    format!(
                        "negative delta {delta} under {bucket_key}; buffer repaired to {buffer}"
                    ),
                ),
            );
        }

        let new_steps = raw.saturating_sub(offset).saturating_add(buffer);
        if new_steps < 0 {
            self.log.append_best_effort(
                store,
                log_entry(
                    now,
                    LogLevel::Warn,
                    format!(
                        "calculated negative steps {new_steps} under {bucket_key}; keeping {old_steps}"
                    ),
                ),
            );
            return Ok(Reconciliation {
                steps: old_steps,
                status: CommitStatus::Rejected,
            });
        }

        let old_total = self.lifetime_total(store)?;
        let new_total = old_total.saturating_add(new_steps.saturating_sub(old_steps));
        if let Err(err) = store.set(TOTAL_COUNT_KEY, &new_total.to_string()) {
            self.log.append_best_effort(
                store,
                log_entry(now, LogLevel::Error, format!("total write failed: {err}")),
            );
            return Ok(Reconciliation {
                steps: old_steps,
                status: CommitStatus::StoreFailed,
            });
        }

        table.insert(
            bucket_key.clone(),
            Bucket {
                steps: new_steps,
                offset,
                buffer,
            },
        );
        if let Err(err) = self.write_table(store, table_key, &table) {
            // Best-effort rollback keeps the total consistent with the table
            // when the restoring write itself succeeds.
            let _ = store.set(TOTAL_COUNT_KEY, &old_total.to_string());
            self.log.append_best_effort(
                store,
                log_entry(
                    now,
                    LogLevel::Error,
                    format!("table write failed under {bucket_key}: {err}"),
                ),
            );
            return Ok(Reconciliation {
                steps: old_steps,
                status: CommitStatus::StoreFailed,
            });
        }

        Ok(Reconciliation {
            steps: new_steps,
            status: CommitStatus::Committed,
        })
    }

    /// Processes one raw sensor reading against both tables.
    ///
    /// Never fails past the caller: unusable values and read-path faults are
    /// absorbed into the report after being logged, and `daily_steps` falls
    /// back to the last persisted daily count.
    pub fn on_sensor_reading<S: StepStore + ?Sized>(
        &self,
        store: &S,
        raw_value: f64,
        now: OffsetDateTime,
    ) -> SensorReport {
        let Some(raw) = round_raw(raw_value) else {
            self.log.append_best_effort(
                store,
                log_entry(now, LogLevel::Warn, format!("invalid raw reading {raw_value}")),
            );
            return SensorReport {
                daily_steps: self.last_daily_steps(store, now),
                daily_status: ReadingStatus::Invalid,
                hourly_status: ReadingStatus::Invalid,
            };
        };

        let (daily_steps, daily_status) = match self.reconcile(store, Granularity::Day, raw, now) {
            Ok(outcome) => (outcome.steps, ReadingStatus::from(outcome.status)),
            Err(err) => {
                self.log.append_best_effort(
                    store,
                    log_entry(now, LogLevel::Error, format!("daily reconcile faulted: {err}")),
                );
                (self.last_daily_steps(store, now), ReadingStatus::Faulted)
            }
        };

        let hourly_status = match self.reconcile(store, Granularity::Hour, raw, now) {
            Ok(outcome) => ReadingStatus::from(outcome.status),
            Err(err) => {
                self.log.append_best_effort(
                    store,
                    log_entry(now, LogLevel::Error, format!("hourly reconcile faulted: {err}")),
                );
                ReadingStatus::Faulted
            }
        };

        SensorReport {
            daily_steps,
            daily_status,
            hourly_status,
        }
    }

    /// Folds each open bucket's steps into its buffer ahead of power-off.
    ///
    /// After an uncontrolled shutdown resets the sensor counter, the next
    /// reading for the same still-open bucket reconciles as
    /// `raw - 0 + old_steps`, continuing from where it left off. One attempt
    /// per table, best-effort; failures are logged and swallowed.
    pub fn on_shutdown<S: StepStore + ?Sized>(&self, store: &S, now: OffsetDateTime) {
        for granularity in [Granularity::Day, Granularity::Hour] {
            self.fold_bucket(store, granularity, now);
        }
    }

    /// Returns the lifetime step total (zero when absent or malformed).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the store read fails.
    pub fn lifetime_total<S: StepStore + ?Sized>(&self, store: &S) -> Result<i64, EngineError> {
        let Some(payload) = store.get(TOTAL_COUNT_KEY)? else {
            return Ok(0);
        };
        Ok(payload.trim().parse().unwrap_or(0))
    }

    /// Returns today's reconciled step count, or `-1` when no data exists
    /// for today yet.
    ///
    /// A malformed entry degrades to `-1` on this read-only path, matching
    /// the query surface's recover-by-default policy.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the store read fails.
    pub fn today_total<S: StepStore + ?Sized>(
        &self,
        store: &S,
        now: OffsetDateTime,
    ) -> Result<i64, EngineError> {
        let Some(payload) = store.get(Granularity::Day.table_key())? else {
            return Ok(-1);
        };
        let key = Granularity::Day.bucket_key(now);
        match decode_entry(&payload, &key) {
            Ok(Some(bucket)) => Ok(bucket.steps),
            Ok(None) => Ok(-1),
            Err(err) => {
                self.log.append_best_effort(
                    store,
                    log_entry(now, LogLevel::Error, format!("today query degraded: {err}")),
                );
                Ok(-1)
            }
        }
    }

    /// Returns the serialized hourly table (`"{}"` when absent).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the store read fails.
    pub fn history<S: StepStore + ?Sized>(&self, store: &S) -> Result<String, EngineError> {
        Ok(store.get(HISTORY_TABLE_KEY)?.unwrap_or_else(|| "{}".to_string()))
    }

    // ------------------------------------------------------------------
    // Internal helpers
    // ------------------------------------------------------------------

    /// Loads and decodes one bucket table, logging top-level degradation.
    fn load_table<S: StepStore + ?Sized>(
        &self,
        store: &S,
        table_key: &str,
        now: OffsetDateTime,
    ) -> Result<BucketTable, EngineError> {
        let Some(payload) = store.get(table_key)? else {
            return Ok(BucketTable::new());
        };
        let DecodedTable {
            table,
            degraded,
        } = decode_table(&payload)?;
        if let Some(detail) = degraded {
            self.log.append_best_effort(
                store,
                log_entry(
                    now,
                    LogLevel::Error,
                    format!("malformed table under {table_key}: {detail}"),
                ),
            );
        }
        Ok(table)
    }

    /// Encodes and durably writes one bucket table.
    fn write_table<S: StepStore + ?Sized>(
        &self,
        store: &S,
        table_key: &str,
        table: &BucketTable,
    ) -> Result<(), EngineError> {
        let payload = encode_table(table)?;
        store.set(table_key, &payload)?;
        Ok(())
    }

    /// Rewrites the current bucket of one table with its buffer folded.
    fn fold_bucket<S: StepStore + ?Sized>(
        &self,
        store: &S,
        granularity: Granularity,
        now: OffsetDateTime,
    ) {
        let table_key = granularity.table_key();
        let mut table = match self.load_table(store, table_key, now) {
            Ok(table) => table,
            Err(err) => {
                self.log.append_best_effort(
                    store,
                    log_entry(now, LogLevel::Error, format!("shutdown fold skipped: {err}")),
                );
                return;
            }
        };
        let bucket_key = granularity.bucket_key(now);
        let Some(bucket) = table.get(&bucket_key).copied() else {
            return;
        };
        if bucket.steps < 0 {
            return;
        }
        table.insert(
            bucket_key.clone(),
            Bucket {
                steps: bucket.steps,
                offset: 0,
                buffer: bucket.steps,
            },
        );
        match self.write_table(store, table_key, &table) {
            Ok(()) => self.log.append_best_effort(
                store,
                log_entry(
                    now,
                    LogLevel::Info,
                    format!("folded {} steps into buffer under {bucket_key}", bucket.steps),
                ),
            ),
            Err(err) => self.log.append_best_effort(
                store,
                log_entry(
                    now,
                    LogLevel::Error,
                    format!("shutdown fold failed under {bucket_key}: {err}"),
                ),
            ),
        }
    }

    /// Reads the last persisted daily count for fallback reporting.
    fn last_daily_steps<S: StepStore + ?Sized>(&self, store: &S, now: OffsetDateTime) -> i64 {
        self.today_total(store, now).map_or(0, |steps| steps.max(0))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Rounds a raw sensor value to the nearest whole reading.
///
/// Rejects negative, non-finite, and out-of-range values.
fn round_raw(raw_value: f64) -> Option<i64> {
    if !raw_value.is_finite() || raw_value < 0.0 {
        return None;
    }
    let rounded = raw_value.round();
    #[allow(
        clippy::cast_precision_loss,
        reason = "MAX_RAW_READING is a power of two exactly representable as f64"
    )]
    if rounded > MAX_RAW_READING as f64 {
        return None;
    }
    #[allow(
        clippy::cast_possible_truncation,
        reason = "value is finite, non-negative, and range-checked above"
    )]
    Some(rounded as i64)
}

/// Builds an engine log entry at the supplied moment.
fn log_entry(now: OffsetDateTime, level: LogLevel, message: String) -> LogEntry {
    LogEntry::at(now, level, TAG, message)
}
