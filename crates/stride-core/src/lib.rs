// crates/stride-core/src/lib.rs
// ============================================================================
// Module: Stride Core Crate Root
// Description: Step reconciliation core: model, engine, lifecycle, store seam.
// Purpose: Re-export the public surface used by stores, config, and hosts.
// Dependencies: serde, serde_json, thiserror, time
// ============================================================================

//! ## Overview
//! `stride-core` turns an unreliable, reset-prone raw step counter into
//! durable, monotonic day/hour/lifetime totals. The raw counter resets to
//! zero on reboot or driver restart; readings arrive from a process that may
//! be killed at any time; and a second process reads the same persisted
//! store concurrently. The engine reconciles each reading against persisted
//! per-bucket `offset`/`buffer` state so that reported step counts never
//! decrease, at the cost of a small, bounded over-count when an anomaly is
//! repaired.
//!
//! The crate is backend-agnostic: all persistence flows through the
//! [`StepStore`] trait, whose `set` must block until durable. Data flows one
//! way (raw reading, engine, codec, store) and queries read back without
//! touching the engine's write path.

// ============================================================================
// SECTION: Modules
// ============================================================================

/// Persisted data model, codec, keys, and debug log.
pub mod core;
/// Step store contract and in-memory reference implementation.
pub mod interfaces;
/// Reconciliation engine and service lifecycle.
pub mod runtime;

// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use crate::core::bucket::Bucket;
pub use crate::core::bucket::BucketKey;
pub use crate::core::bucket::BucketTable;
pub use crate::core::codec::CodecError;
pub use crate::core::codec::DecodedTable;
pub use crate::core::codec::decode_entry;
pub use crate::core::codec::decode_table;
pub use crate::core::codec::encode_table;
pub use crate::core::keys::DAY_TABLE_KEY;
pub use crate::core::keys::DEBUG_LOG_KEY;
pub use crate::core::keys::Granularity;
pub use crate::core::keys::HISTORY_TABLE_KEY;
pub use crate::core::keys::TOTAL_COUNT_KEY;
pub use crate::core::log::DebugLog;
pub use crate::core::log::LogEntry;
pub use crate::core::log::LogLevel;
pub use crate::core::log::MAX_LOG_ENTRIES;
pub use crate::interfaces::MemoryStore;
pub use crate::interfaces::StepStore;
pub use crate::interfaces::StoreError;
pub use crate::runtime::engine::CommitStatus;
pub use crate::runtime::engine::EngineError;
pub use crate::runtime::engine::ReadingStatus;
pub use crate::runtime::engine::ReconcileEngine;
pub use crate::runtime::engine::Reconciliation;
pub use crate::runtime::engine::SensorReport;
pub use crate::runtime::lifecycle::LifecycleError;
pub use crate::runtime::lifecycle::ServiceLifecycle;
pub use crate::runtime::lifecycle::ServiceState;
pub use crate::runtime::lifecycle::StartOutcome;
pub use crate::runtime::lifecycle::StopOutcome;
