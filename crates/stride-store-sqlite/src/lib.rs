// crates/stride-store-sqlite/src/lib.rs
// ============================================================================
// Module: Stride SQLite Store Crate Root
// Description: Durable, process-shared step store backed by SQLite.
// Purpose: Re-export the store, its configuration, and its error type.
// Dependencies: stride-core, rusqlite, serde, thiserror
// ============================================================================

//! ## Overview
//! SQLite-backed implementation of the [`stride_core::StepStore`] contract.
//! WAL journal mode plus `synchronous = FULL` provide the blocking,
//! immediately-durable, multi-process-visible writes the reconciliation
//! engine requires.

// ============================================================================
// SECTION: Modules
// ============================================================================

/// SQLite store implementation.
pub mod store;

// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use crate::store::SqliteJournalMode;
pub use crate::store::SqliteStepStore;
pub use crate::store::SqliteStoreConfig;
pub use crate::store::SqliteStoreError;
pub use crate::store::SqliteSyncMode;
