// crates/stride-core/src/core/mod.rs
// ============================================================================
// Module: Stride Core Model
// Description: Persisted data model, codec, keys, and debug log ring.
// Purpose: Group the wire-stable building blocks of the step ledger.
// Dependencies: serde, serde_json, thiserror, time
// ============================================================================

//! ## Overview
//! The core model owns everything with a persisted representation: bucket
//! records and tables, their JSON codec, the fixed store key names, and the
//! bounded debug log. The reconciliation logic lives in [`crate::runtime`].

/// Bucket records and tables.
pub mod bucket;
/// Bucket table JSON codec.
pub mod codec;
/// Granularities, date-key derivation, and store key names.
pub mod keys;
/// Bounded FIFO debug log.
pub mod log;
