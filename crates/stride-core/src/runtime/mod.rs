// crates/stride-core/src/runtime/mod.rs
// ============================================================================
// Module: Stride Runtime
// Description: Reconciliation engine and service lifecycle.
// Purpose: Group the stateless operational logic layered over the core model.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! The runtime layer drives the persisted model: the engine reconciles raw
//! readings into monotonic bucket totals, and the lifecycle guards the
//! engine's entry points behind explicit start/stop transitions.

/// Reconciliation engine.
pub mod engine;
/// Service start/stop state machine.
pub mod lifecycle;
