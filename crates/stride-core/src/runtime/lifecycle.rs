// crates/stride-core/src/runtime/lifecycle.rs
// ============================================================================
// Module: Stride Service Lifecycle
// Description: Explicit start/stop state machine for the hosting service.
// Purpose: Guard engine entry points behind idempotent, state-checked
//          transitions and surface missing sensor capability at the boundary.
// Dependencies: crate::core, crate::interfaces, crate::runtime::engine,
//               thiserror, time
// ============================================================================

//! ## Overview
//! The hosting service owns one [`ServiceLifecycle`] value. Start and stop
//! are state transitions guarded by the current state rather than a global
//! boolean: `start` moves `Stopped -> Starting` after the sensor capability
//! check, `sensor_attached` confirms `Starting -> Running`, and `stop` is
//! idempotent from any state. Sensor readings are only reconciled while
//! `Running`; readings delivered in any other state are reported as ignored
//! so hosts never crash on late or early events.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;
use time::OffsetDateTime;

use crate::interfaces::StepStore;
use crate::runtime::engine::ReconcileEngine;
use crate::runtime::engine::SensorReport;

// ============================================================================
// SECTION: Service State
// ============================================================================

/// Service lifecycle state.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// Service is not running; readings are ignored.
    Stopped,
    /// Start accepted; sensor attachment pending.
    Starting,
    /// Service is running; readings are reconciled.
    Running,
}

/// Outcome of a start request.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// Transitioned `Stopped -> Starting`.
    Accepted,
    /// Service was already starting or running; no transition occurred.
    AlreadyActive,
}

/// Outcome of a stop request.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Transitioned to `Stopped`.
    Stopped,
    /// Service was already stopped; no transition occurred.
    AlreadyStopped,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Lifecycle errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Platform reports no step sensor; surfaced once at the boundary, not
    /// retried.
    #[error("step sensor unavailable on this device")]
    SensorUnavailable,
    /// Transition attempted from an incompatible state.
    #[error("invalid lifecycle transition from {state:?}")]
    InvalidTransition {
        /// State the service was in when the transition was attempted.
        state: ServiceState,
    },
}

// ============================================================================
// SECTION: Lifecycle
// ============================================================================

/// Idempotent start/stop state machine wrapping the reconciliation engine.
///
/// # Invariants
/// - Engine entry points run only in [`ServiceState::Running`].
#[derive(Debug, Clone, Copy)]
pub struct ServiceLifecycle {
    /// Current lifecycle state.
    state: ServiceState,
    /// Engine invoked for readings and shutdown while running.
    engine: ReconcileEngine,
}

impl Default for ServiceLifecycle {
    fn default() -> Self {
        Self::new(ReconcileEngine::default())
    }
}

impl ServiceLifecycle {
    /// Creates a stopped lifecycle around the given engine.
    #[must_use]
    pub const fn new(engine: ReconcileEngine) -> Self {
        Self {
            state: ServiceState::Stopped,
            engine,
        }
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ServiceState {
        self.state
    }

    /// Requests a start.
    ///
    /// Idempotent: a start while starting or running reports
    /// [`StartOutcome::AlreadyActive`] without transitioning.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::SensorUnavailable`] when the platform has no
    /// step sensor; the service stays stopped.
    pub fn start(&mut self, sensor_available: bool) -> Result<StartOutcome, LifecycleError> {
        match self.state {
            ServiceState::Stopped => {
                if !sensor_available {
                    return Err(LifecycleError::SensorUnavailable);
                }
                self.state = ServiceState::Starting;
                Ok(StartOutcome::Accepted)
            }
            ServiceState::Starting | ServiceState::Running => Ok(StartOutcome::AlreadyActive),
        }
    }

    /// Confirms sensor attachment, completing `Starting -> Running`.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] unless the service is
    /// `Starting`.
    pub fn sensor_attached(&mut self) -> Result<(), LifecycleError> {
        match self.state {
            ServiceState::Starting => {
                self.state = ServiceState::Running;
                Ok(())
            }
            state => Err(LifecycleError::InvalidTransition {
                state,
            }),
        }
    }

    /// Requests a stop. Idempotent from any state.
    pub fn stop(&mut self) -> StopOutcome {
        match self.state {
            ServiceState::Stopped => StopOutcome::AlreadyStopped,
            ServiceState::Starting | ServiceState::Running => {
                self.state = ServiceState::Stopped;
                StopOutcome::Stopped
            }
        }
    }

    /// Delivers one sensor reading to the engine while running.
    ///
    /// Returns `None` when the service is not running and the reading was
    /// ignored.
    pub fn handle_reading<S: StepStore + ?Sized>(
        &self,
        store: &S,
        raw_value: f64,
        now: OffsetDateTime,
    ) -> Option<SensorReport> {
        match self.state {
            ServiceState::Running => Some(self.engine.on_sensor_reading(store, raw_value, now)),
            ServiceState::Stopped | ServiceState::Starting => None,
        }
    }

    /// Handles an imminent power-off signal: folds open buckets, then stops.
    ///
    /// Best-effort by contract; never propagates an error past the caller.
    pub fn handle_shutdown<S: StepStore + ?Sized>(
        &mut self,
        store: &S,
        now: OffsetDateTime,
    ) -> StopOutcome {
        self.engine.on_shutdown(store, now);
        self.stop()
    }
}
