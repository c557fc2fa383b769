//! Axis state machine definition
//!
//! Homing establishes the absolute reference; only a homed axis accepts
//! position commands. Any fault latches the axis until an explicit reset.

use super::events::Event;
use crate::safety::SafetyStatus;

/// Axis states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AxisState {
    /// Position unknown, not moving
    #[default]
    Idle,
    /// Homing sequence in progress
    Homing,
    /// Reference established, at rest
    Homed,
    /// Executing an absolute move
    Moving,
    /// Emergency stop issued; outputs disabled until reset
    Fault(FaultKind),
}

/// Reasons the axis was faulted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FaultKind {
    /// Current draw above the configured maximum
    Overcurrent,
    /// Driver temperature above the configured ceiling
    OverTemperature,
    /// Homing did not complete inside the timeout
    HomingTimeout,
    /// Driver set its error bit
    DriverError,
    /// Driver reported its travel limit during a move
    DriverLimit,
    /// Telemetry polls failed too many times in a row
    LinkLost,
    /// Interlock was not `Ok` when sampled
    Interlock(SafetyStatus),
    /// Emergency stop requested by the operator
    Operator,
}

impl FaultKind {
    /// Interlock status latched when this fault is escalated
    pub fn interlock_status(self) -> SafetyStatus {
        match self {
            FaultKind::Interlock(status) => status,
            FaultKind::DriverLimit => SafetyStatus::SoftLimit,
            _ => SafetyStatus::EmergencyStop,
        }
    }
}

impl AxisState {
    /// Check if position commands are accepted
    pub fn accepts_moves(&self) -> bool {
        matches!(self, AxisState::Homed | AxisState::Moving)
    }

    /// Check if this is a fault state
    pub fn is_fault(&self) -> bool {
        matches!(self, AxisState::Fault(_))
    }

    /// Fault cause, if faulted
    pub fn fault(&self) -> Option<FaultKind> {
        match self {
            AxisState::Fault(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Process an event and return the next state
    pub fn transition(self, event: Event) -> Self {
        use AxisState::*;
        use Event::*;

        match (self, event) {
            // Fault is sticky; the first cause is kept
            (Fault(_), Reset) => Idle,
            (Fault(_), _) => self,
            (_, FaultDetected(kind)) => Fault(kind),

            // Homing can be restarted from any healthy state
            (_, HomeRequested) => Homing,
            (Homing, HomeComplete) => Homed,
            (Homing, StopRequested) => Idle,

            // Moves
            (Homed | Moving, MoveRequested) => Moving,
            (Moving, MotionComplete) => Homed,
            (Moving, StopRequested) => Homed,

            // Default: stay in current state
            _ => self,
        }
    }
}
