//! Events that trigger axis state transitions

use super::machine::FaultKind;

/// Events that can trigger state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    // Operator commands
    /// Homing sequence requested
    HomeRequested,
    /// Absolute move requested
    MoveRequested,
    /// Controlled stop requested
    StopRequested,

    // Driver telemetry
    /// Driver reported the homed bit
    HomeComplete,
    /// Driver reported the moving bit cleared after a move
    MotionComplete,

    // Safety
    /// A fault forced an emergency stop
    FaultDetected(FaultKind),
    /// Operator reset after the interlock cleared
    Reset,
}
