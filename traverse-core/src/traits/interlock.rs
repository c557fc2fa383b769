//! Safety interlock trait

use crate::safety::{ResetBlocked, SafetyStatus};

/// Shared safety interlock
///
/// One instance is shared by the input watchers, the motion API and the
/// control loop, so every method takes `&self`. Only [`Interlock::latch`]
/// (and [`Interlock::emergency_stop`], which forwards to it) must be safe
/// to call from interrupt context. The other methods may take locks and
/// sample inputs, so they belong to task context.
pub trait Interlock {
    /// Current interlock status, sampling any polled inputs
    ///
    /// Task context only.
    fn status(&self) -> SafetyStatus;

    /// Raise the status to at least `status`
    ///
    /// Never lowers the status; only [`Interlock::reset_error`] does.
    fn latch(&self, status: SafetyStatus);

    /// Latch an emergency stop
    fn emergency_stop(&self) {
        self.latch(SafetyStatus::EmergencyStop);
    }

    /// Check whether a target lies inside the soft travel limits
    fn is_position_valid(&self, position_mm: f32) -> bool;

    /// Return to `Ok` if no physical input is still asserted
    fn reset_error(&self) -> Result<(), ResetBlocked>;

    /// Check if motion is permitted
    fn is_ok(&self) -> bool {
        self.status().is_ok()
    }
}
