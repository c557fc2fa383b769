//! Fault rules applied to driver telemetry
//!
//! Decides when the control loop must escalate: driver error and limit
//! bits, current and temperature ceilings, the homing deadline, and the
//! health of the telemetry link.

use crate::config::AxisConfig;
use crate::state::{AxisState, FaultKind, MotorState};

/// Fault detection for the control loop
///
/// Holds the thresholds and the consecutive missed-poll counter. The
/// overcurrent ceiling lives in [`MotorState`] so it travels with the
/// readings it is compared against.
#[derive(Debug, Clone)]
pub struct FaultMonitor {
    /// Temperature ceiling in °C
    max_temperature_c: u8,
    /// Consecutive misses that declare the link lost
    max_missed_polls: u8,
    /// Consecutive telemetry polls that failed
    missed_polls: u8,
}

impl FaultMonitor {
    /// Create a fault monitor from the axis configuration
    pub fn new(config: &AxisConfig) -> Self {
        Self {
            max_temperature_c: config.max_temperature_c,
            max_missed_polls: config.max_missed_polls,
            missed_polls: 0,
        }
    }

    /// Record a telemetry poll that produced a valid record
    pub fn poll_succeeded(&mut self) {
        self.missed_polls = 0;
    }

    /// Record a telemetry poll that failed
    ///
    /// Returns `LinkLost` exactly once, on the miss that reaches the
    /// threshold. Further misses keep counting without repeating it.
    pub fn poll_failed(&mut self) -> Option<FaultKind> {
        self.missed_polls = self.missed_polls.saturating_add(1);

        if self.missed_polls == self.max_missed_polls {
            return Some(FaultKind::LinkLost);
        }
        None
    }

    /// Consecutive failed polls so far
    pub fn missed_polls(&self) -> u8 {
        self.missed_polls
    }

    /// Check whether the link is currently considered healthy
    pub fn is_link_healthy(&self) -> bool {
        self.missed_polls < self.max_missed_polls
    }

    /// Check reconciled state for a fault
    ///
    /// Returns the first fault detected. An axis that is already faulted
    /// never produces another one.
    pub fn check(&self, state: &MotorState, now_ms: u64) -> Option<FaultKind> {
        if state.axis.is_fault() {
            return None;
        }

        if state.status.has_error() {
            return Some(FaultKind::DriverError);
        }

        if state.status.limit_hit() && state.axis == AxisState::Moving {
            return Some(FaultKind::DriverLimit);
        }

        if state.current_ma > state.max_current_ma {
            return Some(FaultKind::Overcurrent);
        }

        if state.temperature_c > self.max_temperature_c {
            return Some(FaultKind::OverTemperature);
        }

        // Independent of the moving bit: a driver that stalls silently
        // during homing still times out.
        if state.homing_overdue(now_ms) {
            return Some(FaultKind::HomingTimeout);
        }

        None
    }
}
