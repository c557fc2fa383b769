//! Motor state shared between the motion API and the control loop
//!
//! The motion API updates the target, speed and motion flags optimistically
//! when it accepts a command. The control loop owns everything that comes
//! from telemetry and reconciles the optimistic view once the driver reports
//! a terminal state.

use traverse_protocol::{StatusBits, Telemetry};

use super::events::Event;
use super::machine::{AxisState, FaultKind};
use crate::config::AxisConfig;

/// Snapshot of the axis as last known to the controller
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotorState {
    /// Position in mm (snapped to target when the driver stops)
    pub current_position_mm: f32,
    /// Last accepted target in mm
    pub target_position_mm: f32,
    /// Cruise speed in mm/s
    pub speed_mm_s: f32,
    /// Last reported current draw in mA
    pub current_ma: u16,
    /// Last reported driver temperature in °C
    pub temperature_c: u8,
    /// Last reported driver status bits
    pub status: StatusBits,
    /// Reference established since boot or last reset
    pub is_homed: bool,
    /// Axis believed to be in motion
    pub is_moving: bool,
    /// Overcurrent threshold in mA
    pub max_current_ma: u16,
    /// Uptime (ms) after which an unfinished homing is a fault
    pub homing_deadline_ms: Option<u64>,
    /// Axis state machine
    pub axis: AxisState,
    /// Motion commands accepted but not yet put on the wire
    pub queued_motion: u8,
    /// Bumped on halt and reset; queued commands from an older epoch are stale
    pub epoch: u8,
}

impl MotorState {
    /// Power-on state: unhomed, at rest, position zero
    pub fn new(config: &AxisConfig) -> Self {
        Self {
            current_position_mm: 0.0,
            target_position_mm: 0.0,
            speed_mm_s: config.default_speed_mm_s,
            current_ma: 0,
            temperature_c: 0,
            status: StatusBits::empty(),
            is_homed: false,
            is_moving: false,
            max_current_ma: config.max_current_ma,
            homing_deadline_ms: None,
            axis: AxisState::Idle,
            queued_motion: 0,
            epoch: 0,
        }
    }

    /// Feed an event to the axis state machine
    pub fn apply(&mut self, event: Event) -> AxisState {
        self.axis = self.axis.transition(event);
        self.axis
    }

    /// Optimistic update for an accepted absolute move
    pub fn begin_move(&mut self, target_mm: f32, speed_mm_s: f32) {
        self.target_position_mm = target_mm;
        self.speed_mm_s = speed_mm_s;
        self.is_moving = true;
        self.apply(Event::MoveRequested);
    }

    /// Optimistic update for an accepted homing request
    pub fn begin_homing(&mut self, now_ms: u64, timeout_ms: u32) {
        self.is_moving = true;
        self.is_homed = false;
        self.homing_deadline_ms = Some(now_ms + timeout_ms as u64);
        self.apply(Event::HomeRequested);
    }

    /// Optimistic update for an accepted stop
    pub fn begin_stop(&mut self) {
        self.is_moving = false;
        if self.axis == AxisState::Homing {
            self.homing_deadline_ms = None;
        }
        self.apply(Event::StopRequested);
    }

    /// Count a motion command about to enter the queue
    ///
    /// Reserved before the enqueue so the control loop can never dequeue
    /// a command it has not been told about.
    pub fn reserve_motion(&mut self) {
        self.queued_motion = self.queued_motion.saturating_add(1);
    }

    /// A reserved motion command left the queue or never entered it
    pub fn motion_dispatched(&mut self) {
        self.queued_motion = self.queued_motion.saturating_sub(1);
    }

    /// A move never reached the driver; fall back to where the axis is
    ///
    /// Ignored while later motion is still queued, since the target
    /// already belongs to that command.
    pub fn abandon_move(&mut self) {
        if self.queued_motion > 0 || self.axis != AxisState::Moving {
            return;
        }
        self.target_position_mm = self.current_position_mm;
        self.is_moving = false;
        self.apply(Event::StopRequested);
    }

    /// Fold a telemetry record into the state
    ///
    /// The driver reports terminal state only, never continuous position:
    /// once it stops moving the position is snapped to the target. Motion
    /// bits are ignored while accepted motion commands are still queued,
    /// since they describe the previous command.
    pub fn reconcile(&mut self, telemetry: &Telemetry) {
        self.current_ma = telemetry.current_ma;
        self.temperature_c = telemetry.temperature_c;
        self.status = telemetry.status;

        if self.queued_motion > 0 {
            return;
        }

        self.is_moving = telemetry.status.is_moving();

        if self.axis.is_fault() {
            return;
        }

        if telemetry.status.is_homed() && self.axis == AxisState::Homing {
            self.is_homed = true;
            self.homing_deadline_ms = None;
            self.current_position_mm = 0.0;
            self.target_position_mm = 0.0;
            self.apply(Event::HomeComplete);
        }

        if !self.is_moving && self.axis != AxisState::Homing {
            self.current_position_mm = self.target_position_mm;
            self.apply(Event::MotionComplete);
        }
    }

    /// Check whether a homing sequence has overrun its deadline
    pub fn homing_overdue(&self, now_ms: u64) -> bool {
        self.axis == AxisState::Homing
            && !self.is_homed
            && self.homing_deadline_ms.is_some_and(|deadline| now_ms > deadline)
    }

    /// Emergency stop: nothing queued survives, nothing is moving
    pub fn halt(&mut self, kind: FaultKind) {
        self.is_moving = false;
        self.queued_motion = 0;
        self.epoch = self.epoch.wrapping_add(1);
        self.homing_deadline_ms = None;
        self.apply(Event::FaultDetected(kind));
    }

    /// Leave the fault state after the interlock has been reset
    ///
    /// The reference is lost; the axis must be homed again. Commands queued
    /// before the reset belong to the old epoch.
    pub fn reset(&mut self) -> bool {
        if !self.axis.is_fault() {
            return false;
        }
        self.is_homed = false;
        self.is_moving = false;
        self.queued_motion = 0;
        self.epoch = self.epoch.wrapping_add(1);
        self.homing_deadline_ms = None;
        self.apply(Event::Reset);
        true
    }
}
