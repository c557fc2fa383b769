//! Axis configuration
//!
//! Mechanical, electrical and timing parameters for the lead-screw axis.
//! The defaults describe a 1.8° motor at 16x microstepping on a T8 screw
//! with 2 mm pitch and 200 mm of travel.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::motion::StepConversion;
use crate::safety::SoftLimits;

/// Capacity of the command queue between the motion API and the control loop
pub const COMMAND_QUEUE_SIZE: usize = 10;

/// Fixed response buffer size for serial reads
pub const RESPONSE_BUFFER_SIZE: usize = 256;

/// Configuration validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Steps, microsteps or pitch cannot produce a usable steps/mm
    InvalidMechanics,
    /// Travel range is empty, negative or not representable in steps
    InvalidTravel,
    /// A period or timeout is zero
    InvalidTiming,
    /// A configured speed cannot be expressed in the 16-bit speed field
    SpeedOutOfRange,
    /// A protection threshold is zero
    InvalidLimit,
}

/// Axis configuration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AxisConfig {
    /// Full steps per motor rotation (200 for 1.8° motors)
    pub steps_per_rev: u16,
    /// Microstepping factor
    pub microsteps: u16,
    /// Lead screw pitch in mm per revolution
    pub screw_pitch_mm: f32,
    /// Lower soft travel limit in mm
    pub travel_min_mm: f32,
    /// Upper soft travel limit in mm
    pub travel_max_mm: f32,
    /// Current draw above which the axis is faulted (mA)
    pub max_current_ma: u16,
    /// Driver temperature above which the axis is faulted (°C)
    pub max_temperature_c: u8,
    /// Time allowed for the homing sequence (ms)
    pub homing_timeout_ms: u32,
    /// Control loop period (ms)
    pub control_period_ms: u32,
    /// Serial lock and read timeout (ms)
    pub response_timeout_ms: u32,
    /// Time an enqueue may wait on a full command queue (ms)
    pub queue_timeout_ms: u32,
    /// Consecutive failed telemetry polls before the link is declared lost
    pub max_missed_polls: u8,
    /// Speed used until the operator sets one (mm/s)
    pub default_speed_mm_s: f32,
    /// Speed of a 100% jog (mm/s)
    pub max_jog_speed_mm_s: f32,
}

impl Default for AxisConfig {
    fn default() -> Self {
        Self {
            steps_per_rev: 200,
            microsteps: 16,
            screw_pitch_mm: 2.0,
            travel_min_mm: 0.0,
            travel_max_mm: 200.0,
            max_current_ma: 2000,
            max_temperature_c: 70,
            homing_timeout_ms: 30_000,
            control_period_ms: 10,
            response_timeout_ms: 100,
            queue_timeout_ms: 100,
            max_missed_polls: 10,
            default_speed_mm_s: 1.0,
            max_jog_speed_mm_s: 10.0,
        }
    }
}

impl AxisConfig {
    /// Driver steps per millimetre of travel
    pub fn steps_per_mm(&self) -> f32 {
        (self.steps_per_rev as f32 * self.microsteps as f32) / self.screw_pitch_mm
    }

    /// Conversion between physical units and driver units
    pub fn units(&self) -> StepConversion {
        StepConversion::new(self.steps_per_mm())
    }

    /// Soft travel limits
    pub fn soft_limits(&self) -> SoftLimits {
        SoftLimits::new(self.travel_min_mm, self.travel_max_mm)
    }

    /// Check the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.steps_per_rev == 0
            || !self.microsteps.is_power_of_two()
            || self.microsteps > 256
            || !(self.screw_pitch_mm.is_finite() && self.screw_pitch_mm > 0.0)
        {
            return Err(ConfigError::InvalidMechanics);
        }

        let units = self.units();

        if !self.travel_min_mm.is_finite()
            || !self.travel_max_mm.is_finite()
            || self.travel_min_mm < 0.0
            || self.travel_min_mm >= self.travel_max_mm
            || units.position_to_steps(self.travel_max_mm).is_err()
        {
            return Err(ConfigError::InvalidTravel);
        }

        if self.homing_timeout_ms == 0
            || self.control_period_ms == 0
            || self.response_timeout_ms == 0
            || self.queue_timeout_ms == 0
        {
            return Err(ConfigError::InvalidTiming);
        }

        if units.speed_to_steps(self.default_speed_mm_s).is_err()
            || units.speed_to_steps(self.max_jog_speed_mm_s).is_err()
        {
            return Err(ConfigError::SpeedOutOfRange);
        }

        if self.max_current_ma == 0 || self.max_temperature_c == 0 || self.max_missed_polls == 0 {
            return Err(ConfigError::InvalidLimit);
        }

        Ok(())
    }
}
