//! Motion units
//!
//! Conversion between physical units (mm, mm/s) and driver units
//! (steps, steps/s), and the fixed jog increments offered to the operator.
//! The driver module does its own trajectory generation; the controller only
//! issues a target position and a constant speed.

pub mod jog;
pub mod units;

pub use jog::{jog_speed, JogDirection, JogStep};
pub use units::{ConversionError, StepConversion};
