//! Axis state
//!
//! The motor state shared between the motion API and the control loop, and
//! the explicit, finite state machine that governs which commands the axis
//! accepts.

pub mod events;
pub mod machine;
pub mod motor;

pub use events::Event;
pub use machine::{AxisState, FaultKind};
pub use motor::MotorState;
