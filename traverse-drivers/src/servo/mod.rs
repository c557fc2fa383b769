//! Motion control over the driver module link
//!
//! [`Servo`] is the motion API shared by every caller. [`ControlLoop`] is
//! the single periodic task that owns the driver module conversation: it
//! forwards queued commands, polls telemetry and escalates faults.

pub mod api;
pub mod control;
pub mod link;
pub mod queue;

pub use api::Servo;
pub use control::ControlLoop;
pub use link::SerialChannel;
pub use queue::{CommandQueue, Queued};
