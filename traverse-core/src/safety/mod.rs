//! Safety types
//!
//! The interlock status shared by every part of the system, the soft
//! travel limits, and the rules that turn driver telemetry into faults.

pub mod limits;
pub mod monitor;
pub mod status;

pub use limits::SoftLimits;
pub use monitor::FaultMonitor;
pub use status::{ResetBlocked, SafetyStatus};
