//! Safety interlock implementation

pub mod monitor;

pub use monitor::{SafetyLine, SafetyMonitor};
