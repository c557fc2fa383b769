//! Embassy async tasks
//!
//! Each task receives the shared objects by `&'static` reference at spawn.

pub mod control;
pub mod safety;

pub use control::control_task;
pub use safety::{estop_watch_task, limit_watch_task};
