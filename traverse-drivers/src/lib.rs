//! Runtime pieces of the stage controller
//!
//! This crate turns the board-agnostic logic in `traverse-core` into the
//! concurrent system that runs on the controller:
//!
//! - [`servo::SerialChannel`]: exclusive, timeout-bounded link to the driver module
//! - [`servo::CommandQueue`]: bounded FIFO between callers and the control loop
//! - [`safety::SafetyMonitor`]: interrupt-fed interlock for the physical inputs
//! - [`servo::Servo`]: the motion API
//! - [`servo::ControlLoop`]: the periodic poll, reconcile and escalate task
//!
//! Everything is generic over an `embassy_sync` raw mutex and an
//! `embedded-io-async` link so it runs unchanged on the host for tests.

#![no_std]
#![deny(unsafe_code)]

// Must come first so the logging macros are visible to the other modules
mod fmt;

pub mod error;
pub mod safety;
pub mod servo;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Error, Result};
