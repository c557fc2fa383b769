//! Board-agnostic core logic for the single-axis stage firmware
//!
//! This crate contains all application logic that does not depend on
//! specific hardware or on an async runtime:
//!
//! - Axis configuration and validation
//! - Unit conversion between millimetres and driver steps
//! - Motor state and the axis state machine
//! - Safety status, soft travel limits and fault rules
//! - The interlock trait the motion layer consults before acting

#![no_std]
#![deny(unsafe_code)]

pub mod config;
pub mod motion;
pub mod safety;
pub mod state;
pub mod traits;
