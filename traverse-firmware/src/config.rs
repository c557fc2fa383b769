//! Build-time axis configuration
//!
//! `build.rs` validates axis.toml and writes it out as a constant, so an
//! invalid configuration never reaches the target.

use traverse_core::config::AxisConfig;

include!(concat!(env!("OUT_DIR"), "/axis_config.rs"));
