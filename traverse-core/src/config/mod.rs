//! Configuration types
//!
//! Board-agnostic axis configuration, validated once at build time and
//! again at startup.

pub mod axis;

pub use axis::*;
