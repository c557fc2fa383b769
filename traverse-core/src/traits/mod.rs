//! Hardware abstraction traits
//!
//! These traits define the interface between the motion logic and the
//! board-specific safety inputs.

pub mod interlock;

pub use interlock::Interlock;
