//! Stepper-driver module serial protocol
//!
//! This crate defines the request/response protocol spoken between the
//! motion controller and the closed-loop stepper driver module over an
//! exclusive half-duplex UART.
//!
//! # Protocol Overview
//!
//! Requests use a fixed header followed by an opcode and an opcode-specific
//! payload:
//! ```text
//! ┌──────┬──────┬────────┬─────────────┐
//! │ 0xAA │ 0x55 │ OPCODE │ PAYLOAD     │
//! │ 1B   │ 1B   │ 1B     │ 0–8B        │
//! └──────┴──────┴────────┴─────────────┘
//! ```
//!
//! There is no length or checksum field; the receiver knows the payload
//! length from the opcode. Multi-byte fields are big-endian.
//!
//! The only request with a reply is `GetStatus`, answered by a bare 4-byte
//! telemetry record (see [`telemetry`]).

#![no_std]
#![deny(unsafe_code)]

pub mod frame;
pub mod messages;
pub mod telemetry;

pub use frame::{Frame, FrameError, FrameParser, Opcode, FRAME_HEADER, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE};
pub use messages::Command;
pub use telemetry::{StatusBits, Telemetry, TELEMETRY_LEN};
