//! Commands sent from the controller to the driver module
//!
//! A [`Command`] is the typed form of a request frame. It is built by the
//! motion API, held in the command queue, and encoded exactly once when the
//! control loop puts it on the wire.

use crate::frame::{Frame, FrameError, Opcode};

/// Commands from controller to driver module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Request a 4-byte telemetry record
    GetStatus,
    /// Move to an absolute position
    SetPosition {
        /// Target position in driver steps
        steps: u32,
        /// Cruise speed in steps per second
        speed: u16,
    },
    /// Controlled stop
    Stop,
    /// Run the homing sequence
    Home,
    /// Change the cruise speed
    SetSpeed {
        /// Speed in steps per second
        speed: u16,
    },
    /// Immediate stop
    EmergencyStop,
}

impl Command {
    /// Opcode used on the wire for this command
    pub const fn opcode(&self) -> Opcode {
        match self {
            Command::GetStatus => Opcode::GetStatus,
            Command::SetPosition { .. } => Opcode::SetPosition,
            Command::Stop => Opcode::Stop,
            Command::Home => Opcode::Home,
            Command::SetSpeed { .. } => Opcode::SetSpeed,
            Command::EmergencyStop => Opcode::EmergencyStop,
        }
    }

    /// Convert this command to a frame
    pub fn to_frame(&self) -> Frame {
        let mut frame = Frame::empty(self.opcode());
        match *self {
            Command::SetPosition { steps, speed } => {
                put(&mut frame, &steps.to_be_bytes());
                put(&mut frame, &speed.to_be_bytes());
            }
            Command::SetSpeed { speed } => put(&mut frame, &speed.to_be_bytes()),
            _ => {}
        }
        frame
    }

    /// Parse a command from a frame
    pub fn from_frame(frame: &Frame) -> Result<Self, FrameError> {
        let p = frame.payload.as_slice();
        if p.len() != frame.opcode.payload_len() {
            return Err(FrameError::PayloadLengthMismatch);
        }

        Ok(match frame.opcode {
            Opcode::GetStatus => Command::GetStatus,
            Opcode::SetPosition => Command::SetPosition {
                steps: u32::from_be_bytes([p[0], p[1], p[2], p[3]]),
                speed: u16::from_be_bytes([p[4], p[5]]),
            },
            Opcode::Stop => Command::Stop,
            Opcode::Home => Command::Home,
            Opcode::SetSpeed => Command::SetSpeed {
                speed: u16::from_be_bytes([p[0], p[1]]),
            },
            Opcode::EmergencyStop => Command::EmergencyStop,
        })
    }

    /// Whether this command starts axis motion
    pub const fn starts_motion(&self) -> bool {
        matches!(self, Command::SetPosition { .. } | Command::Home)
    }
}

/// Append payload bytes; the largest payload (6 bytes) fits MAX_PAYLOAD_SIZE
fn put(frame: &mut Frame, bytes: &[u8]) {
    for &b in bytes {
        let _ = frame.payload.push(b);
    }
}
