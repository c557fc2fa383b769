//! Frame encoding and decoding for the driver module protocol.
//!
//! Frame format:
//! - HEADER (2 bytes): 0xAA 0x55 synchronization pattern
//! - OPCODE (1 byte): command identifier
//! - PAYLOAD (0-8 bytes): opcode-specific data, length implied by the opcode

use heapless::Vec;

/// Frame synchronization header
pub const FRAME_HEADER: [u8; 2] = [0xAA, 0x55];

/// Maximum payload size in bytes
pub const MAX_PAYLOAD_SIZE: usize = 8;

/// Maximum complete frame size (HEADER + OPCODE + MAX_PAYLOAD)
pub const MAX_FRAME_SIZE: usize = FRAME_HEADER.len() + 1 + MAX_PAYLOAD_SIZE;

/// Errors that can occur during frame parsing or encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Payload length does not match what the opcode requires
    PayloadLengthMismatch,
    /// Opcode byte is not part of the protocol
    UnknownOpcode(u8),
    /// Buffer too small for encoding
    BufferTooSmall,
    /// Response has the wrong number of bytes
    InvalidLength,
}

/// Command opcodes understood by the driver module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Opcode {
    /// Request a telemetry record
    GetStatus = 0x90,
    /// Absolute move: steps (u32) + speed (u16)
    SetPosition = 0x91,
    /// Controlled stop
    Stop = 0x92,
    /// Run the homing sequence
    Home = 0x93,
    /// Change cruise speed: speed (u16)
    SetSpeed = 0x94,
    /// Immediate stop, driver disables output
    EmergencyStop = 0x95,
}

impl Opcode {
    /// Payload length carried by this opcode
    pub const fn payload_len(self) -> usize {
        match self {
            Opcode::SetPosition => 6,
            Opcode::SetSpeed => 2,
            Opcode::GetStatus | Opcode::Stop | Opcode::Home | Opcode::EmergencyStop => 0,
        }
    }

    /// Length of a complete frame for this opcode
    pub const fn frame_len(self) -> usize {
        FRAME_HEADER.len() + 1 + self.payload_len()
    }
}

impl TryFrom<u8> for Opcode {
    type Error = FrameError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0x90 => Ok(Opcode::GetStatus),
            0x91 => Ok(Opcode::SetPosition),
            0x92 => Ok(Opcode::Stop),
            0x93 => Ok(Opcode::Home),
            0x94 => Ok(Opcode::SetSpeed),
            0x95 => Ok(Opcode::EmergencyStop),
            other => Err(FrameError::UnknownOpcode(other)),
        }
    }
}

/// A parsed or constructed frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Command opcode
    pub opcode: Opcode,
    /// Payload data
    pub payload: Vec<u8, MAX_PAYLOAD_SIZE>,
}

impl Frame {
    /// Create a new frame, checking the payload length against the opcode
    pub fn new(opcode: Opcode, payload: &[u8]) -> Result<Self, FrameError> {
        if payload.len() != opcode.payload_len() {
            return Err(FrameError::PayloadLengthMismatch);
        }

        let mut payload_vec = Vec::new();
        payload_vec
            .extend_from_slice(payload)
            .map_err(|_| FrameError::PayloadLengthMismatch)?;

        Ok(Self {
            opcode,
            payload: payload_vec,
        })
    }

    /// Create a frame with no payload
    pub fn empty(opcode: Opcode) -> Self {
        Self {
            opcode,
            payload: Vec::new(),
        }
    }

    /// Number of bytes this frame occupies on the wire
    pub fn len(&self) -> usize {
        FRAME_HEADER.len() + 1 + self.payload.len()
    }

    /// Frames always carry at least the header and opcode
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Encode this frame into a byte buffer
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        let frame_len = self.len();
        if buffer.len() < frame_len {
            return Err(FrameError::BufferTooSmall);
        }

        buffer[..2].copy_from_slice(&FRAME_HEADER);
        buffer[2] = self.opcode as u8;
        buffer[3..frame_len].copy_from_slice(&self.payload);

        Ok(frame_len)
    }

    /// Encode this frame into a heapless Vec
    pub fn encode_to_vec(&self) -> Result<Vec<u8, MAX_FRAME_SIZE>, FrameError> {
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        let len = self.encode(&mut buffer)?;
        let mut vec = Vec::new();
        vec.extend_from_slice(&buffer[..len])
            .map_err(|_| FrameError::BufferTooSmall)?;
        Ok(vec)
    }
}

/// State machine for reassembling frames from a byte stream
///
/// This is the driver-module side of the link: it is what the far end runs,
/// and what bus sniffers and test doubles use to decode controller output.
#[derive(Debug, Clone)]
pub struct FrameParser {
    state: ParseState,
    buffer: Vec<u8, MAX_PAYLOAD_SIZE>,
    opcode: Opcode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    /// Waiting for first header byte
    WaitingForHeader,
    /// Got 0xAA, waiting for 0x55
    WaitingForSync,
    /// Header complete, waiting for OPCODE
    WaitingForOpcode,
    /// Reading payload bytes
    ReadingPayload,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser {
    /// Create a new frame parser
    pub fn new() -> Self {
        Self {
            state: ParseState::WaitingForHeader,
            buffer: Vec::new(),
            opcode: Opcode::GetStatus,
        }
    }

    /// Reset the parser state
    pub fn reset(&mut self) {
        self.state = ParseState::WaitingForHeader;
        self.buffer.clear();
    }

    /// Feed a single byte to the parser
    ///
    /// Returns `Ok(Some(frame))` when a complete frame is parsed,
    /// `Ok(None)` when more bytes are needed, or `Err` on an unknown opcode.
    pub fn feed(&mut self, byte: u8) -> Result<Option<Frame>, FrameError> {
        match self.state {
            ParseState::WaitingForHeader => {
                if byte == FRAME_HEADER[0] {
                    self.state = ParseState::WaitingForSync;
                }
                Ok(None)
            }
            ParseState::WaitingForSync => {
                if byte == FRAME_HEADER[1] {
                    self.state = ParseState::WaitingForOpcode;
                } else if byte != FRAME_HEADER[0] {
                    self.reset();
                }
                Ok(None)
            }
            ParseState::WaitingForOpcode => {
                let opcode = match Opcode::try_from(byte) {
                    Ok(opcode) => opcode,
                    Err(e) => {
                        self.reset();
                        return Err(e);
                    }
                };

                if opcode.payload_len() == 0 {
                    self.reset();
                    return Ok(Some(Frame::empty(opcode)));
                }

                self.opcode = opcode;
                self.buffer.clear();
                self.state = ParseState::ReadingPayload;
                Ok(None)
            }
            ParseState::ReadingPayload => {
                // Cannot overflow: payload_len() never exceeds MAX_PAYLOAD_SIZE
                let _ = self.buffer.push(byte);
                if self.buffer.len() < self.opcode.payload_len() {
                    return Ok(None);
                }

                let frame = Frame {
                    opcode: self.opcode,
                    payload: self.buffer.clone(),
                };
                self.reset();
                Ok(Some(frame))
            }
        }
    }

    /// Feed multiple bytes to the parser
    ///
    /// Returns the first complete frame found together with the number of
    /// bytes consumed. Bytes after a complete frame are not consumed.
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> Result<(Option<Frame>, usize), FrameError> {
        for (i, &byte) in bytes.iter().enumerate() {
            if let Some(frame) = self.feed(byte)? {
                return Ok((Some(frame), i + 1));
            }
        }
        Ok((None, bytes.len()))
    }
}
