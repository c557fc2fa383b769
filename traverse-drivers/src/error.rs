//! Error type shared by the motion API and the serial channel

use core::fmt;

use traverse_core::motion::ConversionError;
use traverse_protocol::FrameError;

/// Errors reported to callers of the motion API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Out-of-range or malformed position or speed
    InvalidArg,
    /// Operation not valid in the current axis or interlock state
    InvalidState,
    /// Serial link lock not acquired in time
    Busy,
    /// No reply within the response window
    Timeout,
    /// Command queue stayed full for the whole enqueue window
    QueueFull,
    /// Byte count or framing mismatch on the wire
    Io,
    /// Hardware resource unavailable at initialisation
    Resource,
}

/// Result alias for this crate
pub type Result<T> = core::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Error::InvalidArg => "invalid argument",
            Error::InvalidState => "invalid state",
            Error::Busy => "serial link busy",
            Error::Timeout => "response timeout",
            Error::QueueFull => "command queue full",
            Error::Io => "serial I/O error",
            Error::Resource => "resource unavailable",
        };
        f.write_str(msg)
    }
}

impl From<FrameError> for Error {
    fn from(_: FrameError) -> Self {
        Error::Io
    }
}

impl From<ConversionError> for Error {
    fn from(_: ConversionError) -> Self {
        Error::InvalidArg
    }
}
