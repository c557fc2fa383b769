//! Telemetry record returned by the driver module
//!
//! The reply to `GetStatus` is a bare 4-byte record with no header:
//! ```text
//! ┌──────────────┬─────────────┬────────┐
//! │ CURRENT (mA) │ TEMP (°C)   │ STATUS │
//! │ 2B, BE       │ 1B          │ 1B     │
//! └──────────────┴─────────────┴────────┘
//! ```

use core::ops::BitOr;

use crate::frame::FrameError;

/// Exact length of a telemetry record
pub const TELEMETRY_LEN: usize = 4;

/// Driver status bitset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusBits(u8);

impl StatusBits {
    /// Axis is in motion
    pub const MOVING: Self = Self(1 << 0);
    /// Homing sequence has completed
    pub const HOMED: Self = Self(1 << 1);
    /// Driver reports an internal error
    pub const ERROR: Self = Self(1 << 2);
    /// Driver saw its limit input
    pub const LIMIT_HIT: Self = Self(1 << 3);

    /// No bits set
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Build from the raw status byte
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Raw status byte
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Check whether all bits in `other` are set
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_moving(self) -> bool {
        self.contains(Self::MOVING)
    }

    pub const fn is_homed(self) -> bool {
        self.contains(Self::HOMED)
    }

    pub const fn has_error(self) -> bool {
        self.contains(Self::ERROR)
    }

    pub const fn limit_hit(self) -> bool {
        self.contains(Self::LIMIT_HIT)
    }
}

impl BitOr for StatusBits {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Decoded telemetry record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Telemetry {
    /// Motor current draw in mA
    pub current_ma: u16,
    /// Driver temperature in °C
    pub temperature_c: u8,
    /// Status bits
    pub status: StatusBits,
}

impl Telemetry {
    /// Parse a telemetry record
    ///
    /// Anything other than exactly [`TELEMETRY_LEN`] bytes is rejected.
    pub fn parse(bytes: &[u8]) -> Result<Self, FrameError> {
        let [hi, lo, temperature_c, status] = bytes else {
            return Err(FrameError::InvalidLength);
        };

        Ok(Self {
            current_ma: u16::from_be_bytes([*hi, *lo]),
            temperature_c: *temperature_c,
            status: StatusBits::from_bits(*status),
        })
    }

    /// Encode as the driver module would send it
    pub fn encode(&self) -> [u8; TELEMETRY_LEN] {
        let [hi, lo] = self.current_ma.to_be_bytes();
        [hi, lo, self.temperature_c, self.status.bits()]
    }
}
