//! Interlock status

/// Interlock status, the single answer to "is it safe to move"
///
/// Variants are ordered by severity. The status word only ever rises
/// until an explicit reset brings it back to `Ok`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum SafetyStatus {
    /// All conditions normal
    #[default]
    Ok = 0,
    /// Driver reported reaching its travel limit
    SoftLimit = 1,
    /// Overload sensor asserted
    Overload = 2,
    /// Physical limit switch hit
    HardLimit = 3,
    /// Emergency stop requested or e-stop switch pressed
    EmergencyStop = 4,
}

impl SafetyStatus {
    /// Check if motion is permitted
    pub fn is_ok(self) -> bool {
        self == SafetyStatus::Ok
    }

    /// Encode as a single status word
    pub const fn as_word(self) -> u8 {
        self as u8
    }

    /// Decode a status word
    ///
    /// Unknown values decode as `EmergencyStop`.
    pub const fn from_word(word: u8) -> Self {
        match word {
            0 => SafetyStatus::Ok,
            1 => SafetyStatus::SoftLimit,
            2 => SafetyStatus::Overload,
            3 => SafetyStatus::HardLimit,
            _ => SafetyStatus::EmergencyStop,
        }
    }
}

/// Physical input that prevented an interlock reset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResetBlocked {
    /// E-stop switch still pressed
    EmergencyStop,
    /// Limit switch still active
    HardLimit,
    /// Overload sensor still asserted
    Overload,
}
