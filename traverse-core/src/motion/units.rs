//! Physical to driver unit conversion

/// Unit conversion errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConversionError {
    /// Value is NaN or infinite
    NotFinite,
    /// Position below zero or speed not above zero
    OutOfRange,
    /// Result does not fit the wire field
    Overflow,
}

/// Millimetre to step conversion for a lead-screw axis
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StepConversion {
    steps_per_mm: f32,
}

impl StepConversion {
    /// Create a converter for the given resolution
    pub const fn new(steps_per_mm: f32) -> Self {
        Self { steps_per_mm }
    }

    /// Steps per millimetre
    pub fn steps_per_mm(&self) -> f32 {
        self.steps_per_mm
    }

    /// Absolute position in mm to a 32-bit step count
    pub fn position_to_steps(&self, position_mm: f32) -> Result<u32, ConversionError> {
        if !position_mm.is_finite() {
            return Err(ConversionError::NotFinite);
        }
        if position_mm < 0.0 {
            return Err(ConversionError::OutOfRange);
        }

        let steps = libm::roundf(position_mm * self.steps_per_mm);
        if steps > u32::MAX as f32 {
            return Err(ConversionError::Overflow);
        }
        Ok(steps as u32)
    }

    /// Speed in mm/s to a 16-bit steps/s value
    ///
    /// Speeds that round to zero steps/s are rejected.
    pub fn speed_to_steps(&self, speed_mm_s: f32) -> Result<u16, ConversionError> {
        if !speed_mm_s.is_finite() {
            return Err(ConversionError::NotFinite);
        }

        let steps = libm::roundf(speed_mm_s * self.steps_per_mm);
        if steps < 1.0 {
            return Err(ConversionError::OutOfRange);
        }
        if steps > u16::MAX as f32 {
            return Err(ConversionError::Overflow);
        }
        Ok(steps as u16)
    }

    /// Step count back to mm
    pub fn steps_to_position(&self, steps: u32) -> f32 {
        steps as f32 / self.steps_per_mm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNITS: StepConversion = StepConversion::new(1600.0);

    #[test]
    fn test_position_conversion() {
        assert_eq!(UNITS.position_to_steps(5.0), Ok(8000));
        assert_eq!(UNITS.position_to_steps(0.01), Ok(16));
        assert_eq!(UNITS.position_to_steps(200.0), Ok(320_000));
        assert_eq!(UNITS.steps_to_position(8000), 5.0);
    }

    #[test]
    fn test_position_rejects_negative_and_nan() {
        assert_eq!(
            UNITS.position_to_steps(-0.5),
            Err(ConversionError::OutOfRange)
        );
        assert_eq!(
            UNITS.position_to_steps(f32::NAN),
            Err(ConversionError::NotFinite)
        );
    }

    #[test]
    fn test_speed_conversion() {
        assert_eq!(UNITS.speed_to_steps(2.0), Ok(3200));
        assert_eq!(UNITS.speed_to_steps(40.0), Ok(64_000));
    }

    #[test]
    fn test_speed_limits() {
        assert_eq!(UNITS.speed_to_steps(0.0), Err(ConversionError::OutOfRange));
        assert_eq!(UNITS.speed_to_steps(-1.0), Err(ConversionError::OutOfRange));
        assert_eq!(UNITS.speed_to_steps(41.0), Err(ConversionError::Overflow));
        assert_eq!(
            UNITS.speed_to_steps(f32::INFINITY),
            Err(ConversionError::NotFinite)
        );
    }
}
