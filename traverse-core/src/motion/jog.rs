//! Manual jog increments
//!
//! The operator jogs the axis by one of a fixed set of step sizes at a
//! percentage of the configured maximum jog speed.

/// Jog direction along the screw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum JogDirection {
    /// Away from home
    Forward,
    /// Towards home
    Backward,
}

impl JogDirection {
    fn sign(self) -> f32 {
        match self {
            JogDirection::Forward => 1.0,
            JogDirection::Backward => -1.0,
        }
    }
}

/// Fixed jog step sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum JogStep {
    /// 0.01 mm
    Hundredth,
    /// 0.05 mm
    FiveHundredths,
    /// 0.1 mm
    #[default]
    Tenth,
    /// 0.5 mm
    Half,
    /// 1 mm
    One,
    /// 5 mm
    Five,
}

impl JogStep {
    /// All step sizes, smallest first
    pub const ALL: [JogStep; 6] = [
        JogStep::Hundredth,
        JogStep::FiveHundredths,
        JogStep::Tenth,
        JogStep::Half,
        JogStep::One,
        JogStep::Five,
    ];

    /// Step size in mm
    pub fn mm(self) -> f32 {
        match self {
            JogStep::Hundredth => 0.01,
            JogStep::FiveHundredths => 0.05,
            JogStep::Tenth => 0.1,
            JogStep::Half => 0.5,
            JogStep::One => 1.0,
            JogStep::Five => 5.0,
        }
    }

    /// Target position after one jog from `current_mm`
    pub fn target_from(self, current_mm: f32, direction: JogDirection) -> f32 {
        current_mm + self.mm() * direction.sign()
    }
}

/// Jog speed for a percentage of the maximum jog speed
///
/// Percentages above 100 are clamped.
pub fn jog_speed(percent: u8, max_speed_mm_s: f32) -> f32 {
    (percent.min(100) as f32 / 100.0) * max_speed_mm_s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jog_targets() {
        assert_eq!(JogStep::One.target_from(10.0, JogDirection::Forward), 11.0);
        assert_eq!(JogStep::Five.target_from(10.0, JogDirection::Backward), 5.0);
    }

    #[test]
    fn test_steps_are_ordered() {
        for pair in JogStep::ALL.windows(2) {
            assert!(pair[0].mm() < pair[1].mm());
        }
    }

    #[test]
    fn test_jog_speed() {
        assert_eq!(jog_speed(50, 10.0), 5.0);
        assert_eq!(jog_speed(100, 10.0), 10.0);
        assert_eq!(jog_speed(250, 10.0), 10.0);
        assert_eq!(jog_speed(0, 10.0), 0.0);
    }
}
