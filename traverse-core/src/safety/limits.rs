//! Soft travel limits

/// Software-enforced travel range in mm (inclusive)
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SoftLimits {
    pub min_mm: f32,
    pub max_mm: f32,
}

impl SoftLimits {
    pub const fn new(min_mm: f32, max_mm: f32) -> Self {
        Self { min_mm, max_mm }
    }

    /// Check whether a position lies inside the travel range
    ///
    /// NaN is never inside.
    pub fn contains(&self, position_mm: f32) -> bool {
        position_mm >= self.min_mm && position_mm <= self.max_mm
    }
}
