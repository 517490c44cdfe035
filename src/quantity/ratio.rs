use std::fmt::{Debug, Display, Formatter};

/// Dimensionless share, normally within `0.0..=1.0`.
#[derive(Copy, Clone, Default, PartialEq, PartialOrd)]
pub struct Ratio(pub f64);

impl Ratio {
    pub const ZERO: Self = Self(0.0);

    /// Divide with the zero guard: an empty denominator yields zero, never `NaN`.
    #[must_use]
    pub fn of(numerator: f64, denominator: f64) -> Self {
        if denominator == 0.0 || !denominator.is_finite() || !numerator.is_finite() {
            Self::ZERO
        } else {
            Self(numerator / denominator)
        }
    }
}

impl Debug for Ratio {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for Ratio {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1}%", self.0 * 100.0)
    }
}
