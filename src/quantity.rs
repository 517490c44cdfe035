pub mod cost;
pub mod energy;
pub mod power;
pub mod rate;
pub mod ratio;

/// Physical quantity tagged with the exponents of its dimensions:
/// kilowatts, hours, and currency units.
///
/// The exponents keep energy, power, rates, and costs from being mixed up, while the
/// dimension-changing products are implemented explicitly next to each alias.
#[derive(
    Clone,
    Copy,
    Default,
    PartialEq,
    PartialOrd,
    derive_more::Add,
    derive_more::AddAssign,
    derive_more::From,
    derive_more::FromStr,
    derive_more::Neg,
    derive_more::Sub,
    derive_more::SubAssign,
    derive_more::Sum,
)]
pub struct Quantity<T, const POWER: isize, const TIME: isize, const COST: isize>(pub T);

impl<const POWER: isize, const TIME: isize, const COST: isize> Quantity<f64, POWER, TIME, COST> {
    pub const ZERO: Self = Self(0.0);

    /// The greater of the two, for clamping at zero.
    #[must_use]
    pub fn max(self, rhs: Self) -> Self {
        Self(self.0.max(rhs.0))
    }
}
