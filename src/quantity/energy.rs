use std::{
    fmt::{Debug, Display, Formatter},
    ops::{Div, Mul},
};

use chrono::TimeDelta;

use crate::quantity::{Quantity, cost::Cost, power::Kilowatts, rate::KilowattHourRate};

pub type KilowattHours = Quantity<f64, 1, 1, 0>;

/// Raw device energy unit.
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd, derive_more::Sub)]
pub struct WattHours(pub f64);

#[derive(Copy, Clone, Debug, PartialEq, PartialOrd)]
pub struct MegawattHours(pub f64);

impl From<WattHours> for KilowattHours {
    fn from(watt_hours: WattHours) -> Self {
        Self(watt_hours.0 / 1000.0)
    }
}

impl From<KilowattHours> for MegawattHours {
    fn from(kilowatt_hours: KilowattHours) -> Self {
        Self(kilowatt_hours.0 / 1000.0)
    }
}

impl Display for KilowattHours {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1} kWh", self.0)
    }
}

impl Debug for KilowattHours {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3}kWh", self.0)
    }
}

impl Display for MegawattHours {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2} MWh", self.0)
    }
}

impl Mul<KilowattHourRate> for KilowattHours {
    type Output = Cost;

    fn mul(self, rhs: KilowattHourRate) -> Self::Output {
        Quantity(self.0 * rhs.0)
    }
}

impl Div<TimeDelta> for KilowattHours {
    type Output = Kilowatts;

    fn div(self, rhs: TimeDelta) -> Self::Output {
        let hours = rhs.as_seconds_f64() / 3600.0;
        Quantity(self.0 / hours)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    #[expect(clippy::float_cmp)]
    fn test_watt_hours_to_kilowatt_hours_is_exact() {
        assert_eq!(KilowattHours::from(WattHours(1000.0)).0, 1.0);
    }

    #[test]
    fn test_chained_conversion_composes() {
        let megawatt_hours = MegawattHours::from(KilowattHours::from(WattHours(2_345_678.0)));
        assert_abs_diff_eq!(megawatt_hours.0, 2_345_678.0 / 1_000_000.0, epsilon = 1e-12);
    }

    #[test]
    fn test_average_power() {
        let power = KilowattHours::from(1.5) / TimeDelta::minutes(30);
        assert_abs_diff_eq!(power.0, 3.0);
    }
}
