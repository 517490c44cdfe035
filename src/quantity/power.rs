use std::fmt::{Debug, Display, Formatter};

use crate::quantity::Quantity;

pub type Kilowatts = Quantity<f64, 1, 0, 0>;

/// Raw device power unit.
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd)]
pub struct Watts(pub f64);

impl From<Watts> for Kilowatts {
    fn from(watts: Watts) -> Self {
        Self(watts.0 / 1000.0)
    }
}

impl Display for Kilowatts {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2} kW", self.0)
    }
}

impl Debug for Kilowatts {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.0}W", self.0 * 1000.0)
    }
}
