use std::fmt::{Display, Formatter};

use chrono::{DateTime, Local};

/// Named measurement channel of the device, for example `Grid` or `Solar+`.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Register(String);

impl Register {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Register {
    fn from(name: &str) -> Self {
        Self(name.to_owned())
    }
}

impl From<String> for Register {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl Display for Register {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a raw value relates to time.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ValueKind {
    /// Power at the moment of the reading, in watts.
    InstantPower,

    /// Running counter in watt-hours since the device epoch.
    CumulativeEnergy,

    /// Energy accumulated within one sampling interval, in watt-hours.
    IntervalEnergy,
}

/// One raw value as reported by the device, in device units.
#[must_use]
#[derive(Clone, Debug, PartialEq, derive_more::Constructor)]
pub struct Reading {
    pub register: Register,
    pub timestamp: DateTime<Local>,
    pub value: f64,
    pub kind: ValueKind,
}
