use std::ops::{Range, Sub};

use itertools::Itertools;

impl<T> Deltas for T where T: ?Sized {}

pub trait Deltas {
    /// Subtract the pairwise windows and return the iterator over `(Range<K>, ΔV)`.
    ///
    /// The delta is always `later − earlier`, so the input must already be in the ascending
    /// key order.
    fn deltas<K, V>(self) -> impl Iterator<Item = (Range<K>, <V as Sub>::Output)>
    where
        Self: Iterator<Item = (K, V)> + Sized,
        K: Copy,
        V: Copy + Sub,
    {
        self.tuple_windows().map(|((from_index, from_value), (to_index, to_value))| {
            (from_index..to_index, to_value - from_value)
        })
    }
}

/// Which end of the `earlier..later` pair an interval delta is stored at.
#[derive(Copy, Clone, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum Attribution {
    /// The delta describes the interval starting at the earlier reading.
    IntervalStart,

    /// The delta describes the interval ending at the later reading.
    IntervalEnd,
}

impl Attribution {
    pub fn pick<K: Copy>(self, interval: &Range<K>) -> K {
        match self {
            Self::IntervalStart => interval.start,
            Self::IntervalEnd => interval.end,
        }
    }
}

/// What to do with a negative delta of a counter that can only grow.
#[derive(Copy, Clone, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum OnCounterReset {
    /// Keep the interval with zero energy.
    Clamp,

    /// Leave the interval out.
    Drop,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DeltaPolicy {
    pub attribution: Attribution,
    pub on_counter_reset: OnCounterReset,
}

impl DeltaPolicy {
    /// Deltas are attributed to the interval start (so a monthly row holds the energy of that
    /// month), and a counter reset yields zero energy for the affected interval.
    pub const DEFAULT: Self =
        Self { attribution: Attribution::IntervalStart, on_counter_reset: OnCounterReset::Clamp };
}

impl Default for DeltaPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}
