use std::fmt::{Display, Formatter};

use chrono::{DateTime, Datelike, DurationRound, Local, Months, NaiveTime, TimeDelta, Weekday};

/// Nominal sampling period of a table or a historical query.
///
/// Ordered from the finest to the coarsest.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Granularity {
    Second,
    Minute,
    Hour,
    Day,
    Month,
}

impl Granularity {
    /// Average Gregorian month.
    const AVERAGE_MONTH: TimeDelta = TimeDelta::seconds(2_629_746);

    /// Approximate duration of one interval.
    #[must_use]
    pub const fn nominal_duration(self) -> TimeDelta {
        match self {
            Self::Second => TimeDelta::seconds(1),
            Self::Minute => TimeDelta::minutes(1),
            Self::Hour => TimeDelta::hours(1),
            Self::Day => TimeDelta::days(1),
            Self::Month => Self::AVERAGE_MONTH,
        }
    }

    /// Calendar granularities are aligned to local midnight rather than to a fixed step.
    #[must_use]
    pub const fn is_calendar(self) -> bool {
        matches!(self, Self::Day | Self::Month)
    }

    /// Truncate the timestamp to the start of its interval, in local time.
    #[must_use]
    pub fn truncate(self, timestamp: DateTime<Local>) -> DateTime<Local> {
        match self {
            Self::Second | Self::Minute | Self::Hour => {
                timestamp.duration_trunc(self.nominal_duration()).unwrap_or(timestamp)
            }
            Self::Day => start_of_day(timestamp),
            Self::Month => {
                let first_day = timestamp.with_day(1).unwrap_or(timestamp);
                start_of_day(first_day)
            }
        }
    }

    /// Timestamps at which a monthly counter should be read, newest first:
    /// `until` itself, followed by the `n_months` preceding month starts.
    ///
    /// Consecutive pairs delimit `n_months` intervals, the newest of which is the current,
    /// partial month.
    #[must_use]
    pub fn month_boundaries(until: DateTime<Local>, n_months: u32) -> Vec<DateTime<Local>> {
        let current_month = Self::Month.truncate(until);
        let mut boundaries = Vec::with_capacity(n_months as usize + 1);
        boundaries.push(until);
        boundaries.extend(
            (0..n_months)
                .filter_map(|n| current_month.checked_sub_months(Months::new(n)))
                .filter(|boundary| *boundary < until),
        );
        boundaries
    }
}

impl Display for Granularity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Second => "second",
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Month => "month",
        })
    }
}

fn start_of_day(timestamp: DateTime<Local>) -> DateTime<Local> {
    timestamp
        .date_naive()
        .and_time(NaiveTime::MIN)
        .and_local_timezone(Local)
        .earliest()
        .unwrap_or(timestamp)
}

#[must_use]
pub fn is_weekend(timestamp: DateTime<Local>) -> bool {
    matches!(timestamp.weekday(), Weekday::Sat | Weekday::Sun)
}
