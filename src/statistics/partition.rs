use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter},
};

use average::{Estimate, Mean};
use chrono::{DateTime, Datelike, Local, Timelike, Weekday};

use crate::core::{
    granularity::is_weekend,
    table::{Column, Row, Table},
};

/// Calendar key to group the rows by.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Partition {
    HourOfDay,
    DayOfWeek,
    Weekend,

    /// Day of week and hour of day, for heat maps.
    DayOfWeekHour,
}

impl Partition {
    #[must_use]
    pub fn key(self, timestamp: DateTime<Local>) -> PartitionKey {
        match self {
            Self::HourOfDay => PartitionKey::Hour(timestamp.hour()),
            Self::DayOfWeek => PartitionKey::DayOfWeek(timestamp.weekday()),
            Self::Weekend => PartitionKey::Weekend(is_weekend(timestamp)),
            Self::DayOfWeekHour => PartitionKey::DayOfWeekHour(timestamp.weekday(), timestamp.hour()),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PartitionKey {
    Hour(u32),
    DayOfWeek(Weekday),
    Weekend(bool),
    DayOfWeekHour(Weekday, u32),
}

impl PartitionKey {
    /// Monday first, weekdays before weekends, then by hour.
    fn sort_key(self) -> (u8, u32, u32) {
        match self {
            Self::Hour(hour) => (0, 0, hour),
            Self::DayOfWeek(weekday) => (1, weekday.num_days_from_monday(), 0),
            Self::Weekend(is_weekend) => (2, u32::from(is_weekend), 0),
            Self::DayOfWeekHour(weekday, hour) => (3, weekday.num_days_from_monday(), hour),
        }
    }
}

impl Ord for PartitionKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for PartitionKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for PartitionKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hour(hour) => write!(f, "{hour:02}:00"),
            Self::DayOfWeek(weekday) => write!(f, "{weekday}"),
            Self::Weekend(true) => f.write_str("weekend"),
            Self::Weekend(false) => f.write_str("weekday"),
            Self::DayOfWeekHour(weekday, hour) => write!(f, "{weekday} {hour:02}:00"),
        }
    }
}

/// Column means per partition key.
#[must_use]
#[derive(Clone, Debug, PartialEq)]
pub struct Profile {
    pub partition: Partition,
    rows: BTreeMap<PartitionKey, Row>,
}

impl Profile {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> impl Iterator<Item = (PartitionKey, &Row)> {
        self.rows.iter().map(|(key, row)| (*key, row))
    }

    #[must_use]
    pub fn get(&self, key: PartitionKey, column: &Column) -> Option<f64> {
        self.rows.get(&key)?.get(column).copied()
    }
}

impl Table {
    /// Average every column over the rows sharing the same partition key.
    ///
    /// Interval energy stays per-interval: the hour-of-day profile of hourly energy is the
    /// typical energy of that hour.
    pub fn group_by(&self, partition: Partition) -> Profile {
        let mut groups: BTreeMap<PartitionKey, BTreeMap<&Column, Mean>> = BTreeMap::new();
        for (timestamp, row) in self.rows() {
            let group = groups.entry(partition.key(timestamp)).or_default();
            for (column, value) in row {
                group.entry(column).or_default().add(*value);
            }
        }
        let rows = groups
            .into_iter()
            .map(|(key, group)| {
                let row: Row =
                    group.into_iter().map(|(column, mean)| (column.clone(), mean.mean())).collect();
                (key, row)
            })
            .collect();
        Profile { partition, rows }
    }

    /// Split into the weekday and weekend rows.
    pub fn split_weekend(&self) -> (Self, Self) {
        (self.filter(|timestamp| !is_weekend(timestamp)), self.filter(is_weekend))
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;

    use super::*;
    use crate::core::granularity::Granularity;

    fn at(day: u32, hour: u32) -> DateTime<Local> {
        NaiveDate::from_ymd_opt(2025, 6, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
            .and_local_timezone(Local)
            .unwrap()
    }

    /// Friday the 13th through Monday the 16th, at 9:00 and 21:00.
    fn hourly() -> Table {
        let mut table = Table::new(Granularity::Hour);
        for (day, index) in (13..=16).zip(0_u32..) {
            table.insert(at(day, 9), Column::energy("Grid"), 1.0 + f64::from(index));
            table.insert(at(day, 21), Column::energy("Grid"), 10.0 + f64::from(index));
        }
        table
    }

    #[test]
    fn test_hour_of_day() {
        let profile = hourly().group_by(Partition::HourOfDay);
        assert_eq!(profile.len(), 2);
        assert_abs_diff_eq!(profile.get(PartitionKey::Hour(9), &Column::energy("Grid")).unwrap(), 2.5);
        assert_abs_diff_eq!(profile.get(PartitionKey::Hour(21), &Column::energy("Grid")).unwrap(), 11.5);
    }

    #[test]
    fn test_day_of_week_starts_on_monday() {
        let profile = hourly().group_by(Partition::DayOfWeek);
        let keys: Vec<_> = profile.rows().map(|(key, _)| key).collect();
        assert_eq!(
            keys,
            [
                PartitionKey::DayOfWeek(Weekday::Mon),
                PartitionKey::DayOfWeek(Weekday::Fri),
                PartitionKey::DayOfWeek(Weekday::Sat),
                PartitionKey::DayOfWeek(Weekday::Sun),
            ]
        );
        assert_abs_diff_eq!(
            profile.get(PartitionKey::DayOfWeek(Weekday::Mon), &Column::energy("Grid")).unwrap(),
            8.5
        );
    }

    #[test]
    fn test_weekend() {
        let profile = hourly().group_by(Partition::Weekend);
        // Saturday and Sunday: (2 + 11 + 3 + 12) / 4.
        assert_abs_diff_eq!(profile.get(PartitionKey::Weekend(true), &Column::energy("Grid")).unwrap(), 7.0);
        // Friday and Monday: (1 + 10 + 4 + 13) / 4.
        assert_abs_diff_eq!(profile.get(PartitionKey::Weekend(false), &Column::energy("Grid")).unwrap(), 7.0);
    }

    #[test]
    fn test_heat_map() {
        let profile = hourly().group_by(Partition::DayOfWeekHour);
        assert_eq!(profile.len(), 8);
        assert_abs_diff_eq!(
            profile.get(PartitionKey::DayOfWeekHour(Weekday::Sat, 21), &Column::energy("Grid")).unwrap(),
            11.0
        );
    }

    #[test]
    fn test_split_weekend() {
        let (weekdays, weekends) = hourly().split_weekend();
        assert_eq!(weekdays.len(), 4);
        assert_eq!(weekends.len(), 4);
        assert!(weekends.timestamps().all(is_weekend));
    }

    #[test]
    fn test_empty() {
        assert!(Table::new(Granularity::Hour).group_by(Partition::HourOfDay).is_empty());
    }

    #[test]
    fn test_display() {
        assert_eq!(PartitionKey::Hour(7).to_string(), "07:00");
        assert_eq!(PartitionKey::DayOfWeekHour(Weekday::Tue, 18).to_string(), "Tue 18:00");
    }
}
