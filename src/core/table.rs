use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::{Display, Formatter},
};

use chrono::{DateTime, Local, TimeDelta};

use crate::{
    core::{granularity::Granularity, reading::Register},
    quantity::{Quantity, energy::KilowattHours},
};

/// Semantic kind of a column, which decides how it may be aggregated.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum ColumnKind {
    /// Energy within one interval, in kilowatt-hours.
    Energy,

    /// Average or instantaneous power, in kilowatts.
    Power,
}

impl ColumnKind {
    #[must_use]
    pub const fn unit(self) -> &'static str {
        match self {
            Self::Energy => "kWh",
            Self::Power => "kW",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Column {
    pub register: Register,
    pub kind: ColumnKind,
}

impl Column {
    pub fn energy(register: impl Into<Register>) -> Self {
        Self { register: register.into(), kind: ColumnKind::Energy }
    }

    pub fn power(register: impl Into<Register>) -> Self {
        Self { register: register.into(), kind: ColumnKind::Power }
    }
}

impl Display for Column {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]", self.register, self.kind.unit())
    }
}

pub type Row = BTreeMap<Column, f64>;

/// Time-indexed table with one column per register and kind.
///
/// Timestamps are unique and iterated in the ascending order. Cells may be missing: a row only
/// holds the columns which were actually observed at that moment.
#[must_use]
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    granularity: Granularity,
    rows: BTreeMap<DateTime<Local>, Row>,

    /// Columns whose cells are stamped at the end of their interval rather than at its start.
    end_stamped: BTreeSet<Column>,
}

impl Table {
    pub const fn new(granularity: Granularity) -> Self {
        Self { granularity, rows: BTreeMap::new(), end_stamped: BTreeSet::new() }
    }

    pub fn mark_end_stamped(&mut self, column: Column) {
        self.end_stamped.insert(column);
    }

    #[must_use]
    pub fn is_end_stamped(&self, column: &Column) -> bool {
        self.end_stamped.contains(column)
    }

    /// Start of the `granularity` interval that the cell belongs to.
    ///
    /// An end-stamped cell belongs to the interval its timestamp closes.
    #[must_use]
    pub fn interval_start(
        &self,
        granularity: Granularity,
        timestamp: DateTime<Local>,
        column: &Column,
    ) -> DateTime<Local> {
        if self.is_end_stamped(column) {
            granularity.truncate(timestamp - TimeDelta::nanoseconds(1))
        } else {
            granularity.truncate(timestamp)
        }
    }

    #[must_use]
    pub const fn granularity(&self) -> Granularity {
        self.granularity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Set the cell, replacing a previous value if any.
    pub fn insert(&mut self, timestamp: DateTime<Local>, column: Column, value: f64) {
        self.rows.entry(timestamp).or_default().insert(column, value);
    }

    #[must_use]
    pub fn get(&self, timestamp: DateTime<Local>, column: &Column) -> Option<f64> {
        self.rows.get(&timestamp)?.get(column).copied()
    }

    pub fn rows(&self) -> impl Iterator<Item = (DateTime<Local>, &Row)> {
        self.rows.iter().map(|(timestamp, row)| (*timestamp, row))
    }

    pub fn timestamps(&self) -> impl Iterator<Item = DateTime<Local>> {
        self.rows.keys().copied()
    }

    #[must_use]
    pub fn columns(&self) -> BTreeSet<Column> {
        self.rows.values().flat_map(Row::keys).cloned().collect()
    }

    /// Iterate over the present cells of the column, skipping the gaps.
    pub fn column(&self, column: &Column) -> impl Iterator<Item = (DateTime<Local>, f64)> {
        self.rows
            .iter()
            .filter_map(move |(timestamp, row)| row.get(column).map(|value| (*timestamp, *value)))
    }

    /// Interval energy of the register. Power columns are never returned here.
    pub fn energy(&self, register: &Register) -> impl Iterator<Item = (DateTime<Local>, KilowattHours)> {
        let column = Column::energy(register.clone());
        self.rows.iter().filter_map(move |(timestamp, row)| {
            row.get(&column).map(|value| (*timestamp, Quantity(*value)))
        })
    }

    /// Total energy of the register over the whole table.
    #[must_use]
    pub fn total_energy(&self, register: &Register) -> KilowattHours {
        self.energy(register).map(|(_, energy)| energy).sum()
    }

    /// Keep only the rows whose timestamp satisfies the predicate.
    pub fn filter(&self, predicate: impl Fn(DateTime<Local>) -> bool) -> Self {
        Self {
            granularity: self.granularity,
            end_stamped: self.end_stamped.clone(),
            rows: self
                .rows
                .iter()
                .filter(|(timestamp, _)| predicate(**timestamp))
                .map(|(timestamp, row)| (*timestamp, row.clone()))
                .collect(),
        }
    }

    /// Build from rows stamped at their interval starts.
    pub(crate) fn with_rows(granularity: Granularity, rows: BTreeMap<DateTime<Local>, Row>) -> Self {
        Self { granularity, rows, end_stamped: BTreeSet::new() }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;

    use super::*;

    fn hour(hour: u32) -> DateTime<Local> {
        NaiveDate::from_ymd_opt(2025, 6, 11)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
            .and_local_timezone(Local)
            .unwrap()
    }

    #[test]
    fn test_insert_keeps_timestamps_ordered_and_unique() {
        let mut table = Table::new(Granularity::Hour);
        table.insert(hour(3), Column::energy("Grid"), 1.0);
        table.insert(hour(1), Column::energy("Grid"), 2.0);
        table.insert(hour(3), Column::energy("Grid"), 3.0);
        assert_eq!(table.timestamps().collect::<Vec<_>>(), [hour(1), hour(3)]);
        assert_eq!(table.get(hour(3), &Column::energy("Grid")), Some(3.0));
    }

    #[test]
    fn test_typed_accessors_do_not_mix_kinds() {
        let mut table = Table::new(Granularity::Hour);
        table.insert(hour(1), Column::energy("Solar"), 1.5);
        table.insert(hour(1), Column::power("Solar"), 3.0);
        table.insert(hour(2), Column::energy("Solar"), 0.5);
        let register = Register::from("Solar");
        assert_eq!(table.energy(&register).count(), 2);
        assert_abs_diff_eq!(table.total_energy(&register).0, 2.0);
    }

    #[test]
    fn test_column_skips_gaps() {
        let mut table = Table::new(Granularity::Hour);
        table.insert(hour(1), Column::energy("Grid"), 1.0);
        table.insert(hour(2), Column::energy("Solar"), 2.0);
        table.insert(hour(3), Column::energy("Grid"), 3.0);
        let grid: Vec<_> = table.column(&Column::energy("Grid")).collect();
        assert_eq!(grid, [(hour(1), 1.0), (hour(3), 3.0)]);
    }

    #[test]
    fn test_end_stamped_cell_belongs_to_the_closed_interval() {
        let mut table = Table::new(Granularity::Hour);
        let column = Column::energy("Grid");
        assert_eq!(table.interval_start(Granularity::Day, hour(0), &column), hour(0));
        table.mark_end_stamped(column.clone());
        assert_eq!(table.interval_start(Granularity::Day, hour(0), &column), hour(0) - TimeDelta::days(1));
        assert_eq!(table.interval_start(Granularity::Day, hour(5), &column), hour(0));
        assert_eq!(table.interval_start(Granularity::Day, hour(5), &Column::power("Grid")), hour(0));
        assert!(table.filter(|_| true).is_end_stamped(&column));
    }

    #[test]
    fn test_empty_total_is_zero() {
        let table = Table::new(Granularity::Month);
        assert_abs_diff_eq!(table.total_energy(&Register::from("Grid")).0, 0.0);
    }
}
