use std::cmp::Reverse;

use average::{Max, Mean, Min, Variance};
use chrono::{DateTime, Local};
use ordered_float::OrderedFloat;

use crate::{
    core::table::{Column, ColumnKind, Table},
    statistics::resample::{AggregateError, Reducer},
};

/// Scalar statistic of one column.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Statistic {
    Sum,
    Mean,
    Max,
    Min,

    /// Sample standard deviation.
    StdDev,
}

/// Value of a column together with the moment it was observed.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Extremum {
    pub timestamp: DateTime<Local>,
    pub value: f64,
}

/// Descriptive statistics of one column.
///
/// An empty column yields zeros and no extrema.
#[must_use]
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnSummary {
    pub column: Column,
    pub n_values: usize,

    /// Only defined for energy.
    pub total: Option<f64>,

    pub mean: f64,
    pub std_dev: f64,

    /// The earliest of the highest values.
    pub peak: Option<Extremum>,

    /// The earliest of the lowest values.
    pub lowest: Option<Extremum>,
}

impl Table {
    /// Compute the statistic over the present cells of the column, zero when there are none.
    pub fn statistic(&self, column: &Column, statistic: Statistic) -> Result<f64, AggregateError> {
        if statistic == Statistic::Sum && column.kind == ColumnKind::Power {
            return Err(AggregateError::IncompatibleReducer { reducer: Reducer::Sum, column: column.clone() });
        }
        let values = self.column(column).map(|(_, value)| value);
        let value = match statistic {
            Statistic::Sum => values.sum::<f64>(),
            Statistic::Mean => values.collect::<Mean>().mean(),
            Statistic::Max => values.collect::<Max>().max(),
            Statistic::Min => values.collect::<Min>().min(),
            Statistic::StdDev => {
                let variance = values.collect::<Variance>();
                if variance.len() < 2 { 0.0 } else { variance.sample_variance().sqrt() }
            }
        };
        Ok(if value.is_finite() { value } else { 0.0 })
    }

    pub fn summarize(&self, column: &Column) -> ColumnSummary {
        let statistic = |statistic| self.statistic(column, statistic).unwrap_or_default();
        let extremum = |(timestamp, value): (DateTime<Local>, f64)| Extremum { timestamp, value };
        ColumnSummary {
            column: column.clone(),
            n_values: self.column(column).count(),
            total: (column.kind == ColumnKind::Energy).then(|| statistic(Statistic::Sum)),
            mean: statistic(Statistic::Mean),
            std_dev: statistic(Statistic::StdDev),
            peak: self.column(column).min_by_key(|(_, value)| Reverse(OrderedFloat(*value))).map(extremum),
            lowest: self.column(column).min_by_key(|(_, value)| OrderedFloat(*value)).map(extremum),
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;

    use super::*;
    use crate::{core::granularity::Granularity, prelude::*};

    fn at(day: u32) -> DateTime<Local> {
        NaiveDate::from_ymd_opt(2025, 6, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_local_timezone(Local)
            .unwrap()
    }

    fn daily() -> Table {
        let mut table = Table::new(Granularity::Day);
        for (day, value) in [(1, 2.0), (2, 4.0), (3, 4.0), (4, 6.0), (5, 1.0)] {
            table.insert(at(day), Column::energy("Solar"), value);
        }
        table.insert(at(1), Column::power("Grid"), 0.5);
        table
    }

    #[test]
    fn test_statistics() -> Result {
        let table = daily();
        let solar = Column::energy("Solar");
        assert_abs_diff_eq!(table.statistic(&solar, Statistic::Sum)?, 17.0);
        assert_abs_diff_eq!(table.statistic(&solar, Statistic::Mean)?, 3.4);
        assert_abs_diff_eq!(table.statistic(&solar, Statistic::Max)?, 6.0);
        assert_abs_diff_eq!(table.statistic(&solar, Statistic::Min)?, 1.0);
        assert_abs_diff_eq!(table.statistic(&solar, Statistic::StdDev)?, 1.949_358_868_961_793, epsilon = 1e-9);
        Ok(())
    }

    #[test]
    fn test_sum_of_power_is_rejected() {
        assert!(daily().statistic(&Column::power("Grid"), Statistic::Sum).is_err());
    }

    #[test]
    fn test_summarize() {
        let summary = daily().summarize(&Column::energy("Solar"));
        assert_eq!(summary.n_values, 5);
        assert_abs_diff_eq!(summary.total.unwrap(), 17.0);
        assert_eq!(summary.peak, Some(Extremum { timestamp: at(4), value: 6.0 }));
        assert_eq!(summary.lowest, Some(Extremum { timestamp: at(5), value: 1.0 }));
    }

    #[test]
    fn test_peak_tie_is_earliest() {
        let mut table = Table::new(Granularity::Day);
        table.insert(at(2), Column::energy("Solar"), 4.0);
        table.insert(at(3), Column::energy("Solar"), 4.0);
        assert_eq!(table.summarize(&Column::energy("Solar")).peak.unwrap().timestamp, at(2));
    }

    #[test]
    fn test_power_has_no_total() {
        assert_eq!(daily().summarize(&Column::power("Grid")).total, None);
    }

    #[test]
    fn test_empty_is_zero() -> Result {
        let table = Table::new(Granularity::Month);
        let solar = Column::energy("Solar");
        for statistic in [Statistic::Sum, Statistic::Mean, Statistic::Max, Statistic::Min, Statistic::StdDev] {
            assert_abs_diff_eq!(table.statistic(&solar, statistic)?, 0.0);
        }
        let summary = table.summarize(&solar);
        assert_eq!(summary.total, Some(0.0));
        assert_abs_diff_eq!(summary.mean, 0.0);
        assert_eq!(summary.peak, None);
        Ok(())
    }
}
