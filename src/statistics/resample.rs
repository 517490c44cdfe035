use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter},
};

use average::{Max, Mean, Min};
use chrono::{DateTime, Local};

use crate::{
    core::{
        granularity::Granularity,
        table::{Column, ColumnKind, Row, Table},
    },
    prelude::*,
};

/// How the values falling into one coarser interval are combined.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Reducer {
    Sum,
    Mean,
    Max,
    Min,
}

impl Reducer {
    /// Energy adds up, power averages out.
    #[must_use]
    pub const fn natural(kind: ColumnKind) -> Self {
        match kind {
            ColumnKind::Energy => Self::Sum,
            ColumnKind::Power => Self::Mean,
        }
    }

    /// Peaks are meaningful for either kind, but summing power or averaging interval energy
    /// over a coarser interval is not.
    #[must_use]
    pub const fn accepts(self, kind: ColumnKind) -> bool {
        !matches!((self, kind), (Self::Sum, ColumnKind::Power) | (Self::Mean, ColumnKind::Energy))
    }

    fn reduce(self, values: &[f64]) -> f64 {
        match self {
            Self::Sum => values.iter().sum(),
            Self::Mean => values.iter().collect::<Mean>().mean(),
            Self::Max => values.iter().collect::<Max>().max(),
            Self::Min => values.iter().collect::<Min>().min(),
        }
    }
}

impl Display for Reducer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Sum => "sum",
            Self::Mean => "mean",
            Self::Max => "max",
            Self::Min => "min",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    #[error("{reducer} cannot be applied to `{column}`")]
    IncompatibleReducer { reducer: Reducer, column: Column },
}

impl Table {
    /// Resample to the coarser granularity, summing energy and averaging power.
    ///
    /// Each output row is stamped with the start of its interval, whichever end the input
    /// cells were stamped at.
    #[instrument(skip_all, fields(from = %self.granularity(), to = %granularity, n_rows = self.len()))]
    pub fn resample(&self, granularity: Granularity) -> Self {
        self.reduce_into(granularity, |column| Reducer::natural(column.kind))
    }

    /// Resample with explicitly chosen reducers.
    pub fn resample_with(
        &self,
        granularity: Granularity,
        reducer: impl Fn(&Column) -> Reducer,
    ) -> Result<Self, AggregateError> {
        for column in self.columns() {
            let reducer = reducer(&column);
            if !reducer.accepts(column.kind) {
                return Err(AggregateError::IncompatibleReducer { reducer, column });
            }
        }
        Ok(self.reduce_into(granularity, reducer))
    }

    fn reduce_into(&self, granularity: Granularity, reducer: impl Fn(&Column) -> Reducer) -> Self {
        let mut buckets: BTreeMap<DateTime<Local>, BTreeMap<&Column, Vec<f64>>> = BTreeMap::new();
        for (timestamp, row) in self.rows() {
            for (column, value) in row {
                buckets
                    .entry(self.interval_start(granularity, timestamp, column))
                    .or_default()
                    .entry(column)
                    .or_default()
                    .push(*value);
            }
        }
        let rows = buckets
            .into_iter()
            .map(|(timestamp, bucket)| {
                let row: Row = bucket
                    .into_iter()
                    .map(|(column, values)| (column.clone(), reducer(column).reduce(&values)))
                    .collect();
                (timestamp, row)
            })
            .collect();
        Self::with_rows(granularity, rows)
    }
}
