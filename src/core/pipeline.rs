use crate::{
    api::egauge::{Device, HistoricalQuery},
    core::{
        collector::{Collector, Outcome},
        granularity::Granularity,
        reconcile::{ReconcileWarning, Reconciler},
        table::Table,
    },
    prelude::*,
};

/// How far back each series goes.
#[derive(Copy, Clone, Debug)]
pub struct Windows {
    pub months: u32,
    pub days: u32,
    pub hours: u32,
}

impl Default for Windows {
    fn default() -> Self {
        Self { months: 12, days: 365, hours: 168 }
    }
}

/// Reconciled tables of one run.
#[must_use]
pub struct Analysis {
    pub monthly: Table,
    pub daily: Table,
    pub hourly: Table,

    /// Present power of every register.
    pub current: Table,

    pub outcomes: Vec<(Granularity, Outcome)>,

    /// Anomalies corrected while reconciling each series.
    pub warnings: Vec<(Granularity, ReconcileWarning)>,
}

impl Analysis {
    /// Fetch and reconcile everything. Never fails: whatever is unavailable ends up empty.
    #[instrument(skip_all, fields(months = windows.months, days = windows.days, hours = windows.hours))]
    pub fn run<D: Device>(collector: &Collector<D>, reconciler: &Reconciler, windows: &Windows) -> Self {
        let current = match collector.instant() {
            Ok(readings) => reconciler.reconcile(readings, Granularity::Second).table,
            Err(error) => {
                warn!("failed to fetch the current readings: {error:#}");
                Table::new(Granularity::Second)
            }
        };
        let mut analysis = Self {
            monthly: Table::new(Granularity::Month),
            daily: Table::new(Granularity::Day),
            hourly: Table::new(Granularity::Hour),
            current,
            outcomes: Vec::with_capacity(3),
            warnings: Vec::new(),
        };
        analysis.monthly = analysis.series(collector, reconciler, Granularity::Month, windows.months);
        analysis.daily = analysis.series(collector, reconciler, Granularity::Day, windows.days);
        analysis.hourly = analysis.series(collector, reconciler, Granularity::Hour, windows.hours);
        info!(
            n_monthly = analysis.monthly.len(),
            n_daily = analysis.daily.len(),
            n_hourly = analysis.hourly.len(),
            n_warnings = analysis.warnings.len(),
            "done",
        );
        analysis
    }

    /// Collect and reconcile one granularity, aligning the rows to its interval starts.
    ///
    /// The same path serves every granularity, only the query differs. Whichever end the deltas
    /// are attributed to, each output row holds the energy of exactly one interval.
    fn series<D: Device>(
        &mut self,
        collector: &Collector<D>,
        reconciler: &Reconciler,
        granularity: Granularity,
        count: u32,
    ) -> Table {
        let query = HistoricalQuery::builder().granularity(granularity).count(count).build();
        let collection = collector.collect(&query);
        self.outcomes.push((granularity, collection.outcome));
        let reconciliation = reconciler.reconcile(collection.readings, granularity);
        self.warnings.extend(reconciliation.warnings.into_iter().map(|warning| (granularity, warning)));
        reconciliation.table.resample(granularity)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.monthly.is_empty()
            && self.daily.is_empty()
            && self.hourly.is_empty()
            && self.current.is_empty()
    }
}
