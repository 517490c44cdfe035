use std::collections::BTreeMap;

use chrono::{DateTime, Local};

use crate::{
    core::{
        granularity::Granularity,
        reading::{Reading, Register, ValueKind},
        series::{Attribution, DeltaPolicy, Deltas, OnCounterReset},
        table::{Column, Table},
    },
    prelude::*,
    quantity::{
        energy::{KilowattHours, WattHours},
        power::{Kilowatts, Watts},
    },
};

/// Register name suffixes of the flow pairs that yield a derived net column:
/// `(incoming, outgoing, net)`, where the net is `incoming − outgoing`.
///
/// eGauge splits a bidirectional register `X` into `X` and its positive-only part `X+`. On the
/// grid `X` is the import and `X+` the export, so `X_Net` is positive while importing. Solar is
/// the other way around: `Solar+` is the production, and `Solar_Net` is positive while producing.
///
/// Earlier pairs take precedence when two of them yield the same net column.
const FLOW_PAIRS: [(&str, &str, &str); 7] = [
    ("_Incoming", "_Outgoing", "_Net"),
    ("_incoming", "_outgoing", "_net"),
    ("_Import", "_Export", "_Net"),
    ("_import", "_export", "_net"),
    ("+", "-", "_net"),
    ("Solar+", "Solar", "Solar_Net"),
    ("", "+", "_Net"),
];

/// Anomaly that was corrected during reconciliation.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ReconcileWarning {
    #[error("counter `{register}` went down from {earlier:?} to {later:?} at {at}, treating it as a reset")]
    CounterReset { register: Register, at: DateTime<Local>, earlier: WattHours, later: WattHours },

    #[error("counter `{register}` has {n_samples} sample(s), no interval can be formed")]
    InsufficientSamples { register: Register, n_samples: usize },
}

#[must_use]
pub struct Reconciliation {
    pub table: Table,
    pub warnings: Vec<ReconcileWarning>,
}

#[must_use]
#[derive(Copy, Clone, Default)]
pub struct Reconciler {
    policy: DeltaPolicy,
}

impl Reconciler {
    pub const fn new(policy: DeltaPolicy) -> Self {
        Self { policy }
    }

    /// Turn raw readings in any order into a chronological table of kilowatts and
    /// per-interval kilowatt-hours.
    #[instrument(skip_all, fields(granularity = %granularity))]
    pub fn reconcile(
        &self,
        readings: impl IntoIterator<Item = Reading>,
        granularity: Granularity,
    ) -> Reconciliation {
        let mut readings: Vec<Reading> = readings.into_iter().collect();
        let n_readings = readings.len();

        // Stable, so the later of two same-timestamp readings still wins below:
        readings.sort_by_key(|reading| reading.timestamp);

        let mut table = Table::new(granularity);
        let mut counters: BTreeMap<Register, BTreeMap<DateTime<Local>, WattHours>> =
            BTreeMap::new();
        for reading in readings {
            match reading.kind {
                ValueKind::InstantPower => {
                    let power = Kilowatts::from(Watts(reading.value));
                    table.insert(reading.timestamp, Column::power(reading.register), power.0);
                }
                ValueKind::IntervalEnergy => {
                    let energy = KilowattHours::from(WattHours(reading.value));
                    table.insert(reading.timestamp, Column::energy(reading.register), energy.0);
                }
                ValueKind::CumulativeEnergy => {
                    counters
                        .entry(reading.register)
                        .or_default()
                        .insert(reading.timestamp, WattHours(reading.value));
                }
            }
        }

        let mut warnings = Vec::new();
        for (register, counter) in counters {
            self.insert_deltas(&mut table, register, &counter, &mut warnings);
        }
        derive_net_flows(&mut table);

        for warning in &warnings {
            warn!("{warning}");
        }
        info!(n_readings, n_rows = table.len(), n_warnings = warnings.len(), "reconciled");
        Reconciliation { table, warnings }
    }

    fn insert_deltas(
        &self,
        table: &mut Table,
        register: Register,
        counter: &BTreeMap<DateTime<Local>, WattHours>,
        warnings: &mut Vec<ReconcileWarning>,
    ) {
        if counter.len() < 2 {
            warnings.push(ReconcileWarning::InsufficientSamples {
                register,
                n_samples: counter.len(),
            });
            return;
        }
        let column = Column::energy(register.clone());
        if self.policy.attribution == Attribution::IntervalEnd {
            table.mark_end_stamped(column.clone());
        }
        for (interval, delta) in counter.iter().map(|(timestamp, value)| (*timestamp, *value)).deltas() {
            let delta = if delta.0 < 0.0 {
                warnings.push(ReconcileWarning::CounterReset {
                    register: register.clone(),
                    at: interval.end,
                    earlier: counter[&interval.start],
                    later: counter[&interval.end],
                });
                match self.policy.on_counter_reset {
                    OnCounterReset::Clamp => WattHours(0.0),
                    OnCounterReset::Drop => continue,
                }
            } else {
                delta
            };
            let timestamp = self.policy.attribution.pick(&interval);
            table.insert(timestamp, column.clone(), KilowattHours::from(delta).0);
        }
    }
}

/// Add `incoming − outgoing` columns for every flow pair present in the table.
///
/// Existing columns are never overwritten.
fn derive_net_flows(table: &mut Table) {
    let columns = table.columns();
    let mut derived: Vec<(Column, Column, Column)> = Vec::new();
    for (incoming_suffix, outgoing_suffix, net_suffix) in FLOW_PAIRS {
        for incoming in &columns {
            let Some(base) = incoming.register.as_str().strip_suffix(incoming_suffix) else {
                continue;
            };
            let outgoing = Column {
                register: Register::from(format!("{base}{outgoing_suffix}")),
                kind: incoming.kind,
            };
            let net = Column {
                register: Register::from(format!("{base}{net_suffix}")),
                kind: incoming.kind,
            };
            if columns.contains(&outgoing)
                && !columns.contains(&net)
                && !derived.iter().any(|(_, _, existing)| *existing == net)
            {
                derived.push((incoming.clone(), outgoing, net));
            }
        }
    }

    for (incoming, outgoing, net) in derived {
        let values: Vec<_> = table
            .rows()
            .filter_map(|(timestamp, row)| {
                Some((timestamp, row.get(&incoming)? - row.get(&outgoing)?))
            })
            .collect();
        debug!(%net, n_values = values.len(), "derived the net flow");
        if table.is_end_stamped(&incoming) {
            table.mark_end_stamped(net.clone());
        }
        for (timestamp, value) in values {
            table.insert(timestamp, net.clone(), value);
        }
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

    fn counter(register: &str, values: &[f64]) -> Vec<Reading> {
        values
            .iter()
            .zip(0..)
            .map(|(value, index)| {
                Reading::new(register.into(), hour(index), *value, ValueKind::CumulativeEnergy)
            })
            .collect()
    }

    fn energy(table: &Table, register: &str) -> Vec<(DateTime<Local>, f64)> {
        table.column(&Column::energy(register)).collect()
    }

    #[test]
    fn test_chronological_regardless_of_input_order() {
        let mut readings = counter("Grid", &[100.0, 250.0, 400.0, 800.0]);
        readings.reverse();
        readings.swap(0, 2);
        let table = Reconciler::default().reconcile(readings, Granularity::Hour).table;
        let timestamps: Vec<_> = table.timestamps().collect();
        assert!(timestamps.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(energy(&table, "Grid").len(), 3);
    }

    #[test]
    fn test_monotonic_counter() {
        let table = Reconciler::default()
            .reconcile(counter("Grid", &[100.0, 250.0, 400.0]), Granularity::Hour)
            .table;
        let deltas = energy(&table, "Grid");
        assert_eq!(deltas.len(), 2);
        assert_eq!(deltas[0].0, hour(0));
        assert_eq!(deltas[1].0, hour(1));
        assert_abs_diff_eq!(deltas[0].1, 0.15);
        assert_abs_diff_eq!(deltas[1].1, 0.15);
    }

    #[test]
    fn test_newest_first_input_gives_positive_deltas() {
        let mut readings = counter("Grid", &[100.0, 250.0, 400.0]);
        readings.reverse();
        let table = Reconciler::default().reconcile(readings, Granularity::Hour).table;
        assert!(energy(&table, "Grid").iter().all(|(_, value)| *value > 0.0));
    }

    #[test]
    fn test_counter_reset_is_clamped() {
        let reconciliation = Reconciler::default()
            .reconcile(counter("Grid", &[400.0, 50.0, 200.0]), Granularity::Hour);
        let deltas = energy(&reconciliation.table, "Grid");
        assert_abs_diff_eq!(deltas[0].1, 0.0);
        assert_abs_diff_eq!(deltas[1].1, 0.15);
        assert!(matches!(
            reconciliation.warnings.as_slice(),
            [ReconcileWarning::CounterReset { .. }]
        ));
    }

    #[test]
    fn test_counter_reset_is_dropped() {
        let policy = DeltaPolicy { on_counter_reset: OnCounterReset::Drop, ..DeltaPolicy::DEFAULT };
        let table = Reconciler::new(policy)
            .reconcile(counter("Grid", &[400.0, 50.0, 200.0]), Granularity::Hour)
            .table;
        assert_eq!(energy(&table, "Grid"), [(hour(1), 0.15)]);
    }

    #[test]
    fn test_interval_end_attribution() {
        let policy = DeltaPolicy { attribution: Attribution::IntervalEnd, ..DeltaPolicy::DEFAULT };
        let table = Reconciler::new(policy)
            .reconcile(counter("Grid", &[100.0, 250.0, 400.0]), Granularity::Hour)
            .table;
        let timestamps: Vec<_> = energy(&table, "Grid").into_iter().map(|(at, _)| at).collect();
        assert_eq!(timestamps, [hour(1), hour(2)]);
    }

    #[test]
    fn test_insufficient_samples() {
        let reconciliation =
            Reconciler::default().reconcile(counter("Solar", &[100.0]), Granularity::Hour);
        assert!(reconciliation.table.is_empty());
        assert_eq!(
            reconciliation.warnings,
            [ReconcileWarning::InsufficientSamples { register: "Solar".into(), n_samples: 1 }]
        );
    }

    #[test]
    fn test_interval_energy_is_only_scaled() {
        let readings = vec![
            Reading::new("Grid".into(), hour(1), 1000.0, ValueKind::IntervalEnergy),
            Reading::new("Grid".into(), hour(0), 2500.0, ValueKind::IntervalEnergy),
        ];
        let table = Reconciler::default().reconcile(readings, Granularity::Day).table;
        assert_eq!(energy(&table, "Grid"), [(hour(0), 2.5), (hour(1), 1.0)]);
    }

    #[test]
    fn test_instant_power_in_kilowatts() {
        let readings = vec![Reading::new("Solar".into(), hour(0), 3250.0, ValueKind::InstantPower)];
        let table = Reconciler::default().reconcile(readings, Granularity::Second).table;
        assert_abs_diff_eq!(table.get(hour(0), &Column::power("Solar")).unwrap(), 3.25);
    }

    #[test]
    fn test_same_timestamp_last_write_wins() {
        let readings = vec![
            Reading::new("Solar".into(), hour(0), 1000.0, ValueKind::InstantPower),
            Reading::new("Solar".into(), hour(0), 2000.0, ValueKind::InstantPower),
        ];
        let table = Reconciler::default().reconcile(readings, Granularity::Second).table;
        assert_eq!(table.len(), 1);
        assert_abs_diff_eq!(table.get(hour(0), &Column::power("Solar")).unwrap(), 2.0);
    }

    #[test]
    fn test_net_flow() {
        let readings = [("grid_import", 5000.0), ("grid_import", 6000.0)]
            .into_iter()
            .chain([("grid_export", 1000.0), ("grid_export", 1000.0)])
            .zip([0, 1, 0, 1])
            .map(|((register, value), index)| {
                Reading::new(register.into(), hour(index), value, ValueKind::IntervalEnergy)
            });
        let table = Reconciler::default().reconcile(readings, Granularity::Hour).table;
        assert_eq!(energy(&table, "grid_net"), [(hour(0), 4.0), (hour(1), 5.0)]);
        assert_eq!(energy(&table, "grid_import"), [(hour(0), 5.0), (hour(1), 6.0)]);
        assert_eq!(energy(&table, "grid_export"), [(hour(0), 1.0), (hour(1), 1.0)]);
    }

    #[test]
    fn test_net_flow_does_not_overwrite_device_register() {
        let readings = vec![
            Reading::new("Grid_Incoming".into(), hour(0), 500.0, ValueKind::InstantPower),
            Reading::new("Grid_Outgoing".into(), hour(0), 200.0, ValueKind::InstantPower),
            Reading::new("Grid_Net".into(), hour(0), 999.0, ValueKind::InstantPower),
        ];
        let table = Reconciler::default().reconcile(readings, Granularity::Second).table;
        assert_abs_diff_eq!(table.get(hour(0), &Column::power("Grid_Net")).unwrap(), 0.999);
    }

    #[test]
    fn test_positive_only_register_pair() {
        let readings = [("Grid", 4000.0), ("Grid+", 1500.0), ("Solar+", 3000.0), ("Solar", 200.0)]
            .into_iter()
            .map(|(register, value)| {
                Reading::new(register.into(), hour(0), value, ValueKind::IntervalEnergy)
            });
        let table = Reconciler::default().reconcile(readings, Granularity::Day).table;
        assert_abs_diff_eq!(table.get(hour(0), &Column::energy("Grid_Net")).unwrap(), 2.5);
        assert_abs_diff_eq!(table.get(hour(0), &Column::energy("Solar_Net")).unwrap(), 2.8);
        assert_eq!(table.columns().len(), 6);
    }

    #[test]
    fn test_net_flow_of_end_stamped_deltas() {
        let policy = DeltaPolicy { attribution: Attribution::IntervalEnd, ..DeltaPolicy::DEFAULT };
        let readings = counter("Grid", &[100.0, 300.0]).into_iter().chain(counter("Grid+", &[50.0, 100.0]));
        let table = Reconciler::new(policy).reconcile(readings, Granularity::Hour).table;
        assert_abs_diff_eq!(table.get(hour(1), &Column::energy("Grid_Net")).unwrap(), 0.15);
        assert!(table.is_end_stamped(&Column::energy("Grid_Net")));
    }

    #[test]
    fn test_empty_input() {
        let reconciliation = Reconciler::default().reconcile(Vec::new(), Granularity::Month);
        assert!(reconciliation.table.is_empty());
        assert!(reconciliation.warnings.is_empty());
    }
}
