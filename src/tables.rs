use std::{collections::BTreeMap, fmt::Display};

use chrono::{TimeDelta, Weekday};
use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};

use crate::{
    core::{
        collector::Outcome,
        granularity::Granularity,
        pipeline::Analysis,
        reading::{Reading, Register},
        reconcile::ReconcileWarning,
        table::{Column, ColumnKind, Table as SeriesTable},
    },
    quantity::{
        energy::{KilowattHours, MegawattHours, WattHours},
        power::Kilowatts,
        ratio::Ratio,
    },
    prelude::*,
    statistics::{
        cost::{CostEstimate, Tariff},
        partition::{Partition, PartitionKey},
        resample::Reducer,
        solar::{EnergyBalance, Roles},
        summary::Statistic,
    },
};

const WEEKDAYS: [Weekday; 7] =
    [Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri, Weekday::Sat, Weekday::Sun];

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .apply_modifier(modifiers::UTF8_ROUND_CORNERS)
        .enforce_styling();
    table
}

fn right(content: impl Display) -> Cell {
    Cell::new(content).set_alignment(CellAlignment::Right)
}

/// Which path every series came from, and what had to be corrected in it.
pub fn build_sources_table(
    outcomes: &[(Granularity, Outcome)],
    warnings: &[(Granularity, ReconcileWarning)],
) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Series", "Source", "Counter resets", "Short counters"]);
    for (granularity, outcome) in outcomes {
        let (source, color) = match outcome {
            Outcome::Primary => ("history", Color::Green),
            Outcome::Fallback => ("instant samples", Color::DarkYellow),
            Outcome::Failed => ("unavailable", Color::Red),
        };
        let count = |is_counted: fn(&ReconcileWarning) -> bool| {
            let n_warnings = warnings
                .iter()
                .filter(|(series, warning)| series == granularity && is_counted(warning))
                .count();
            right(n_warnings).fg(if n_warnings == 0 { Color::Reset } else { Color::DarkYellow })
        };
        table.add_row(vec![
            Cell::new(granularity),
            Cell::new(source).fg(color),
            count(|warning| matches!(warning, ReconcileWarning::CounterReset { .. })),
            count(|warning| matches!(warning, ReconcileWarning::InsufficientSamples { .. })),
        ]);
    }
    table
}

/// Present power of every register, followed by the net grid flow.
pub fn build_status_table(current: &SeriesTable, roles: &Roles) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Register", "Power"]);
    let Some(timestamp) = current.timestamps().last() else {
        return table;
    };
    let power = |register: &Register| current.get(timestamp, &Column::power(register.clone()));
    for column in current.columns().into_iter().filter(|column| column.kind == ColumnKind::Power) {
        if let Some(value) = power(&column.register) {
            table.add_row(vec![Cell::new(&column.register), right(Kilowatts::from(value))]);
        }
    }
    if let (Some(import), Some(export)) = (power(&roles.grid_import), power(&roles.grid_export)) {
        let net = Kilowatts::from(import - export);
        table.add_row(vec![
            Cell::new("Net grid").add_attribute(Attribute::Bold),
            right(net).fg(if net > Kilowatts::ZERO { Color::Red } else { Color::Green }),
        ]);
    }
    table
}

/// Lifetime counters.
pub fn build_totals_table(readings: &[Reading]) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Register", "Energy", ""]);
    for reading in readings {
        let energy = KilowattHours::from(WattHours(reading.value));
        table.add_row(vec![
            Cell::new(&reading.register),
            right(energy),
            right(MegawattHours::from(energy)).add_attribute(Attribute::Dim),
        ]);
    }
    table
}

pub fn build_monthly_table(monthly: &SeriesTable, roles: &Roles) -> Table {
    let self_consumption: BTreeMap<_, _> = monthly.self_consumption(roles).into_iter().collect();
    let mut table = new_table();
    table.set_header(vec!["Month", "Solar", "Import", "Export", "Net", "Self-consumption"]);
    for (timestamp, row) in monthly.rows() {
        let energy = |register: &Register| {
            KilowattHours::from(row.get(&Column::energy(register.clone())).copied().unwrap_or_default())
        };
        let balance = EnergyBalance {
            solar: energy(&roles.solar),
            grid_import: energy(&roles.grid_import),
            grid_export: energy(&roles.grid_export),
        };
        let net = balance.net_import();
        table.add_row(vec![
            Cell::new(timestamp.format("%b %Y")),
            right(balance.solar).fg(Color::Yellow),
            right(balance.grid_import),
            right(balance.grid_export),
            right(net).fg(if net > KilowattHours::ZERO { Color::Red } else { Color::Green }),
            ratio_cell(self_consumption.get(&timestamp).copied().unwrap_or(Ratio::ZERO)),
        ]);
    }
    table
}

/// Typical hourly energy on weekdays and weekends.
pub fn build_profile_table(hourly: &SeriesTable, roles: &Roles) -> Table {
    let (weekdays, weekends) = hourly.split_weekend();
    let weekdays = weekdays.group_by(Partition::HourOfDay);
    let weekends = weekends.group_by(Partition::HourOfDay);
    let solar = Column::energy(roles.solar.clone());
    let import = Column::energy(roles.grid_import.clone());

    let mut table = new_table();
    table.set_header(vec![
        "Hour",
        "Solar (weekday)",
        "Solar (weekend)",
        "Import (weekday)",
        "Import (weekend)",
    ]);
    let cell = |value: Option<f64>| {
        right(value.map_or_else(|| "–".to_owned(), |value| KilowattHours::from(value).to_string()))
    };
    for hour in 0..24 {
        let key = PartitionKey::Hour(hour);
        table.add_row(vec![
            Cell::new(key).add_attribute(Attribute::Dim),
            cell(weekdays.get(key, &solar)),
            cell(weekends.get(key, &solar)),
            cell(weekdays.get(key, &import)),
            cell(weekends.get(key, &import)),
        ]);
    }
    table
}

/// Average grid import by day of week and hour of day.
pub fn build_heatmap_table(hourly: &SeriesTable, roles: &Roles) -> Table {
    let profile = hourly.group_by(Partition::DayOfWeekHour);
    let import = Column::energy(roles.grid_import.clone());
    let mean = profile
        .rows()
        .filter_map(|(_, row)| row.get(&import).copied())
        .collect::<average::Mean>()
        .mean();

    let mut table = new_table();
    table.set_header(
        std::iter::once(Cell::new("Hour")).chain(WEEKDAYS.map(Cell::new)).collect::<Vec<_>>(),
    );
    for hour in 0..24 {
        let mut cells = vec![Cell::new(PartitionKey::Hour(hour)).add_attribute(Attribute::Dim)];
        for weekday in WEEKDAYS {
            cells.push(match profile.get(PartitionKey::DayOfWeekHour(weekday, hour), &import) {
                Some(value) => right(format!("{value:.2}"))
                    .fg(if value > mean { Color::Red } else { Color::Reset }),
                None => right("–"),
            });
        }
        table.add_row(cells);
    }
    table
}

/// Average daily energy per day of week, followed by weekdays against weekends.
pub fn build_weekday_table(daily: &SeriesTable, roles: &Roles) -> Table {
    let solar = Column::energy(roles.solar.clone());
    let import = Column::energy(roles.grid_import.clone());
    let mut table = new_table();
    table.set_header(vec!["Day", "Solar", "Import"]);
    for partition in [Partition::DayOfWeek, Partition::Weekend] {
        for (key, row) in daily.group_by(partition).rows() {
            let cell = |column: &Column| {
                right(row.get(column).map_or_else(|| "–".to_owned(), |value| KilowattHours::from(*value).to_string()))
            };
            let label = Cell::new(key);
            table.add_row(vec![
                if partition == Partition::Weekend { label.add_attribute(Attribute::Bold) } else { label },
                cell(&solar),
                cell(&import),
            ]);
        }
    }
    table
}

/// Totals over the monthly window and the extremes of the finer series.
pub fn build_summary_table(analysis: &Analysis, roles: &Roles) -> Result<Table> {
    let balance = EnergyBalance::of(&analysis.monthly, roles);
    let solar = Column::energy(roles.solar.clone());
    let import = Column::energy(roles.grid_import.clone());

    let mut table = new_table();
    table.set_header(vec!["Metric", "Value", "When"]);
    let mut add = |metric: &str, value: String, when: String| {
        table.add_row(vec![Cell::new(metric), right(value), Cell::new(when).add_attribute(Attribute::Dim)]);
    };
    add("Solar production", balance.solar.to_string(), String::new());
    add("Grid import", balance.grid_import.to_string(), String::new());
    add("Grid export", balance.grid_export.to_string(), String::new());
    add("Consumption", balance.consumption().to_string(), String::new());
    add("Self-consumption", balance.self_consumption().to_string(), String::new());
    add("Solar offset", balance.solar_offset().to_string(), String::new());

    let daily_solar = analysis.daily.summarize(&solar);
    add("Average daily solar", KilowattHours::from(daily_solar.mean).to_string(), String::new());
    if let Some(peak) = daily_solar.peak {
        add("Best solar day", KilowattHours::from(peak.value).to_string(), peak.timestamp.format("%b %d, %Y").to_string());
    }
    if let Some(peak) = analysis.hourly.summarize(&import).peak {
        add(
            "Peak hourly import",
            (KilowattHours::from(peak.value) / TimeDelta::hours(1)).to_string(),
            peak.timestamp.format("%b %d, %H:%M").to_string(),
        );
    }
    if let Some(peak) = analysis.monthly.summarize(&solar).peak {
        add("Best solar month", KilowattHours::from(peak.value).to_string(), peak.timestamp.format("%b %Y").to_string());
    }

    // Highest and lowest hour of every day:
    let hourly_import = |reducer: Reducer, statistic: Statistic| -> Result<KilowattHours> {
        let daily = analysis.hourly.resample_with(Granularity::Day, |_| reducer)?;
        Ok(KilowattHours::from(daily.statistic(&import, statistic)?))
    };
    if !analysis.hourly.is_empty() {
        let hour = TimeDelta::hours(1);
        add("Typical daily peak import", (hourly_import(Reducer::Max, Statistic::Mean)? / hour).to_string(), String::new());
        add("Highest daily peak import", (hourly_import(Reducer::Max, Statistic::Max)? / hour).to_string(), String::new());
        add("Typical base load import", (hourly_import(Reducer::Min, Statistic::Mean)? / hour).to_string(), String::new());
        add("Lowest base load import", (hourly_import(Reducer::Min, Statistic::Min)? / hour).to_string(), String::new());
    }

    let directions = analysis.monthly.net_directions(roles);
    add("Net-importing months", directions.importing.to_string(), String::new());
    add("Net-exporting months", directions.exporting.to_string(), String::new());
    Ok(table)
}

pub fn build_cost_table(estimate: &CostEstimate, tariff: &Tariff) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Item", "Amount", "Rate"]);
    table.add_row(vec![
        Cell::new("Grid import"),
        right(estimate.import_cost).fg(Color::Red),
        right(tariff.import_rate).add_attribute(Attribute::Dim),
    ]);
    table.add_row(vec![
        Cell::new("Export revenue"),
        right(estimate.export_revenue).fg(Color::Green),
        right(tariff.export_rate).add_attribute(Attribute::Dim),
    ]);
    table.add_row(vec![
        Cell::new("Self-consumption savings"),
        right(estimate.self_consumption_savings).fg(Color::Green),
        right(tariff.import_rate).add_attribute(Attribute::Dim),
    ]);
    table.add_row(vec![
        Cell::new("Net cost").add_attribute(Attribute::Bold),
        right(estimate.net_cost()).add_attribute(Attribute::Bold),
        Cell::new(""),
    ]);
    table.add_row(vec![
        Cell::new("Solar benefit"),
        right(estimate.total_benefit()).fg(Color::Green),
        Cell::new(""),
    ]);
    table.add_row(vec![
        Cell::new("Without solar").add_attribute(Attribute::Dim),
        right(estimate.cost_without_solar()).add_attribute(Attribute::Dim),
        Cell::new(""),
    ]);
    table
}

/// Share as a cell, yellowish when less than a half.
fn ratio_cell(ratio: Ratio) -> Cell {
    right(ratio).fg(if ratio.0 < 0.5 { Color::DarkYellow } else { Color::Green })
}

#[cfg(test)]
mod tests {
    use chrono::{Local, TimeZone};

    use super::*;
    use crate::core::table::Table as SeriesTable;

    fn analysis(hourly: SeriesTable) -> Analysis {
        Analysis {
            monthly: SeriesTable::new(Granularity::Month),
            daily: SeriesTable::new(Granularity::Day),
            hourly,
            current: SeriesTable::new(Granularity::Second),
            outcomes: Vec::new(),
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_summary_of_empty_analysis() -> Result {
        let table = build_summary_table(&analysis(SeriesTable::new(Granularity::Hour)), &Roles::default())?;
        assert_eq!(table.row_count(), 9);
        Ok(())
    }

    #[test]
    fn test_summary_with_daily_peaks() -> Result {
        let mut hourly = SeriesTable::new(Granularity::Hour);
        let start = Local.with_ymd_and_hms(2025, 6, 11, 0, 0, 0).unwrap();
        for (hour, energy) in [(0, 0.2), (1, 1.4), (2, 0.3)] {
            hourly.insert(start + TimeDelta::hours(hour), Column::energy("Grid_Incoming"), energy);
        }
        let table = build_summary_table(&analysis(hourly), &Roles::default())?;
        assert_eq!(table.row_count(), 14);
        let value = |index: usize| table.row(index).and_then(|row| row.cell_iter().nth(1)).map(Cell::content);
        assert_eq!(value(8).as_deref(), Some("1.40 kW"));
        assert_eq!(value(10).as_deref(), Some("0.20 kW"));
        Ok(())
    }
}
