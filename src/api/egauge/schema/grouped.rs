use roxmltree::Document;

use crate::{
    api::egauge::schema::{child, parse_number, parse_timestamp},
    core::{
        granularity::Granularity,
        reading::{Reading, ValueKind},
    },
    prelude::*,
};

/// Values are the energy of each interval for daily and monthly queries,
/// and running counters for the finer ones.
pub fn parse(document: &Document, granularity: Granularity) -> Vec<Reading> {
    let kind = if granularity.is_calendar() {
        ValueKind::IntervalEnergy
    } else {
        ValueKind::CumulativeEnergy
    };
    let mut readings = Vec::new();
    for group in document.descendants().filter(|node| node.has_tag_name("group")) {
        let Some(timestamp) =
            child(group, "timestamp").and_then(|node| parse_timestamp(node.text()?))
        else {
            warn!("the group has no valid timestamp, skipping");
            continue;
        };
        for data in group.children().filter(|node| node.has_tag_name("data")) {
            let Some(name) = child(data, "cname")
                .and_then(|node| node.text())
                .map(str::trim)
                .filter(|name| !name.is_empty())
            else {
                debug!(%timestamp, "unnamed data element, skipping");
                continue;
            };
            // The last non-empty column wins:
            let Some(column) = data
                .descendants()
                .filter(|node| node.has_tag_name("column") && node.text().is_some_and(|text| !text.trim().is_empty()))
                .last()
            else {
                debug!(%timestamp, name, "no value, skipping");
                continue;
            };
            readings.push(Reading::new(name.into(), timestamp, parse_number(column), kind));
        }
    }
    readings
}
