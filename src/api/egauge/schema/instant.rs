use chrono::{DateTime, Local};
use roxmltree::Document;

use crate::{
    api::egauge::schema::{child, parse_number, parse_timestamp},
    core::reading::{Reading, ValueKind},
};

/// `<i>` is the present power in watts, `<v>` is the running counter in watt-hours.
///
/// Either of them may be missing. Without a `<ts>` element, the readings are stamped with
/// the response arrival time.
pub fn parse(document: &Document, received_at: DateTime<Local>) -> Vec<Reading> {
    let timestamp = document
        .descendants()
        .find(|node| node.has_tag_name("ts"))
        .and_then(|node| parse_timestamp(node.text()?))
        .unwrap_or(received_at);
    document
        .descendants()
        .filter(|node| node.has_tag_name("r"))
        .filter_map(|register| Some((register.attribute("n")?, register)))
        .flat_map(|(name, register)| {
            [("i", ValueKind::InstantPower), ("v", ValueKind::CumulativeEnergy)]
                .into_iter()
                .filter_map(move |(tag_name, kind)| {
                    let value = parse_number(child(register, tag_name)?);
                    Some(Reading::new(name.into(), timestamp, value, kind))
                })
        })
        .collect()
}
