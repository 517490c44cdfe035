use std::collections::{BTreeMap, HashMap};

use chrono::TimeDelta;
use roxmltree::{Document, Node};

use crate::{
    api::egauge::schema::{child, parse_number, parse_timestamp},
    core::{
        granularity::Granularity,
        reading::{Reading, ValueKind},
    },
    prelude::*,
};

/// Column names declared by `<cname>` elements.
struct Columns<'a> {
    /// By the `did` attribute, or by the declaration order when the attribute is missing.
    by_position: BTreeMap<usize, &'a str>,

    /// By the `t` or `did` attribute, for cells that refer to their column with `r`.
    by_reference: HashMap<&'a str, &'a str>,
}

impl<'a> Columns<'a> {
    fn declared_in(scope: Node<'a, '_>) -> Self {
        let mut by_position = BTreeMap::new();
        let mut by_reference = HashMap::new();
        for (index, cname) in scope.descendants().filter(|node| node.has_tag_name("cname")).enumerate() {
            let name = cname.text().unwrap_or_default().trim();
            let position = cname.attribute("did").and_then(|did| did.parse().ok()).unwrap_or(index);
            by_position.insert(position, name);
            for reference in [cname.attribute("t"), cname.attribute("did")].into_iter().flatten() {
                by_reference.insert(reference, name);
            }
        }
        Self { by_position, by_reference }
    }

    fn is_empty(&self) -> bool {
        self.by_position.is_empty()
    }

    fn resolve(&self, position: usize, cell: Node) -> Option<&'a str> {
        match cell.attribute("r") {
            Some(reference) => self.by_reference.get(reference).copied(),
            None => self.by_position.get(&position).copied(),
        }
    }
}

/// All cells are running counters.
pub fn parse(document: &Document, granularity: Granularity) -> Vec<Reading> {
    let document_columns = Columns::declared_in(document.root_element());
    let blocks: Vec<_> = document
        .descendants()
        .filter(|node| node.has_tag_name("data") && child(*node, "r").is_some())
        .collect();
    if blocks.is_empty() {
        // Older firmware puts the rows right under the root:
        return parse_block(document.root_element(), &document_columns, granularity);
    }
    blocks
        .into_iter()
        .flat_map(|block| {
            let block_columns = Columns::declared_in(block);
            let columns = if block_columns.is_empty() { &document_columns } else { &block_columns };
            parse_block(block, columns, granularity)
        })
        .collect()
}

/// Parse the rows of one block, which are listed newest first.
fn parse_block(block: Node, columns: &Columns, granularity: Granularity) -> Vec<Reading> {
    let newest = block.attribute("time_stamp").and_then(parse_timestamp);
    let step = block
        .attribute("time_delta")
        .and_then(|delta| delta.trim().parse().ok())
        .and_then(TimeDelta::try_seconds)
        .unwrap_or_else(|| granularity.nominal_duration());

    let mut readings = Vec::new();
    for (index, row) in block.children().filter(|node| node.has_tag_name("r")).enumerate() {
        let timestamp = child(row, "t")
            .and_then(|t| parse_timestamp(t.text()?))
            .or_else(|| newest?.checked_sub_signed(step * i32::try_from(index).ok()?));
        let Some(timestamp) = timestamp else {
            warn!(index, "the row has no timestamp, skipping");
            continue;
        };
        for (position, cell) in row.children().filter(|node| node.has_tag_name("c")).enumerate() {
            let Some(name) = columns.resolve(position, cell) else {
                debug!(index, position, "undeclared column, skipping the cell");
                continue;
            };
            readings.push(Reading::new(
                name.into(),
                timestamp,
                parse_number(cell),
                ValueKind::CumulativeEnergy,
            ));
        }
    }
    readings
}
