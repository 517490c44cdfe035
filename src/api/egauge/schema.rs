//! Decoding of the response variants that eGauge firmware versions are known to return.

mod column_table;
mod grouped;
mod instant;

use std::fmt::{Display, Formatter};

use chrono::{DateTime, Local};
use roxmltree::{Document, Node, ParsingOptions};

use crate::{
    api::egauge::{Payload, ParseError},
    core::{granularity::Granularity, reading::Reading},
    prelude::*,
};

/// Response layout, detected from marker elements.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Schema {
    /// `<cname>` declarations followed by `<r><c>…</c></r>` rows.
    ColumnTable,

    /// Repeated `<group>` elements, each with its own `<timestamp>` and named `<data>`.
    Grouped,

    /// Flat list of `<r n="…">` registers with `<i>` and `<v>` sub-elements.
    Instant,
}

impl Schema {
    pub fn detect(document: &Document) -> Result<Self, ParseError> {
        // Historical responses wrap the column table into a `<group>` envelope as well,
        // so only a group with its own timestamp marks the grouped variant:
        if document.descendants().any(|node| node.has_tag_name("group") && child(node, "timestamp").is_some()) {
            Ok(Self::Grouped)
        } else if document.descendants().any(|node| node.has_tag_name("cname")) {
            Ok(Self::ColumnTable)
        } else if document.descendants().any(|node| node.has_tag_name("r") && node.has_attribute("n")) {
            Ok(Self::Instant)
        } else {
            Err(ParseError::UnknownSchema {
                root: document.root_element().tag_name().name().to_owned(),
            })
        }
    }
}

impl Display for Schema {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::ColumnTable => "column table",
            Self::Grouped => "grouped",
            Self::Instant => "instant",
        })
    }
}

/// Decode the payload into readings, ordered by timestamp and then by register.
///
/// The granularity is needed to tell per-interval energy from running counters in the grouped
/// variant, and as the default row spacing of the column table.
#[instrument(skip_all, fields(granularity = %granularity))]
pub fn parse(payload: &Payload, granularity: Granularity) -> Result<Vec<Reading>, ParseError> {
    // Historical responses declare a DTD:
    let options = ParsingOptions { allow_dtd: true, ..ParsingOptions::default() };
    let document = Document::parse_with_options(&payload.body, options)?;
    let schema = Schema::detect(&document)?;
    let mut readings = match schema {
        Schema::ColumnTable => column_table::parse(&document, granularity),
        Schema::Grouped => grouped::parse(&document, granularity),
        Schema::Instant => instant::parse(&document, payload.received_at),
    };
    readings.sort_by(|lhs, rhs| {
        lhs.timestamp.cmp(&rhs.timestamp).then_with(|| lhs.register.cmp(&rhs.register))
    });
    info!(%schema, n_readings = readings.len(), "parsed");
    Ok(readings)
}

/// Parse a cell value, falling back to zero so that one bad cell never spoils the response.
fn parse_number(node: Node) -> f64 {
    let text = node.text().unwrap_or_default().trim();
    match text.parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => {
            warn!(element = node.tag_name().name(), text, "unparsable value, using zero");
            0.0
        }
    }
}

/// Parse a Unix timestamp, either decimal or `0x`-prefixed hexadecimal.
fn parse_timestamp(text: &str) -> Option<DateTime<Local>> {
    let text = text.trim();
    let seconds = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16).ok()?,
        None => text.parse().ok()?,
    };
    Some(DateTime::from_timestamp(seconds, 0)?.with_timezone(&Local))
}

fn child<'a, 'input>(node: Node<'a, 'input>, tag_name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|child| child.has_tag_name(tag_name))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::core::reading::ValueKind;

    pub fn payload(body: &str) -> Payload {
        Payload::new(body.to_owned(), Local.timestamp_opt(1_750_000_000, 0).unwrap())
    }

    pub fn at(seconds: i64) -> DateTime<Local> {
        Local.timestamp_opt(seconds, 0).unwrap()
    }

    #[test]
    fn test_detect() -> Result {
        // language=XML
        let grouped = r#"<group><timestamp>1</timestamp><data><cname>Grid</cname></data></group>"#;
        assert_eq!(Schema::detect(&Document::parse(grouped)?)?, Schema::Grouped);

        // language=XML
        let envelope = r#"<group serial="0x1"><data><cname did="0">Grid</cname><r><c>1</c></r></data></group>"#;
        assert_eq!(Schema::detect(&Document::parse(envelope)?)?, Schema::ColumnTable);

        // language=XML
        let column_table = r#"<root><data><cname did="0">Grid</cname><r><c>1</c></r></data></root>"#;
        assert_eq!(Schema::detect(&Document::parse(column_table)?)?, Schema::ColumnTable);

        // language=XML
        let instant = r#"<data><r n="Grid"><i>1</i></r></data>"#;
        assert_eq!(Schema::detect(&Document::parse(instant)?)?, Schema::Instant);
        Ok(())
    }

    #[test]
    fn test_unknown_schema() {
        // language=XML
        let result = parse(&payload("<html><body>Not found</body></html>"), Granularity::Hour);
        assert!(matches!(result, Err(ParseError::UnknownSchema { root }) if root == "html"));
    }

    #[test]
    fn test_malformed() {
        let result = parse(&payload("<data><r n=\"Grid\">"), Granularity::Hour);
        assert!(matches!(result, Err(ParseError::Malformed(_))));
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("0x684a1f00"), Some(at(0x684a_1f00)));
        assert_eq!(parse_timestamp(" 1749688064 "), Some(at(1_749_688_064)));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    /// The same two counters at the same moment, as each variant reports them.
    #[test]
    fn test_schema_agnostic() -> Result {
        // language=XML
        let column_table = r#"
            <root>
                <data time_stamp="0x684a1f00" time_delta="3600">
                    <cname did="0">Grid</cname>
                    <cname did="1">Solar</cname>
                    <r><c>400</c><c>90</c></r>
                </data>
            </root>
        "#;
        // language=XML
        let grouped = r#"
            <groups>
                <group>
                    <timestamp>1749688064</timestamp>
                    <data><cname>Solar</cname><column>90</column></data>
                    <data><cname>Grid</cname><column>400</column></data>
                </group>
            </groups>
        "#;
        // language=XML
        let instant = r#"
            <data serial="0x1">
                <ts>1749688064</ts>
                <r n="Grid"><v>400</v></r>
                <r n="Solar"><v>90</v></r>
            </data>
        "#;

        let expected = vec![
            Reading::new("Grid".into(), at(1_749_688_064), 400.0, ValueKind::CumulativeEnergy),
            Reading::new("Solar".into(), at(1_749_688_064), 90.0, ValueKind::CumulativeEnergy),
        ];
        assert_eq!(parse(&payload(column_table), Granularity::Hour)?, expected);
        assert_eq!(parse(&payload(grouped), Granularity::Hour)?, expected);
        assert_eq!(parse(&payload(instant), Granularity::Hour)?, expected);
        Ok(())
    }
}
