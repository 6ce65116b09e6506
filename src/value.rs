//! Value extraction
//!
//! Turns raw statement values into [`ResolvedValue`]s: references stay
//! unresolved ids, everything else becomes display text.

use crate::types::{DataValue, EntityRecord, GlobeCoordinate, ResolvedValue, Statement, TimeValue};

/// Convert a statement value, `None` for kinds we do not render
pub fn extract(value: &DataValue) -> Option<ResolvedValue> {
    match value {
        DataValue::EntityId(entity) => Some(ResolvedValue::reference(entity.id())),
        DataValue::String(text) => Some(ResolvedValue::literal(text.clone())),
        DataValue::Time(time) => format_time(time).map(ResolvedValue::Literal),
        DataValue::GlobeCoordinate(coord) => Some(ResolvedValue::Literal(format_coordinate(coord))),
        DataValue::MonolingualText(_) | DataValue::Quantity(_) | DataValue::Unsupported(_) => None,
    }
}

pub fn extract_statement(statement: &Statement) -> Option<ResolvedValue> {
    statement.value().and_then(extract)
}

/// All extractable values of a property, in statement order
pub fn values_of(record: &EntityRecord, property: &str) -> Vec<ResolvedValue> {
    record
        .statements(property)
        .iter()
        .filter_map(extract_statement)
        .collect()
}

/// `YEAR-MM-DD`; the calendar model is not interpreted
pub fn format_date(year: i64, month: u8, day: u8) -> String {
    format!("{}-{:02}-{:02}", year, month, day)
}

/// `"<latitude>, <longitude>"`
pub fn format_coordinate(coord: &GlobeCoordinate) -> String {
    format!("{:?}, {:?}", coord.latitude, coord.longitude)
}

fn format_time(time: &TimeValue) -> Option<String> {
    let (year, month, day) = parse_time(&time.time)?;
    Some(format_date(year, month, day))
}

/// Split `+YYYY-MM-DDThh:mm:ssZ` into its date components
fn parse_time(raw: &str) -> Option<(i64, u8, u8)> {
    let (negative, rest) = match raw.as_bytes().first()? {
        b'-' => (true, &raw[1..]),
        b'+' => (false, &raw[1..]),
        _ => (false, raw),
    };
    let date = rest.split('T').next()?;
    let mut parts = date.splitn(3, '-');
    let year: i64 = parts.next()?.parse().ok()?;
    let month: u8 = parts.next()?.parse().ok()?;
    let day: u8 = parts.next()?.parse().ok()?;
    Some((if negative { -year } else { year }, month, day))
}
