use chrono::NaiveDate;

use crate::config::{
    GEO_TYPE_AREA, SIGNAL_SEGMENT, SIGNAL_SOURCE, SIGNAL_SOURCE_TYPE, TIMEFRAME_QOQ,
};
use crate::types::SignalType;

/// Joins the sorted `name:value` pairs of a composite key. Part of the
/// persisted identity — changing it (or the attribute set below) orphans
/// every existing signal row and is a migration, not a refactor.
const KEY_DELIMITER: &str = "|";

/// Deterministic composite key: attributes sorted lexicographically by
/// name, concatenated as `name:value` pairs. Insertion order never leaks
/// into the result.
pub fn composite_key(attrs: &[(&str, &str)]) -> String {
    let mut sorted: Vec<(&str, &str)> = attrs.to_vec();
    sorted.sort_by_key(|(name, _)| *name);
    sorted
        .iter()
        .map(|(name, value)| format!("{name}:{value}"))
        .collect::<Vec<_>>()
        .join(KEY_DELIMITER)
}

/// The natural key for one signal: fixed attribute set plus an anchor —
/// the end date of the current quarter window — so each (type, area,
/// quarter) maps to exactly one row across re-runs.
pub fn signal_key(signal_type: SignalType, area: &str, anchor: NaiveDate) -> String {
    let type_tag = signal_type.to_string();
    let anchor_tag = anchor.to_string();
    composite_key(&[
        ("source_type", SIGNAL_SOURCE_TYPE),
        ("source", SIGNAL_SOURCE),
        ("type", &type_tag),
        ("geo_type", GEO_TYPE_AREA),
        ("geo_id", area),
        ("segment", SIGNAL_SEGMENT),
        ("timeframe", TIMEFRAME_QOQ),
        ("anchor", &anchor_tag),
    ])
}
