//! Decoder-side view of a payload: one flat row per participant.
//!
//! Mirrors the analysis pipeline that consumes the handoff: array fields are
//! joined with `|`, timing is spread over three columns and every rating
//! becomes a `<dv>_<category>` column, both axes sorted.

use indexmap::IndexMap;
use serde_json::Value;
use study_core::StudyError;

use crate::codec::decode_json;

/// Columns every row carries, in output order.
pub const FIXED_COLUMNS: [&str; 9] = [
    "pid",
    "cond",
    "dvOrder",
    "block1_order",
    "block2_order",
    "completed",
    "timing_total_ms",
    "timing_block1_ms",
    "timing_block2_ms",
];

/// One flattened participant, keyed by column name in output order.
pub type FlatRow = IndexMap<String, Value>;

/// Flattens a decoded payload into [`FIXED_COLUMNS`] followed by the sorted
/// rating columns. Missing fields fall back to empty strings, empty lists and
/// `false`.
pub fn flatten_payload(payload: &Value) -> FlatRow {
    let mut row = IndexMap::new();
    let text = |key: &str| {
        payload
            .get(key)
            .map(cell_to_string)
            .map_or(Value::String(String::new()), Value::String)
    };
    let joined = |key: &str| {
        let parts: Vec<String> = payload
            .get(key)
            .and_then(Value::as_array)
            .map(|items| items.iter().map(cell_to_string).collect())
            .unwrap_or_default();
        Value::String(parts.join("|"))
    };
    let timing = |key: &str| {
        payload
            .get("timing")
            .and_then(|timing| timing.get(key))
            .cloned()
            .unwrap_or(Value::from(0))
    };

    row.insert("pid".to_string(), text("pid"));
    row.insert("cond".to_string(), text("cond"));
    row.insert("dvOrder".to_string(), joined("dvOrder"));
    row.insert("block1_order".to_string(), joined("block1CategoryOrder"));
    row.insert("block2_order".to_string(), joined("block2CategoryOrder"));
    row.insert(
        "completed".to_string(),
        Value::Bool(payload.get("completed").and_then(Value::as_bool).unwrap_or(false)),
    );
    row.insert("timing_total_ms".to_string(), timing("totalMs"));
    row.insert("timing_block1_ms".to_string(), timing("block1Ms"));
    row.insert("timing_block2_ms".to_string(), timing("block2Ms"));

    if let Some(ratings) = payload.get("ratings").and_then(Value::as_object) {
        let mut dv_ids: Vec<&String> = ratings.keys().collect();
        dv_ids.sort();
        for dv in dv_ids {
            let Some(bucket) = ratings.get(dv).and_then(Value::as_object) else {
                continue;
            };
            let mut categories: Vec<&String> = bucket.keys().collect();
            categories.sort();
            for category in categories {
                if let Some(value) = bucket.get(category) {
                    row.insert(format!("{dv}_{category}"), value.clone());
                }
            }
        }
    }
    row
}

/// Decodes a Base64 payload and flattens it.
pub fn flatten_encoded(encoded: &str) -> Result<FlatRow, StudyError> {
    let payload: Value = decode_json(encoded)?;
    Ok(flatten_payload(&payload))
}

/// Text of a cell as written to CSV; null is empty.
pub fn cell_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
