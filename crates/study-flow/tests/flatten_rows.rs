use serde_json::{json, Value};
use study_flow::{cell_to_string, encode_json, flatten_encoded, flatten_payload, FIXED_COLUMNS};

#[test]
fn payload_flattens_into_sorted_columns() {
    let payload = json!({
        "pid": "P001",
        "cond": "0,3",
        "dvOrder": ["trendy", "appropriateness"],
        "block1CategoryOrder": ["snacks", "airlines"],
        "block2CategoryOrder": ["airlines", "snacks"],
        "ratings": {
            "trendy": { "snacks": 5, "airlines": 2 },
            "appropriateness": { "snacks": 7, "airlines": 1 }
        },
        "timing": { "totalMs": 120000, "block1Ms": 40000, "block2Ms": 35000 },
        "completed": true
    });
    let row = flatten_payload(&payload);
    let columns: Vec<&str> = row.keys().map(String::as_str).collect();
    assert_eq!(&columns[..FIXED_COLUMNS.len()], &FIXED_COLUMNS[..]);
    assert_eq!(
        &columns[FIXED_COLUMNS.len()..],
        &[
            "appropriateness_airlines",
            "appropriateness_snacks",
            "trendy_airlines",
            "trendy_snacks"
        ]
    );
    assert_eq!(row["dvOrder"], "trendy|appropriateness");
    assert_eq!(row["block1_order"], "snacks|airlines");
    assert_eq!(row["timing_block2_ms"], 35000);
    assert_eq!(row["trendy_snacks"], 5);
    assert_eq!(row["completed"], true);
}

#[test]
fn missing_fields_take_decoder_defaults() {
    let row = flatten_payload(&json!({ "pid": "P2" }));
    assert_eq!(row.len(), FIXED_COLUMNS.len());
    assert_eq!(row["cond"], "");
    assert_eq!(row["dvOrder"], "");
    assert_eq!(row["completed"], false);
    assert_eq!(row["timing_total_ms"], 0);
}

#[test]
fn encoded_payloads_flatten_directly() {
    let encoded = encode_json(&json!({ "pid": "Zoë", "ratings": { "x": { "b": 1, "a": 2 } } })).unwrap();
    let row = flatten_encoded(&encoded).unwrap();
    assert_eq!(row["pid"], "Zoë");
    let tail: Vec<&String> = row.keys().skip(FIXED_COLUMNS.len()).collect();
    assert_eq!(tail, vec!["x_a", "x_b"]);
}

#[test]
fn cells_render_as_plain_text() {
    assert_eq!(cell_to_string(&Value::Null), "");
    assert_eq!(cell_to_string(&json!("a|b")), "a|b");
    assert_eq!(cell_to_string(&json!(42)), "42");
    assert_eq!(cell_to_string(&json!(true)), "true");
}
