use serde_json::{Map, Value};

/// Print just the key answer value from the output.
///
/// A full index run prints the last level of each variant. Otherwise look for
/// well-known result fields in order of priority, then fall back to the first
/// field in the result object.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    let priority_keys = [
        "level",
        "day_return",
        "excess_return",
        "invested_notional",
        "weight_sum",
        "final_weights",
    ];

    if let Value::Object(map) = result_obj {
        if let Some(Value::Object(levels)) = map.get("levels") {
            println!("{}", last_levels(levels));
            return;
        }

        for key in &priority_keys {
            if let Some(val) = map.get(*key) {
                if !val.is_null() {
                    println!("{}", format_minimal(val));
                    return;
                }
            }
        }

        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_minimal(val));
            return;
        }
    }

    println!("{}", format_minimal(result_obj));
}

/// "excess=103.75 total=103.76"
fn last_levels(levels: &Map<String, Value>) -> String {
    levels
        .iter()
        .filter_map(|(variant, history)| {
            let last = history.as_array()?.last()?.get("level")?;
            Some(format!("{variant}={}", format_minimal(last)))
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
