use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

/// Result fields holding row data, printed as their own tables.
const ROW_FIELDS: [&str; 4] = ["positions", "sector_breakdown", "contributions", "weights"];

/// Format output as tables using the tabled crate.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result_table(result, map);
            } else {
                print_flat_object(map);
            }
        }
        Value::Array(arr) => {
            print_array_table(arr);
        }
        _ => {
            println!("{}", value);
        }
    }
}

fn print_result_table(result: &Value, envelope: &Map<String, Value>) {
    if let Value::Object(res_map) = result {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in res_map {
            if ROW_FIELDS.contains(&key.as_str()) || key == "levels" || key == "breakdown" {
                continue;
            }
            builder.push_record([key.as_str(), &format_value(val)]);
        }
        println!("{}", Table::from(builder));

        if let Some(Value::Object(levels)) = res_map.get("levels") {
            println!("\nLevels:");
            print_level_history(levels);
        }
        if let Some(Value::Object(breakdown)) = res_map.get("breakdown") {
            if let Some(Value::Array(rows)) = breakdown.get("contributions") {
                println!("\nContributions:");
                print_array_table(rows);
            }
        }
        for key in ROW_FIELDS {
            if let Some(Value::Array(rows)) = res_map.get(key) {
                println!("\n{}:", heading(key));
                print_array_table(rows);
            }
        }
    } else {
        print_flat_object(envelope);
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

/// Pivot `variant -> [{date, level, ..}]` into one row per date.
fn print_level_history(levels: &Map<String, Value>) {
    let variants: Vec<&String> = levels.keys().collect();
    let mut rows: BTreeMap<String, BTreeMap<&str, String>> = BTreeMap::new();
    for (variant, history) in levels {
        if let Value::Array(points) = history {
            for p in points {
                let date = p.get("date").map(format_value).unwrap_or_default();
                let level = p.get("level").map(format_value).unwrap_or_default();
                rows.entry(date).or_default().insert(variant.as_str(), level);
            }
        }
    }

    let mut builder = Builder::default();
    let mut header = vec!["date".to_string()];
    header.extend(variants.iter().map(|v| v.to_string()));
    builder.push_record(header);
    for (date, by_variant) in rows {
        let mut record = vec![date];
        record.extend(
            variants
                .iter()
                .map(|v| by_variant.get(v.as_str()).cloned().unwrap_or_default()),
        );
        builder.push_record(record);
    }
    println!("{}", Table::from(builder));
}

fn print_flat_object(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        builder.push_record([key.as_str(), &format_value(val)]);
    }
    println!("{}", Table::from(builder));
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }

        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}

fn heading(key: &str) -> String {
    let mut out = key.replace('_', " ");
    if let Some(first) = out.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    out
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(map) => {
            // flat weight maps read better as "CL=0.5 NG=0.3"
            if map.values().all(|v| !v.is_object() && !v.is_array()) {
                map.iter()
                    .map(|(k, v)| format!("{k}={}", format_value(v)))
                    .collect::<Vec<_>>()
                    .join(" ")
            } else {
                serde_json::to_string(value).unwrap_or_default()
            }
        }
    }
}
