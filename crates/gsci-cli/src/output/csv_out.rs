use serde_json::{Map, Value};
use std::io;

type StdoutWriter<'a> = csv::Writer<io::StdoutLock<'a>>;

/// Write output as CSV to stdout.
///
/// Row data inside the result (level history, positions, contributions) wins
/// over the two-column field/value layout.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    match value {
        Value::Object(map) => match map.get("result") {
            Some(Value::Object(result)) => write_result_csv(&mut wtr, result),
            _ => write_fields_csv(&mut wtr, map),
        },
        Value::Array(arr) => {
            write_array_csv(&mut wtr, arr);
        }
        _ => {
            let _ = wtr.write_record([&format_csv_value(value)]);
        }
    }

    let _ = wtr.flush();
}

fn write_result_csv(wtr: &mut StdoutWriter<'_>, result: &Map<String, Value>) {
    if let Some(Value::Object(levels)) = result.get("levels") {
        write_levels_csv(wtr, levels);
    } else if let Some(Value::Array(positions)) = result.get("positions") {
        write_array_csv(wtr, positions);
    } else if let Some(Value::Array(rows)) = result
        .get("breakdown")
        .and_then(|b| b.get("contributions"))
    {
        write_array_csv(wtr, rows);
    } else {
        write_fields_csv(wtr, result);
    }
}

/// Long format: variant, date, level, day_return.
fn write_levels_csv(wtr: &mut StdoutWriter<'_>, levels: &Map<String, Value>) {
    let _ = wtr.write_record(["variant", "date", "level", "day_return"]);
    for (variant, history) in levels {
        if let Value::Array(points) = history {
            for p in points {
                let field = |k: &str| p.get(k).map(format_csv_value).unwrap_or_default();
                let _ = wtr.write_record([
                    variant.clone(),
                    field("date"),
                    field("level"),
                    field("day_return"),
                ]);
            }
        }
    }
}

fn write_fields_csv(wtr: &mut StdoutWriter<'_>, map: &Map<String, Value>) {
    let _ = wtr.write_record(["field", "value"]);
    for (key, val) in map {
        let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
    }
}

fn write_array_csv(wtr: &mut StdoutWriter<'_>, arr: &[Value]) {
    if arr.is_empty() {
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
        let _ = wtr.write_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(*h).map(format_csv_value).unwrap_or_default())
                    .collect();
                let _ = wtr.write_record(&row);
            }
        }
    } else {
        for item in arr {
            let _ = wtr.write_record([&format_csv_value(item)]);
        }
    }
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
