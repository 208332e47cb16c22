use serde_json::{Map, Value};
use std::io;

/// Row series emitted as the CSV body, in order of preference.
const SERIES_KEYS: [&str; 4] = ["cashflows", "levered_cashflows", "results", "checks"];

/// Write output as CSV to stdout. Row series become one line per row;
/// anything else is written as field,value pairs.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    match value {
        Value::Object(map) => {
            let body = map
                .get("result")
                .and_then(Value::as_object)
                .unwrap_or(map);
            match find_series(body).or_else(|| find_series(map)) {
                Some(rows) => write_array_csv(&mut wtr, rows),
                None => write_pairs(&mut wtr, body),
            }
        }
        Value::Array(arr) => write_array_csv(&mut wtr, arr),
        _ => {
            let _ = wtr.write_record([&format_csv_value(value)]);
        }
    }

    let _ = wtr.flush();
}

fn find_series(map: &Map<String, Value>) -> Option<&[Value]> {
    SERIES_KEYS
        .iter()
        .find_map(|k| map.get(*k).and_then(Value::as_array))
        .map(Vec::as_slice)
}

fn write_pairs<W: io::Write>(wtr: &mut csv::Writer<W>, map: &Map<String, Value>) {
    let _ = wtr.write_record(["field", "value"]);
    for (key, val) in map {
        let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
    }
}

fn write_array_csv<W: io::Write>(wtr: &mut csv::Writer<W>, arr: &[Value]) {
    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
        let _ = wtr.write_record(&headers);

        for map in arr.iter().filter_map(Value::as_object) {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(*h).map(format_csv_value).unwrap_or_default())
                .collect();
            let _ = wtr.write_record(&row);
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
        Value::Object(map) => match super::tagged_scalar(map) {
            Some(inner) => format_csv_value(inner),
            None => serde_json::to_string(value).unwrap_or_default(),
        },
        Value::Array(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
