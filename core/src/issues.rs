//! Human-readable messages from a rejected store request.

use serde_json::Value;

/// Combine the server's error message with its per-field issues.
///
/// `issues` is expected to map field names to either one issue string or a
/// list of them. Every issue becomes a `` `field`: issue `` fragment. The
/// fragments are sorted so the output does not depend on map order, then
/// appended to `message` in parentheses. When `issues` is not an object, or
/// is an empty one, `message` is returned unchanged.
pub fn store_instance_error_message(message: &str, issues: &Value) -> String {
    let fields = match issues {
        Value::Object(fields) if !fields.is_empty() => fields,
        _ => return message.to_string(),
    };

    let mut parts = Vec::new();
    for (field, issue) in fields {
        match issue {
            Value::String(text) => parts.push(format!("`{field}`: {text}")),
            Value::Array(items) => {
                for item in items {
                    parts.push(format!("`{field}`: {}", issue_text(item)));
                }
            }
            _ => {}
        }
    }
    parts.sort();

    format!("{message} ({})", parts.join(", "))
}

/// Plain-text rendering of one list entry. Strings are used as-is; other
/// values render as `<nil>`, `[a b]`, `map[k:v]` (sorted keys) and
/// `%g`-style numbers.
fn issue_text(item: &Value) -> String {
    match item {
        Value::Null => "<nil>".to_string(),
        Value::Bool(flag) => flag.to_string(),
        // Every JSON number is rendered as a double.
        Value::Number(number) => number
            .as_f64()
            .map(float_text)
            .unwrap_or_else(|| number.to_string()),
        Value::String(text) => text.clone(),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(issue_text).collect();
            format!("[{}]", items.join(" "))
        }
        Value::Object(fields) => {
            let mut entries: Vec<(&String, &Value)> = fields.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let entries: Vec<String> = entries
                .into_iter()
                .map(|(key, value)| format!("{key}:{}", issue_text(value)))
                .collect();
            format!("map[{}]", entries.join(" "))
        }
    }
}

/// Shortest round-trip digits, switching to an exponent (at least two
/// digits) below 1e-4 and from 1e6 up.
fn float_text(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude == 0.0 || (1e-4..1e6).contains(&magnitude) {
        return format!("{value}");
    }
    let scientific = format!("{value:e}");
    match scientific.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => scientific,
    }
}
