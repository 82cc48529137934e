//! Text helpers shared by the tool renderers

use serde_json::Value;

/// Placeholder for fields missing from an upstream response
pub const NOT_AVAILABLE: &str = "N/A";

/// Render the value at a JSON pointer as text, or `default` when missing.
///
/// Strings are returned verbatim; numbers and booleans use their JSON text.
#[inline]
pub fn text_or(value: &Value, pointer: &str, default: &str) -> String {
    match value.pointer(pointer) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => default.to_string(),
        Some(other @ (Value::Number(_) | Value::Bool(_))) => other.to_string(),
        Some(_) => default.to_string(),
    }
}

/// Like [`text_or`] but also treats an empty string as missing
#[inline]
pub fn non_empty_text_or(value: &Value, pointer: &str, default: &str) -> String {
    let text = text_or(value, pointer, default);
    if text.trim().is_empty() {
        default.to_string()
    } else {
        text
    }
}

/// Resolve a possibly multilingual field.
///
/// Plain strings are returned as-is. Language maps prefer the English
/// (`en`) variant and otherwise fall back to any available language.
#[inline]
pub fn localized(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(map) => map
            .get("en")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .or_else(|| {
                map.values()
                    .filter_map(Value::as_str)
                    .find(|s| !s.is_empty())
            })
            .map(str::to_string),
        _ => None,
    }
}

/// First `max_chars` characters of `text`
#[inline]
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Uppercase the first character and lowercase the rest
#[inline]
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
    })
}

/// Integer with comma thousands separators, e.g. `39,356,104`
#[inline]
pub fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        grouped.push('-');
    }
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

/// Decimal with comma thousands separators and a fixed number of decimals
#[inline]
pub fn format_decimal(value: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, value.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let whole = whole.parse::<i64>().map_or_else(|_| whole.to_string(), group_thousands);

    let sign = if value < 0.0 && fixed.chars().any(|c| c != '0' && c != '.') {
        "-"
    } else {
        ""
    };

    if fraction.is_empty() {
        format!("{}{}", sign, whole)
    } else {
        format!("{}{}.{}", sign, whole, fraction)
    }
}

/// Parse a Census-style cell (string or number) as an integer, defaulting to 0
#[inline]
pub fn cell_i64(cell: Option<&Value>) -> i64 {
    match cell {
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .ok()
            .or_else(|| s.trim().parse::<f64>().ok().map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        _ => 0,
    }
}

/// Parse a Census-style cell as a float, defaulting to 0
#[inline]
pub fn cell_f64(cell: Option<&Value>) -> f64 {
    match cell {
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        _ => 0.0,
    }
}
