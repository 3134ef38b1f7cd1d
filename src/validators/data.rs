//! Generic data checks and input scrubbing.

use std::collections::HashMap;
use std::fmt::Display;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::ValidationResult;

static HTML_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

/// Removed verbatim (case-sensitive) by `sanitize_input`, in this order.
const SQL_TOKENS: [&str; 12] = [
    "'", "\"", ";", "--", "/*", "*/", "=", "DROP", "DELETE", "INSERT", "SELECT", "UPDATE",
];

/// Fields missing from `data` or set to `null`.
pub fn validate_required_fields(data: &HashMap<String, Value>, required: &[&str]) -> ValidationResult {
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|field| data.get(*field).map_or(true, Value::is_null))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(format!("Missing required fields: {}", missing.join(", ")))
    }
}

/// Inclusive bounds; `None` leaves that side open.
pub fn validate_numeric_range<T>(value: T, min: Option<T>, max: Option<T>) -> ValidationResult
where
    T: PartialOrd + Display + Copy,
{
    if let Some(min) = min {
        if value < min {
            return Err(format!("Value ({}) is less than the minimum ({})", value, min));
        }
    }
    if let Some(max) = max {
        if value > max {
            return Err(format!("Value ({}) is greater than the maximum ({})", value, max));
        }
    }
    Ok(())
}

/// Length in characters, inclusive bounds.
pub fn validate_string_length(value: &str, min: Option<usize>, max: Option<usize>) -> ValidationResult {
    let len = value.chars().count();

    if let Some(min) = min {
        if len < min {
            return Err(format!("String length ({}) is shorter than the minimum ({})", len, min));
        }
    }
    if let Some(max) = max {
        if len > max {
            return Err(format!("String length ({}) is longer than the maximum ({})", len, max));
        }
    }
    Ok(())
}

/// Strip HTML tags and SQL metacharacters/keywords from free text.
///
/// This is a blunt scrubber for display text. Queries are parameterized
/// regardless.
pub fn sanitize_input(value: &str) -> String {
    let mut cleaned = HTML_TAG_RE.replace_all(value, "").into_owned();
    for token in SQL_TOKENS {
        cleaned = cleaned.replace(token, "");
    }
    cleaned
}
