//! Structured response parsing
//!
//! Models wrap JSON in prose or code fences often enough that a strict
//! `serde_json::from_str` on the whole response is not sufficient. These
//! helpers locate the first balanced JSON value in the text. Every function
//! returns a [`ParseError`]; call sites decide the fallback.

use serde_json::Value;

use crate::error::ParseError;

/// Extract the first parseable JSON object or array from `text`
pub fn extract_json(text: &str) -> Result<Value, ParseError> {
    let trimmed = strip_code_fence(text.trim());
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if value.is_object() || value.is_array() {
            return Ok(value);
        }
    }

    let mut last_error = None;
    for (start, ch) in trimmed.char_indices() {
        if ch != '{' && ch != '[' {
            continue;
        }
        if let Some(end) = matching_close(trimmed, start) {
            match serde_json::from_str::<Value>(&trimmed[start..=end]) {
                Ok(value) => return Ok(value),
                Err(e) => last_error = Some(e.to_string()),
            }
        }
    }

    match last_error {
        Some(e) => Err(ParseError::InvalidJson(e)),
        None => Err(ParseError::NoJson),
    }
}

/// Read a string field from the first JSON object in `text`
pub fn parse_string_field(text: &str, field: &'static str) -> Result<String, ParseError> {
    match extract_json(text)? {
        Value::Object(map) => match map.get(field) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(Value::Null) | None => Err(ParseError::MissingField(field)),
            Some(other) => Ok(other.to_string()),
        },
        other => Err(ParseError::UnexpectedShape(format!(
            "expected object with '{}', got {}",
            field,
            json_kind(&other)
        ))),
    }
}

/// Read a list of strings from the first JSON array in `text`
pub fn parse_string_list(text: &str) -> Result<Vec<String>, ParseError> {
    match extract_json(text)? {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                other => Err(ParseError::UnexpectedShape(format!(
                    "expected string list item, got {}",
                    json_kind(&other)
                ))),
            })
            .collect(),
        other => Err(ParseError::UnexpectedShape(format!(
            "expected list, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop an optional language tag on the opening line
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// Byte index of the bracket closing the one at `start`, skipping strings
fn matching_close(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(start + offset);
                }
            }
            _ => {}
        }
    }
    None
}
