use crate::error::{AskDbError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static JSON_FENCE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)```json(.*?)(?:```|\z)").unwrap());

static GENERIC_FENCE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(.*?)(?:```|\z)").unwrap());

type Strategy = fn(&str) -> Option<&str>;

fn whole_text(text: &str) -> Option<&str> {
    Some(text)
}

fn json_fence(text: &str) -> Option<&str> {
    JSON_FENCE_REGEX
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
}

fn generic_fence(text: &str) -> Option<&str> {
    GENERIC_FENCE_REGEX
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
}

// serde_json only skips ascii whitespace; `trim` also drops unicode spaces
// such as U+00A0 that some models pad their output with
fn trimmed_text(text: &str) -> Option<&str> {
    Some(text.trim())
}

/// tried in order, first candidate that parses wins
const STRATEGIES: &[(&str, Strategy)] = &[
    ("direct", whole_text),
    ("json_fence", json_fence),
    ("generic_fence", generic_fence),
    ("trimmed", trimmed_text),
];

/// recover the json value a model embedded in its reply, whether it came back
/// bare, inside a ```json fence, inside a plain fence, or padded with whitespace
pub fn extract_json(text: &str) -> Result<Value> {
    let mut last_error: Option<serde_json::Error> = None;

    for (name, strategy) in STRATEGIES {
        let Some(candidate) = strategy(text) else {
            continue;
        };

        match serde_json::from_str::<Value>(candidate) {
            Ok(value) => {
                tracing::debug!(strategy = *name, "extracted json from model output");
                return Ok(value);
            }
            Err(e) => last_error = Some(e),
        }
    }

    tracing::warn!(raw = text, "failed to extract json from model output");

    Err(AskDbError::MalformedResponse(match last_error {
        Some(e) => format!("no parseable json in model output: {}", e),
        None => "no parseable json in model output".to_string(),
    }))
}

/// required string field of an extracted object
pub fn require_str<'a>(value: &'a Value, key: &str) -> Result<&'a str> {
    let object = value.as_object().ok_or_else(|| {
        AskDbError::MalformedResponse(format!(
            "expected a json object with \"{}\", got {}",
            key,
            json_kind(value)
        ))
    })?;

    match object.get(key) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(AskDbError::MalformedResponse(format!(
            "\"{}\" must be a string, got {}",
            key,
            json_kind(other)
        ))),
        None => Err(AskDbError::MalformedResponse(format!(
            "response is missing \"{}\"",
            key
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
