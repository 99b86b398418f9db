//! Unwrapping of JSON-wrapped text responses.
//!
//! Some backend deployments return the plain-text protocol wrapped in JSON:
//! a bare string literal (`"0: Title"`), or an object such as
//! `{"result": "..."}` / `{"summary": "..."}`. The parsers only understand
//! the plain text, so bodies are unwrapped first. Anything else is passed
//! through untouched.

use serde_json::Value;

const TEXT_FIELDS: &[&str] = &["result", "summary", "text", "output"];

/// Return the inner text of a JSON-wrapped body, or the body itself.
pub fn unwrap_text(body: &str) -> String {
    let trimmed = body.trim_start();
    if !(trimmed.starts_with('"') || trimmed.starts_with('{')) {
        return body.to_string();
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::String(text)) => text,
        Ok(Value::Object(map)) => TEXT_FIELDS
            .iter()
            .find_map(|field| map.get(*field).and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| body.to_string()),
        _ => body.to_string(),
    }
}
