use serde_json::{Map, Value};

use super::types::{Confidence, Recommendation};

/// Best-effort JSON object extraction from model output.
///
/// Tries the whole text, then the span from the first `{` to the last `}`.
pub fn parse_json_object(text: &str) -> Option<Map<String, Value>> {
    strict_object(text).or_else(|| salvage_block(text).and_then(strict_object))
}

fn strict_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn salvage_block(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    raw.get(start..=end)
}

/// Build a recommendation from model output; never fails.
///
/// Missing fields default (empty lists, medium confidence); an empty or
/// missing summary is replaced by the whole text.
pub fn recommendation_from_text(text: &str) -> Recommendation {
    let parsed = parse_json_object(text).unwrap_or_default();

    let summary = match parsed.get("summary") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Null) | Some(Value::String(_)) | None => text.to_string(),
        Some(other) => other.to_string(),
    };

    let confidence = parsed
        .get("confidence")
        .and_then(Value::as_str)
        .map(Confidence::parse_lenient)
        .unwrap_or_default();

    Recommendation {
        summary,
        reasons: string_list(parsed.get("reasons")),
        actions: string_list(parsed.get("actions")),
        confidence,
        raw_text: text.to_string(),
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter(|item| !item.is_null())
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}
