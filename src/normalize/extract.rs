//! Locating structured blocks in prose-wrapped agent output.

use serde_json::Value;

/// Decode the whole text as JSON, tolerating a surrounding Markdown code fence.
pub fn strict(text: &str) -> Option<Value> {
    let trimmed = strip_fence(text.trim());
    serde_json::from_str(trimmed).ok()
}

/// First well-formed JSON object or array embedded in the text, scanning
/// left to right. Blocks that fail to parse are skipped.
pub fn first_embedded(text: &str) -> Option<Value> {
    for (start, ch) in text.char_indices() {
        if ch != '{' && ch != '[' {
            continue;
        }
        let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
        if let Some(Ok(value)) = stream.next() {
            let useful = match &value {
                Value::Object(map) => !map.is_empty(),
                Value::Array(items) => !items.is_empty(),
                _ => false,
            };
            if useful {
                return Some(value);
            }
        }
    }
    None
}

fn strip_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string (e.g. "json") on the opening line.
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Short excerpt for diagnostic notes.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}…", cut)
}
