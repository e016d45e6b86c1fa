//! Defensive JSON extraction from model output.
//!
//! Models wrap JSON in markdown fences, prepend prose, or return nothing at
//! all. The strategy, in order: a fenced code block, the whole trimmed text,
//! then the first balanced top-level `{...}` found by bracket matching.

use serde::de::DeserializeOwned;
use serde_json::Value;

use memoria_types::error::MemoryError;

/// Locate and parse the first JSON object in `text`.
pub fn extract_json_object(text: &str) -> Result<Value, MemoryError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(MemoryError::Parse("empty response".to_string()));
    }

    if let Some(inner) = fenced_block(trimmed) {
        if let Some(value) = parse_object(inner) {
            return Ok(value);
        }
    }

    if let Some(value) = parse_object(trimmed) {
        return Ok(value);
    }

    let mut from = 0;
    while let Some((start, end)) = balanced_object_span(&trimmed[from..]) {
        if let Some(value) = parse_object(&trimmed[from + start..from + end]) {
            return Ok(value);
        }
        from += start + 1;
    }

    Err(MemoryError::Parse(format!(
        "no JSON object found in response ({} chars)",
        trimmed.len()
    )))
}

/// Extract the first JSON object and deserialize it into `T`.
pub fn parse_json_response<T: DeserializeOwned>(text: &str) -> Result<T, MemoryError> {
    let value = extract_json_object(text)?;
    serde_json::from_value(value).map_err(|e| MemoryError::Parse(e.to_string()))
}

fn parse_object(text: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}

/// Body of the first ``` fence, without the optional language tag line.
fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after = &text[open + 3..];
    let body_start = match after.find('\n') {
        Some(newline) if after[..newline].trim().chars().all(|c| c.is_ascii_alphanumeric()) => {
            newline + 1
        }
        _ => 0,
    };
    let body = &after[body_start..];
    let close = body.find("```")?;
    Some(&body[..close])
}

/// Byte span of the first balanced `{...}`, ignoring braces inside strings.
fn balanced_object_span(text: &str) -> Option<(usize, usize)> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some((start, start + offset + 1));
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BODY: &str = r#"{"memories":[{"content":"Is vegetarian","type":"semantic"}]}"#;

    #[test]
    fn test_fenced_and_prose_parse_to_same_value() {
        let fenced = format!("```json\n{BODY}\n```");
        let prose = format!("Sure! Here is what I found: {BODY} Let me know if you need more.");

        let a = extract_json_object(&fenced).unwrap();
        let b = extract_json_object(&prose).unwrap();
        assert_eq!(a, b);
        assert_eq!(a["memories"][0]["content"], "Is vegetarian");
    }

    #[test]
    fn test_empty_response_is_parse_error() {
        assert!(matches!(
            extract_json_object("   "),
            Err(MemoryError::Parse(_))
        ));
    }

    #[test]
    fn test_fence_without_language_tag() {
        let text = format!("```\n{BODY}\n```");
        assert!(extract_json_object(&text).is_ok());
    }

    #[test]
    fn test_braces_inside_strings_are_ignored() {
        let text = r#"Result: {"memory":[{"id":"0","text":"Uses {curly} braces \" here","event":"ADD"}]} trailing }"#;
        let value = extract_json_object(text).unwrap();
        assert_eq!(value["memory"][0]["text"], "Uses {curly} braces \" here");
    }

    #[test]
    fn test_broken_fence_falls_back_to_bracket_matching() {
        let text = "```json\n{not json}\n```\nActually: {\"ok\": true}";
        assert_eq!(extract_json_object(text).unwrap(), json!({"ok": true}));
    }

    #[test]
    fn test_top_level_array_is_rejected() {
        assert!(extract_json_object("[1, 2, 3]").is_err());
    }

    #[test]
    fn test_unbalanced_object_is_rejected() {
        assert!(extract_json_object("{\"memories\": [").is_err());
    }

    #[test]
    fn test_parse_json_response_typed() {
        #[derive(serde::Deserialize)]
        struct Shape {
            memories: Vec<serde_json::Value>,
        }
        let shape: Shape = parse_json_response(BODY).unwrap();
        assert_eq!(shape.memories.len(), 1);
    }
}
