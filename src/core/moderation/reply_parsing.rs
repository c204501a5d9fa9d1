//! Parsing helpers for raw agent replies.
//!
//! The agent is asked for strict JSON but models regularly wrap it in markdown
//! code fences or add stray text. Parsing runs an ordered list of strategies;
//! the first one producing a JSON object wins, and if none does the reply is
//! treated as an empty object so every field falls back to its default.

use serde_json::{Map, Value};

/// A single attempt at turning reply text into a JSON object.
type ParseStrategy = fn(&str) -> Option<Map<String, Value>>;

/// Strategies in the order they are tried.
const STRATEGIES: &[ParseStrategy] = &[parse_raw, parse_without_fences];

/// Returns `choices[0].message.content` from a chat-completion response body.
///
/// `None` means the path does not exist at all. A present but non-string value
/// is returned as-is; [`parse_content`] then treats it as unparseable.
pub fn extract_content(response: &Value) -> Option<&Value> {
    response
        .get("choices")?
        .get(0)?
        .get("message")?
        .get("content")
}

/// Parses the agent's content value into a JSON object.
///
/// Returns `None` when no strategy produced an object; callers use an empty map.
pub fn parse_content(content: &Value) -> Option<Map<String, Value>> {
    let text = content.as_str()?;
    STRATEGIES.iter().find_map(|strategy| strategy(text))
}

fn parse_raw(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str(text) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn parse_without_fences(text: &str) -> Option<Map<String, Value>> {
    parse_raw(&strip_code_fences(text))
}

/// Removes markdown code-fence markers anywhere in the text.
fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "")
}
