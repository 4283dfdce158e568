//! Tool call extraction from LLM output
//!
//! Scans model text for the `TOOL_CALL` marker immediately followed by a
//! JSON object and decodes each occurrence into a name/arguments pair.
//! Models frequently emit near-JSON, so a strict decode is tried first and a
//! permissive fallback picks up what serde rejects. Malformed segments are
//! skipped, never fatal, and no tool-selection heuristics are applied: only
//! what the model explicitly marks is extracted.

use serde_json::{Map, Value};

/// Marker the model is instructed to prefix tool calls with
pub const TOOL_CALL_MARKER: &str = "TOOL_CALL";

/// A tool call recovered from model output
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedToolCall {
    pub name: String,
    pub arguments: Value,
}

/// Extract every marker-delimited tool call from model output
///
/// Text without the marker, or marker occurrences without a balanced JSON
/// object, yield no calls.
pub fn parse_tool_calls(content: &str) -> Vec<ParsedToolCall> {
    let mut calls = Vec::new();

    for segment in content.split(TOOL_CALL_MARKER).skip(1) {
        let block = match extract_json_block(segment) {
            Some(block) => block,
            None => {
                tracing::debug!("Skipping tool call segment without balanced JSON");
                continue;
            }
        };

        match to_call(decode_object(block)) {
            Some(call) => calls.push(call),
            None => tracing::debug!("Skipping tool call without a usable name"),
        }
    }

    calls
}

/// First balanced `{...}` block at the start of a segment
///
/// Counts brace depth character by character, which extracts nested objects
/// without a full JSON tokenizer. Braces inside string literals are not
/// special-cased; the strict decoder downstream rejects the rare bad split.
fn extract_json_block(segment: &str) -> Option<&str> {
    if !segment.starts_with('{') {
        return None;
    }

    let mut depth = 0usize;
    for (i, c) in segment.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&segment[..=i]);
                }
            }
            _ => {}
        }
    }

    // No matching close brace
    None
}

/// Decode a JSON object, strictly first, permissively on failure
fn decode_object(block: &str) -> Map<String, Value> {
    if let Ok(map) = serde_json::from_str::<Map<String, Value>>(block) {
        return map;
    }
    decode_lenient(block)
}

/// Permissive decoder for near-JSON
///
/// Strips the outer braces, splits on top-level commas, splits each piece on
/// its first colon, and trims quotes and whitespace from both sides. A value
/// that is itself brace-delimited (the `args` field) is decoded recursively;
/// everything else stays a string.
fn decode_lenient(block: &str) -> Map<String, Value> {
    let inner = block.trim();
    let inner = inner.strip_prefix('{').unwrap_or(inner);
    let inner = inner.strip_suffix('}').unwrap_or(inner);

    let mut map = Map::new();

    for piece in split_top_level(inner) {
        let (key, value) = match piece.split_once(':') {
            Some(parts) => parts,
            None => continue,
        };

        let key = key.trim().trim_matches('"').to_string();
        if key.is_empty() {
            continue;
        }

        let value = value.trim();
        if value.starts_with('{') && value.ends_with('}') {
            map.insert(key, Value::Object(decode_lenient(value)));
        } else {
            map.insert(key, Value::String(value.trim_matches('"').to_string()));
        }
    }

    map
}

/// Split on commas at brace depth zero, ignoring commas inside quotes
fn split_top_level(s: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut start = 0usize;

    for (i, c) in s.char_indices() {
        match c {
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => depth = depth.saturating_sub(1),
            ',' if !in_string && depth == 0 => {
                pieces.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    pieces.push(&s[start..]);
    pieces
}

/// Turn a decoded mapping into a tool call, or None without a usable name
fn to_call(mut map: Map<String, Value>) -> Option<ParsedToolCall> {
    let name = match map.get("name") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        _ => return None,
    };

    // Absent or null args normalize to an empty object
    let arguments = match map.remove("args") {
        Some(Value::Null) | None => Value::Object(Map::new()),
        Some(args) => args,
    };

    Some(ParsedToolCall { name, arguments })
}
