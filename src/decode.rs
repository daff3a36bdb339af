//! Defensive decoding of untrusted transformer output

use indexmap::IndexMap;
use serde_json::Value;

/// Outcome of decoding model text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded<T> {
    Parsed(T),
    Unparseable,
}

/// Remove markdown code fences such as ```` ```json ```` around a payload
pub fn strip_code_fences(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Slice from the first `open` to the last `close`, inclusive
fn bracketed(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Decode a JSON object mapping input strings to output strings.
///
/// Entries whose value is not a string are dropped so that the caller keeps
/// the original for those keys.
pub fn decode_string_map(text: &str) -> Decoded<IndexMap<String, String>> {
    let cleaned = strip_code_fences(text);
    let Some(candidate) = bracketed(&cleaned, '{', '}') else {
        return Decoded::Unparseable;
    };

    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(object)) => Decoded::Parsed(
            object
                .into_iter()
                .filter_map(|(key, value)| match value {
                    Value::String(s) => Some((key, s)),
                    _ => None,
                })
                .collect(),
        ),
        _ => Decoded::Unparseable,
    }
}

/// Decode a JSON array of non-negative integer row identifiers.
///
/// Digit strings are accepted; any other element makes the whole answer
/// unparseable.
pub fn decode_id_list(text: &str) -> Decoded<Vec<usize>> {
    let cleaned = strip_code_fences(text);
    let Some(candidate) = bracketed(&cleaned, '[', ']') else {
        return Decoded::Unparseable;
    };

    let Ok(Value::Array(items)) = serde_json::from_str::<Value>(candidate) else {
        return Decoded::Unparseable;
    };

    let mut ids = Vec::with_capacity(items.len());
    for item in items {
        let id = match &item {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        };
        match id.and_then(|v| usize::try_from(v).ok()) {
            Some(v) => ids.push(v),
            None => return Decoded::Unparseable,
        }
    }

    Decoded::Parsed(ids)
}
