//! Content coercion: loosely-shaped message content → typed content parts.
//!
//! Callers send plain strings, Chat-Completions style part lists
//! (`{"type":"text"}`, `{"type":"image_url"}`), Responses style parts
//! (`input_text`, `input_image`, `input_file`) or odd single objects. Each
//! list element is run through a fixed, ordered list of shape matchers; the
//! first matcher that recognizes the shape decides the outcome. Unrecognized
//! elements are dropped, never reported as errors.

use serde_json::{Map, Value};
use statgpt_core::message::ContentPart;
use tracing::debug;

/// What a matcher decided for an element it recognized.
#[derive(Debug, PartialEq, Eq)]
enum Coerced {
    Part(ContentPart),
    /// Recognized shape without a usable payload.
    Dropped,
}

type ElementMatcher = fn(&Map<String, Value>) -> Option<Coerced>;

/// Evaluated in order; the first `Some` wins.
const ELEMENT_MATCHERS: &[(&str, ElementMatcher)] = &[
    ("responses_part", match_responses_part),
    ("chat_text", match_chat_text),
    ("chat_image_url", match_chat_image_url),
    ("text_field", match_text_field),
];

/// Coerce a content value of unknown shape into ordered content parts.
pub fn coerce_content(content: Option<&Value>) -> Vec<ContentPart> {
    let Some(content) = content else {
        return Vec::new();
    };

    match content {
        Value::Null => Vec::new(),
        Value::String(s) if s.is_empty() => Vec::new(),
        Value::String(s) => vec![ContentPart::text(s.clone())],
        Value::Array(items) => items.iter().filter_map(coerce_element).collect(),
        Value::Object(map) if map.is_empty() => Vec::new(),
        Value::Object(_) => coerce_element(content).into_iter().collect(),
        other => vec![ContentPart::text(other.to_string())],
    }
}

/// Coerce one list element. Strings become text; objects go through the matchers.
fn coerce_element(element: &Value) -> Option<ContentPart> {
    match element {
        Value::String(s) => Some(ContentPart::text(s.clone())),
        Value::Object(map) => {
            for (shape, matcher) in ELEMENT_MATCHERS {
                if let Some(outcome) = matcher(map) {
                    return match outcome {
                        Coerced::Part(part) => Some(part),
                        Coerced::Dropped => {
                            debug!(shape, "Dropping content part without payload");
                            None
                        }
                    };
                }
            }
            debug!(keys = ?map.keys().collect::<Vec<_>>(), "Dropping unrecognized content part");
            None
        }
        other => {
            debug!(kind = json_kind(other), "Dropping non-object content part");
            None
        }
    }
}

fn part_type(map: &Map<String, Value>) -> Option<&str> {
    map.get("type").and_then(Value::as_str)
}

/// Text payload: strings verbatim, missing/null as empty, other scalars stringified.
fn text_payload(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// An image URL given either as `{"url": ...}` or directly as a string.
pub(crate) fn image_url_payload(value: Option<&Value>) -> Option<String> {
    let url = match value? {
        Value::String(s) => s.as_str(),
        Value::Object(inner) => inner.get("url").and_then(Value::as_str)?,
        _ => return None,
    };
    (!url.is_empty()).then(|| url.to_string())
}

fn match_responses_part(map: &Map<String, Value>) -> Option<Coerced> {
    let outcome = match part_type(map)? {
        "input_text" => Coerced::Part(ContentPart::text(text_payload(map.get("text")))),
        "input_image" => match image_url_payload(map.get("image_url")) {
            Some(url) => Coerced::Part(ContentPart::image(url)),
            None => Coerced::Dropped,
        },
        "input_file" => match map.get("file_id").and_then(Value::as_str) {
            Some(id) if !id.is_empty() => Coerced::Part(ContentPart::file(id)),
            _ => Coerced::Dropped,
        },
        _ => return None,
    };
    Some(outcome)
}

fn match_chat_text(map: &Map<String, Value>) -> Option<Coerced> {
    (part_type(map)? == "text").then(|| Coerced::Part(ContentPart::text(text_payload(map.get("text")))))
}

fn match_chat_image_url(map: &Map<String, Value>) -> Option<Coerced> {
    if part_type(map)? != "image_url" {
        return None;
    }
    Some(match image_url_payload(map.get("image_url")) {
        Some(url) => Coerced::Part(ContentPart::image(url)),
        None => Coerced::Dropped,
    })
}

/// Salvage any object carrying a string `text` field.
fn match_text_field(map: &Map<String, Value>) -> Option<Coerced> {
    let text = map.get("text")?.as_str()?;
    Some(Coerced::Part(ContentPart::text(text)))
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
