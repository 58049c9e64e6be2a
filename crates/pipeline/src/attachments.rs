//! Attachment normalization and merging.
//!
//! An attachment descriptor is an untyped record that may name a file
//! reference, a direct URL, a data URL, a raw base64 payload or a storage
//! key. Resolution paths are checked in a fixed precedence order and the
//! first one that applies wins, even when later fields are also present.

use serde_json::{Map, Value};
use statgpt_config::AttachmentConfig;
use statgpt_core::message::{ContentPart, Message, Role};
use tracing::debug;

use crate::request::Mode;

/// Default user instruction when attachments arrive without a user message.
pub const EXTRACT_INSTRUCTION: &str =
    "Extract the betting slip into structured fields. Return ONLY the extracted fields; no commentary.";
pub const ANALYZE_INSTRUCTION: &str = "Analyze the attached image(s).";

type AttachmentMatcher = fn(&Map<String, Value>, &AttachmentConfig) -> Option<ContentPart>;

/// Resolution paths in precedence order.
const ATTACHMENT_MATCHERS: &[(&str, AttachmentMatcher)] = &[
    ("file_reference", match_file_reference),
    ("direct_url", match_direct_url),
    ("data_url", match_data_url),
    ("raw_base64", match_raw_base64),
    ("storage_key", match_storage_key),
];

const FILE_ID_FIELDS: &[&str] = &["file_id", "fileId"];
const URL_FIELDS: &[&str] = &["image_url", "url"];
const DATA_URL_FIELDS: &[&str] = &["dataUrl", "data_url", "dataURL"];
const BASE64_FIELDS: &[&str] = &["bytes_base64", "base64", "b64"];
const MIME_FIELDS: &[&str] = &["mime", "contentType"];

/// Normalize one attachment descriptor. `None` means no path applied.
pub fn normalize_attachment(descriptor: &Value, config: &AttachmentConfig) -> Option<ContentPart> {
    let Value::Object(map) = descriptor else {
        debug!("Ignoring non-object attachment");
        return None;
    };

    let found = ATTACHMENT_MATCHERS
        .iter()
        .find_map(|(path, matcher)| matcher(map, config).map(|part| (*path, part)));

    match found {
        Some((path, part)) => {
            debug!(path, kind = part.kind(), "Attachment normalized");
            Some(part)
        }
        None => {
            debug!(keys = ?map.keys().collect::<Vec<_>>(), "Attachment matched no resolution path");
            None
        }
    }
}

/// Extract and normalize attachments from the request body: the `attachments`
/// list first, then the singular `attachment` (an object or JSON-encoded text).
pub fn resolve_attachments(body: &Map<String, Value>, config: &AttachmentConfig) -> Vec<ContentPart> {
    let mut parts: Vec<ContentPart> = match body.get("attachments") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|a| normalize_attachment(a, config))
            .collect(),
        _ => Vec::new(),
    };

    let single = match body.get("attachment") {
        Some(Value::String(raw)) => match serde_json::from_str::<Value>(raw) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                debug!(error = %e, "Singular attachment is not JSON, ignoring");
                None
            }
        },
        Some(value @ Value::Object(_)) => Some(value.clone()),
        _ => None,
    };

    if let Some(part) = single.and_then(|a| normalize_attachment(&a, config)) {
        parts.push(part);
    }

    parts
}

/// Attach resolved parts to the last user message, or append a synthetic
/// user message with a mode-appropriate instruction when there is none.
pub fn merge_attachments(messages: &mut Vec<Message>, parts: Vec<ContentPart>, mode: Mode) {
    if parts.is_empty() {
        return;
    }

    match messages.iter_mut().rev().find(|m| m.role == Role::User) {
        Some(last_user) => last_user.parts.extend(parts),
        None => {
            let instruction = if mode.is_extract() {
                EXTRACT_INSTRUCTION
            } else {
                ANALYZE_INSTRUCTION
            };
            let mut content = Vec::with_capacity(parts.len() + 1);
            content.push(ContentPart::text(instruction));
            content.extend(parts);
            messages.push(Message::new(Role::User, content));
        }
    }
}

/// First alias holding a non-blank string, trimmed.
fn first_str<'a>(map: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a str> {
    aliases
        .iter()
        .filter_map(|k| map.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
}

fn match_file_reference(map: &Map<String, Value>, _: &AttachmentConfig) -> Option<ContentPart> {
    first_str(map, FILE_ID_FIELDS).map(ContentPart::file)
}

fn match_direct_url(map: &Map<String, Value>, _: &AttachmentConfig) -> Option<ContentPart> {
    first_str(map, URL_FIELDS).map(ContentPart::image)
}

fn match_data_url(map: &Map<String, Value>, _: &AttachmentConfig) -> Option<ContentPart> {
    first_str(map, DATA_URL_FIELDS)
        .filter(|s| s.starts_with("data:"))
        .map(ContentPart::image)
}

fn match_raw_base64(map: &Map<String, Value>, config: &AttachmentConfig) -> Option<ContentPart> {
    let payload = first_str(map, BASE64_FIELDS)?;
    if payload.starts_with("data:") {
        return Some(ContentPart::image(payload));
    }
    let mime = first_str(map, MIME_FIELDS).unwrap_or(&config.default_mime);
    Some(ContentPart::image(format!("data:{mime};base64,{payload}")))
}

fn match_storage_key(map: &Map<String, Value>, config: &AttachmentConfig) -> Option<ContentPart> {
    let base = config.public_base_url.as_deref()?;
    let key = first_str(map, &["key"])?;
    Some(ContentPart::image(format!(
        "{}/{}",
        base.trim_end_matches('/'),
        key.trim_start_matches('/')
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> AttachmentConfig {
        AttachmentConfig::default()
    }

    fn with_base(base: &str) -> AttachmentConfig {
        AttachmentConfig {
            public_base_url: Some(base.into()),
            ..AttachmentConfig::default()
        }
    }

    #[test]
    fn file_reference_beats_direct_url() {
        let part = normalize_attachment(
            &json!({ "url": "https://x/a.png", "fileId": " file-abc " }),
            &config(),
        );
        assert_eq!(part, Some(ContentPart::file("file-abc")));
    }

    #[test]
    fn direct_url_beats_data_url_and_base64() {
        let part = normalize_attachment(
            &json!({
                "image_url": "https://x/a.png",
                "dataUrl": "data:image/png;base64,BBBB",
                "base64": "CCCC"
            }),
            &config(),
        );
        assert_eq!(part, Some(ContentPart::image("https://x/a.png")));
    }

    #[test]
    fn data_url_requires_scheme_prefix() {
        let part = normalize_attachment(&json!({ "data_url": "AAAA" }), &config());
        assert_eq!(part, None);

        let part = normalize_attachment(
            &json!({ "dataURL": "data:image/webp;base64,AAAA" }),
            &config(),
        );
        assert_eq!(part, Some(ContentPart::image("data:image/webp;base64,AAAA")));
    }

    #[test]
    fn raw_base64_is_wrapped_with_declared_mime() {
        let part = normalize_attachment(
            &json!({ "base64": "AAAA", "mime": "image/jpeg" }),
            &config(),
        );
        assert_eq!(part, Some(ContentPart::image("data:image/jpeg;base64,AAAA")));
    }

    #[test]
    fn raw_base64_defaults_mime_and_passes_data_urls_through() {
        assert_eq!(
            normalize_attachment(&json!({ "bytes_base64": "QUJD" }), &config()),
            Some(ContentPart::image("data:image/png;base64,QUJD"))
        );
        assert_eq!(
            normalize_attachment(&json!({ "b64": "data:image/gif;base64,R0lG" }), &config()),
            Some(ContentPart::image("data:image/gif;base64,R0lG"))
        );
    }

    #[test]
    fn storage_key_needs_configured_base() {
        let descriptor = json!({ "key": "/attachments/slip-1.png" });
        assert_eq!(normalize_attachment(&descriptor, &config()), None);
        assert_eq!(
            normalize_attachment(&descriptor, &with_base("https://cdn.stat-trust.com")),
            Some(ContentPart::image(
                "https://cdn.stat-trust.com/attachments/slip-1.png"
            ))
        );
    }

    #[test]
    fn non_records_and_blank_fields_do_not_match() {
        assert_eq!(normalize_attachment(&json!("https://x/a.png"), &config()), None);
        assert_eq!(normalize_attachment(&json!([1, 2]), &config()), None);
        assert_eq!(
            normalize_attachment(&json!({ "url": "   ", "file_id": 12 }), &config()),
            None
        );
    }

    #[test]
    fn resolves_list_before_singular() {
        let body = json!({
            "attachments": [
                { "url": "https://x/1.png" },
                { "unknown": true },
                { "file_id": "file-2" }
            ],
            "attachment": "{\"base64\":\"AAAA\",\"mime\":\"image/jpeg\"}"
        });
        let parts = resolve_attachments(body.as_object().unwrap(), &config());
        assert_eq!(
            parts,
            vec![
                ContentPart::image("https://x/1.png"),
                ContentPart::file("file-2"),
                ContentPart::image("data:image/jpeg;base64,AAAA"),
            ]
        );
    }

    #[test]
    fn singular_attachment_object_and_garbage_text() {
        let body = json!({ "attachment": { "image_url": "https://x/s.png" } });
        assert_eq!(
            resolve_attachments(body.as_object().unwrap(), &config()),
            vec![ContentPart::image("https://x/s.png")]
        );

        let body = json!({ "attachment": "not json" });
        assert!(resolve_attachments(body.as_object().unwrap(), &config()).is_empty());
    }

    #[test]
    fn merge_appends_to_last_user_message() {
        let mut messages = vec![
            Message::user("first question"),
            Message::new(Role::Assistant, vec![ContentPart::text("answer")]),
            Message::user("look at this"),
            Message::new(Role::Assistant, vec![ContentPart::text("trailing")]),
        ];
        merge_attachments(
            &mut messages,
            vec![ContentPart::image("https://x/1.png")],
            Mode::General,
        );
        assert_eq!(messages.len(), 4);
        assert_eq!(
            messages[2].parts,
            vec![
                ContentPart::text("look at this"),
                ContentPart::image("https://x/1.png"),
            ]
        );
        assert_eq!(messages[0].parts.len(), 1);
    }

    #[test]
    fn merge_synthesizes_user_message_per_mode() {
        let mut messages = Vec::new();
        merge_attachments(&mut messages, vec![ContentPart::file("f")], Mode::SlipExtract);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].parts[0], ContentPart::text(EXTRACT_INSTRUCTION));
        assert_eq!(messages[0].parts[1], ContentPart::file("f"));

        let mut messages = vec![Message::new(Role::Assistant, vec![])];
        merge_attachments(&mut messages, vec![ContentPart::file("f")], Mode::General);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].parts[0], ContentPart::text(ANALYZE_INSTRUCTION));
    }

    #[test]
    fn merge_without_parts_is_a_no_op() {
        let mut messages = Vec::new();
        merge_attachments(&mut messages, Vec::new(), Mode::General);
        assert!(messages.is_empty());
    }
}
