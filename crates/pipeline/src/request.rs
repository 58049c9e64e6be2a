//! Typed read access over a loosely-shaped chat request body.

use serde_json::{Map, Value};
use statgpt_core::message::{Message, Role};

use crate::content::coerce_content;

/// Fields consulted, in order, when `messages` is absent or empty.
const PROMPT_FIELDS: &[&str] = &["message", "userMessage", "prompt", "text"];
const SLIP_FIELDS: &[&str] = &["slipRaw", "slip"];

/// Request mode. The extraction family suppresses the guideline block and
/// forces deterministic sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    General,
    Extract,
    SlipExtract,
    VisionExtract,
}

impl Mode {
    /// Parse a mode string (case-insensitive, trimmed). Unknown modes are general.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "extract" => Mode::Extract,
            "slip_extract" => Mode::SlipExtract,
            "vision_extract" => Mode::VisionExtract,
            _ => Mode::General,
        }
    }

    pub fn is_extract(self) -> bool {
        !matches!(self, Mode::General)
    }

    /// Only plain `extract` demands a JSON-only reply.
    pub fn requires_json_only(self) -> bool {
        matches!(self, Mode::Extract)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::General => "general",
            Mode::Extract => "extract",
            Mode::SlipExtract => "slip_extract",
            Mode::VisionExtract => "vision_extract",
        }
    }
}

/// Borrowed view of a request body.
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    body: &'a Map<String, Value>,
}

impl<'a> ChatRequest<'a> {
    pub fn new(body: &'a Map<String, Value>) -> Self {
        Self { body }
    }

    pub fn body(&self) -> &'a Map<String, Value> {
        self.body
    }

    /// Non-blank string field, trimmed.
    fn str_field(&self, name: &str) -> Option<&'a str> {
        self.body
            .get(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn model(&self) -> Option<&'a str> {
        self.str_field("model")
    }

    pub fn system(&self) -> Option<&'a str> {
        self.str_field("system")
    }

    /// Accepts a number or numeric text. Non-finite values count as absent.
    pub fn temperature(&self) -> Option<f32> {
        let value: f32 = match self.body.get("temperature")? {
            Value::Number(n) => n.as_f64().map(|v| v as f32)?,
            Value::String(s) => s.trim().parse().ok()?,
            _ => return None,
        };
        value.is_finite().then_some(value)
    }

    /// Accepts a non-negative integer, an integral float or numeric text.
    pub fn max_tokens(&self) -> Option<u32> {
        match self.body.get("max_tokens")? {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
                .and_then(|v| u32::try_from(v).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn mode(&self) -> Mode {
        self.str_field("mode").map(Mode::parse).unwrap_or_default()
    }

    /// Caller messages coerced into typed parts. Non-object entries are
    /// skipped; unknown or missing roles become `user`. Falls back to the
    /// singular prompt fields when no messages were sent.
    pub fn messages(&self) -> Vec<Message> {
        let listed: Vec<Message> = match self.body.get("messages") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_object)
                .map(|m| {
                    let role = m
                        .get("role")
                        .and_then(Value::as_str)
                        .and_then(Role::parse)
                        .unwrap_or(Role::User);
                    Message::new(role, coerce_content(m.get("content")))
                })
                .collect(),
            _ => Vec::new(),
        };

        if !listed.is_empty() {
            return listed;
        }

        PROMPT_FIELDS
            .iter()
            .find_map(|f| self.body.get(*f).and_then(Value::as_str).filter(|s| !s.is_empty()))
            .map(|prompt| vec![Message::user(prompt)])
            .unwrap_or_default()
    }

    /// Slip extraction payload as text. Structured values are serialized.
    pub fn slip(&self) -> Option<String> {
        SLIP_FIELDS.iter().find_map(|f| match self.body.get(*f)? {
            Value::Null => None,
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(s.clone()),
            Value::Array(a) if a.is_empty() => None,
            Value::Object(o) if o.is_empty() => None,
            other => Some(other.to_string()),
        })
    }
}
