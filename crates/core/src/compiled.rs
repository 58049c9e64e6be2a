//! The compiled context: a pre-authored bundle of statistical material.
//!
//! Produced by an external authoring system and only ever read here. The
//! section mapping keeps its authored order, which the summarizer relies on
//! when it decides which sections fit.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// A resolved compiled context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompiledContext {
    /// Header facts such as matchup, league and date. Scalar values are
    /// accepted and stringified.
    #[serde(default, deserialize_with = "scalar_map")]
    pub meta: BTreeMap<String, String>,

    /// The authored template prompt.
    #[serde(default, deserialize_with = "lenient_string")]
    pub prompt: String,

    /// Section title → (category → arbitrary structured value).
    #[serde(default)]
    pub sections: serde_json::Map<String, serde_json::Value>,
}

impl CompiledContext {
    /// Build from an already-structured JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Parse from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// Category names of a section, in authored order. Non-object sections have none.
    pub fn categories(section: &serde_json::Value) -> Vec<&str> {
        section
            .as_object()
            .map(|m| m.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

fn scalar_to_string(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn scalar_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, serde_json::Value>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(k, v)| scalar_to_string(v).map(|v| (k, v)))
        .collect())
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(scalar_to_string(raw).unwrap_or_default())
}
