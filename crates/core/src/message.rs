//! Message and content-part domain types.
//!
//! These are the request-scoped value objects handed to the completion
//! service: caller content is coerced into `ContentPart`s, grouped into
//! `Message`s, and serialized in the Responses-API input format.

use serde::{Deserialize, Serialize};

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions
    System,
    /// The end user
    User,
    /// The AI assistant
    Assistant,
}

impl Role {
    /// Parse a caller-supplied role name. Unknown or missing roles are `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "system" => Some(Role::System),
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One typed unit of message content.
///
/// Serialized with the tag names the completion service expects
/// (`input_text`, `input_image`, `input_file`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentPart {
    #[serde(rename = "input_text")]
    Text { text: String },

    /// An image addressed by URL (http(s) or `data:` URL).
    #[serde(rename = "input_image")]
    Image {
        #[serde(rename = "image_url")]
        locator: String,
    },

    /// A file previously uploaded to the completion service.
    #[serde(rename = "input_file")]
    File {
        #[serde(rename = "file_id")]
        reference: String,
    },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    pub fn image(locator: impl Into<String>) -> Self {
        ContentPart::Image {
            locator: locator.into(),
        }
    }

    pub fn file(reference: impl Into<String>) -> Self {
        ContentPart::File {
            reference: reference.into(),
        }
    }

    /// The tag name used on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            ContentPart::Text { .. } => "input_text",
            ContentPart::Image { .. } => "input_image",
            ContentPart::File { .. } => "input_file",
        }
    }
}

/// A single message of the completion input. Render order of `parts` is significant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,

    #[serde(rename = "content")]
    pub parts: Vec<ContentPart>,
}

impl Message {
    pub fn new(role: Role, parts: Vec<ContentPart>) -> Self {
        Self { role, parts }
    }

    /// Create a system message holding a single text part.
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, vec![ContentPart::text(text)])
    }

    /// Create a user message holding a single text part.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![ContentPart::text(text)])
    }

    /// Concatenated text of all text parts, newline separated.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                ContentPart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
