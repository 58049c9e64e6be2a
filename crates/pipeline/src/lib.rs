//! # StatGPT Pipeline
//!
//! Request normalization and reply postprocessing in front of the completion
//! service:
//!
//! 1. **Coerce** caller message content into typed content parts
//! 2. **Resolve attachments** and merge them into the last user message
//! 3. **Resolve compiled context** (inline, pointer or embedded) and condense it
//!    into a bounded digest for the system prompt
//! 4. **Complete** through the configured `Provider`, exactly once
//! 5. **Normalize** the reply's trailing Signal / Confidence lines
//!
//! Every step is a function of the request body and the `AppConfig`; nothing
//! is kept between requests.

pub mod attachments;
pub mod chat;
pub mod compiled;
pub mod confidence;
pub mod content;
pub mod prompt;
pub mod request;
pub mod summary;

pub use attachments::{merge_attachments, normalize_attachment, resolve_attachments};
pub use chat::{ChatOutcome, ChatPipeline, PreparedChat};
pub use compiled::{ContextSource, ResolvedContext, resolve_compiled_context, strip_embedded};
pub use confidence::ConfidenceNormalizer;
pub use content::coerce_content;
pub use prompt::build_system_prompt;
pub use request::{ChatRequest, Mode};
pub use summary::summarize;
