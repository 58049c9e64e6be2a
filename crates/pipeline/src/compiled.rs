//! Compiled-context resolution.
//!
//! Three sources are tried in a fixed priority order: inline data, a pointer
//! into the key-value service, and a marker region embedded in the `system`
//! text. The first source that is *present* decides the outcome; a present but
//! unusable source is an error and never falls through to the next one.

use serde_json::{Map, Value};
use statgpt_core::compiled::CompiledContext;
use statgpt_core::error::ContextError;
use statgpt_core::store::KvStore;
use tracing::{debug, warn};

const INLINE_FIELDS: &[&str] = &["compiledInline", "compiledText"];
const POINTER_FIELDS: &[&str] = &["compiledPointer", "compiled_pointer"];

/// Hash field holding the serialized context under a pointer key.
pub const BLOB_FIELD: &str = "blob";

pub const EMBEDDED_OPEN: &str = "[[COMPILED_STATS_JSON]]";
pub const EMBEDDED_CLOSE: &str = "[[/COMPILED_STATS_JSON]]";

/// Where a resolved context came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextSource {
    Inline,
    Pointer,
    Embedded,
}

impl ContextSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ContextSource::Inline => "inline",
            ContextSource::Pointer => "pointer",
            ContextSource::Embedded => "embedded",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedContext {
    pub context: CompiledContext,
    pub source: ContextSource,
}

type Step = Option<Result<ResolvedContext, ContextError>>;

/// Resolve the compiled context of a request body.
///
/// `store` is `None` when no key-value credentials are configured; a pointer
/// supplied in that case fails with `MissingCredentials`.
pub async fn resolve_compiled_context(
    body: &Map<String, Value>,
    store: Option<&dyn KvStore>,
) -> Result<ResolvedContext, ContextError> {
    if let Some(outcome) = from_inline(body) {
        return outcome;
    }
    if let Some(outcome) = from_pointer(body, store).await {
        return outcome;
    }
    if let Some(outcome) = from_embedded(body) {
        return outcome;
    }
    Err(ContextError::NoContextSupplied)
}

/// Remove the embedded marker region from system text.
pub fn strip_embedded(system: &str) -> String {
    match embedded_span(system) {
        Some((start, _, end)) => {
            let mut out = system[..start].trim_end().to_string();
            let rest = system[end..].trim_start();
            if !out.is_empty() && !rest.is_empty() {
                out.push_str("\n\n");
            }
            out.push_str(rest);
            out
        }
        None => system.to_string(),
    }
}

fn resolved(context: CompiledContext, source: ContextSource) -> ResolvedContext {
    ResolvedContext { context, source }
}

/// Null, blank text and empty containers count as not supplied.
fn supplied<'a>(body: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    aliases.iter().filter_map(|k| body.get(*k)).find(|v| match v {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        _ => true,
    })
}

fn from_inline(body: &Map<String, Value>) -> Step {
    let value = supplied(body, INLINE_FIELDS)?;
    let parsed = match value {
        Value::String(text) => CompiledContext::from_json_str(text),
        structured => CompiledContext::from_value(structured.clone()),
    };
    Some(
        parsed
            .map(|ctx| resolved(ctx, ContextSource::Inline))
            .map_err(|e| ContextError::InvalidInline(e.to_string())),
    )
}

async fn from_pointer(body: &Map<String, Value>, store: Option<&dyn KvStore>) -> Step {
    let key = POINTER_FIELDS
        .iter()
        .filter_map(|k| body.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())?;

    let Some(store) = store else {
        return Some(Err(ContextError::MissingCredentials));
    };

    debug!(key, store = store.name(), "Looking up compiled context pointer");
    let blob = match store.hget(key, BLOB_FIELD).await {
        Ok(Some(blob)) if !blob.trim().is_empty() => blob,
        Ok(_) => {
            return Some(Err(ContextError::BlobNotFound { key: key.to_string() }));
        }
        Err(e) => {
            warn!(key, error = %e, "Compiled context lookup failed");
            return Some(Err(ContextError::LookupFailed {
                key: key.to_string(),
                reason: e.to_string(),
            }));
        }
    };

    Some(
        CompiledContext::from_json_str(&blob)
            .map(|ctx| resolved(ctx, ContextSource::Pointer))
            .map_err(|e| ContextError::InvalidBlob {
                key: key.to_string(),
                reason: e.to_string(),
            }),
    )
}

fn from_embedded(body: &Map<String, Value>) -> Step {
    let system = body.get("system").and_then(Value::as_str)?;
    let open = system.find(EMBEDDED_OPEN)?;

    let Some((_, interior, _)) = embedded_span(system) else {
        return Some(Err(ContextError::InvalidEmbedded(format!(
            "{EMBEDDED_OPEN} at byte {open} has no closing {EMBEDDED_CLOSE}"
        ))));
    };

    Some(
        CompiledContext::from_json_str(interior.trim())
            .map(|ctx| resolved(ctx, ContextSource::Embedded))
            .map_err(|e| ContextError::InvalidEmbedded(e.to_string())),
    )
}

/// (region start, interior, region end) of the first complete marker region.
fn embedded_span(system: &str) -> Option<(usize, &str, usize)> {
    let start = system.find(EMBEDDED_OPEN)?;
    let inner_start = start + EMBEDDED_OPEN.len();
    let close = system[inner_start..].find(EMBEDDED_CLOSE)? + inner_start;
    Some((start, &system[inner_start..close], close + EMBEDDED_CLOSE.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use statgpt_core::error::StoreError;
    use statgpt_store::InMemoryKvStore;

    fn body(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    const BLOB: &str = r#"{"meta":{"matchup":"BUF @ KC"},"prompt":"p","sections":{"A":{"x":1}}}"#;

    struct FailingStore;

    #[async_trait]
    impl KvStore for FailingStore {
        fn name(&self) -> &str {
            "failing"
        }

        async fn hget(&self, _key: &str, _field: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Timeout { timeout_secs: 5 })
        }
    }

    #[tokio::test]
    async fn inline_structured_and_text() {
        let b = body(json!({ "compiledInline": { "prompt": "hi", "sections": {} } }));
        let r = resolve_compiled_context(&b, None).await.unwrap();
        assert_eq!(r.source, ContextSource::Inline);
        assert_eq!(r.context.prompt, "hi");

        let b = body(json!({ "compiledText": BLOB }));
        let r = resolve_compiled_context(&b, None).await.unwrap();
        assert_eq!(r.context.meta["matchup"], "BUF @ KC");
    }

    #[tokio::test]
    async fn inline_wins_and_pointer_is_never_looked_up() {
        let store = InMemoryKvStore::new().with_field("ctx:1", BLOB_FIELD, BLOB);
        let b = body(json!({ "compiledInline": "{\"prompt\":\"inline\"}", "compiledPointer": "ctx:1" }));
        let r = resolve_compiled_context(&b, Some(&store)).await.unwrap();
        assert_eq!(r.source, ContextSource::Inline);
        assert_eq!(r.context.prompt, "inline");
        assert_eq!(store.lookups(), 0);
    }

    #[tokio::test]
    async fn invalid_inline_is_fatal_even_with_pointer() {
        let store = InMemoryKvStore::new().with_field("ctx:1", BLOB_FIELD, BLOB);
        let b = body(json!({ "compiledInline": "{not json", "compiledPointer": "ctx:1" }));
        let err = resolve_compiled_context(&b, Some(&store)).await.unwrap_err();
        assert!(matches!(err, ContextError::InvalidInline(_)));
        assert_eq!(store.lookups(), 0);
    }

    #[tokio::test]
    async fn pointer_reads_blob_field() {
        let store = InMemoryKvStore::new().with_field("ctx:1", BLOB_FIELD, BLOB);
        let b = body(json!({ "compiled_pointer": " ctx:1 " }));
        let r = resolve_compiled_context(&b, Some(&store)).await.unwrap();
        assert_eq!(r.source, ContextSource::Pointer);
        assert_eq!(r.context.section_count(), 1);
        assert_eq!(store.lookups(), 1);
    }

    #[tokio::test]
    async fn pointer_failures_do_not_fall_through() {
        let system = format!("sys {EMBEDDED_OPEN}{BLOB}{EMBEDDED_CLOSE}");
        let b = body(json!({ "compiledPointer": "ctx:missing", "system": system }));

        let err = resolve_compiled_context(&b, None).await.unwrap_err();
        assert!(matches!(err, ContextError::MissingCredentials));

        let store = InMemoryKvStore::new();
        let err = resolve_compiled_context(&b, Some(&store)).await.unwrap_err();
        assert!(matches!(err, ContextError::BlobNotFound { ref key } if key == "ctx:missing"));

        let err = resolve_compiled_context(&b, Some(&FailingStore)).await.unwrap_err();
        assert!(matches!(err, ContextError::LookupFailed { .. }));

        let store = InMemoryKvStore::new().with_field("ctx:missing", BLOB_FIELD, "garbage");
        let err = resolve_compiled_context(&b, Some(&store)).await.unwrap_err();
        assert!(matches!(err, ContextError::InvalidBlob { .. }));
    }

    #[tokio::test]
    async fn embedded_region_is_the_last_resort() {
        let system = format!("You are StatGPT.\n{EMBEDDED_OPEN}\n{BLOB}\n{EMBEDDED_CLOSE}\nBe brief.");
        let b = body(json!({ "system": system }));
        let r = resolve_compiled_context(&b, None).await.unwrap();
        assert_eq!(r.source, ContextSource::Embedded);
        assert_eq!(r.context.prompt, "p");
    }

    #[tokio::test]
    async fn broken_embedded_region_is_an_error() {
        let b = body(json!({ "system": format!("x {EMBEDDED_OPEN} {{\"prompt\": ") }));
        let err = resolve_compiled_context(&b, None).await.unwrap_err();
        assert!(matches!(err, ContextError::InvalidEmbedded(_)));

        let b = body(json!({ "system": format!("{EMBEDDED_OPEN}nope{EMBEDDED_CLOSE}") }));
        let err = resolve_compiled_context(&b, None).await.unwrap_err();
        assert!(matches!(err, ContextError::InvalidEmbedded(_)));
    }

    #[tokio::test]
    async fn nothing_supplied() {
        let b = body(json!({ "compiledInline": "", "compiledPointer": "  ", "system": "plain" }));
        let err = resolve_compiled_context(&b, None).await.unwrap_err();
        assert!(err.is_absent());
    }

    #[test]
    fn strip_removes_marker_region() {
        let system = format!("You are StatGPT.\n{EMBEDDED_OPEN}{BLOB}{EMBEDDED_CLOSE}\nBe brief.");
        assert_eq!(strip_embedded(&system), "You are StatGPT.\n\nBe brief.");
        assert_eq!(strip_embedded("no markers"), "no markers");
        assert_eq!(
            strip_embedded(&format!("{EMBEDDED_OPEN}{{}}{EMBEDDED_CLOSE}")),
            ""
        );
    }
}
