//! System prompt assembly.

use crate::request::Mode;

pub const CONTEXT_HEADING: &str = "COMPILED_STATS_SUMMARY:";
pub const SLIP_HEADING: &str = "SLIP_EXTRACT_JSON:";
pub const JSON_ONLY_INSTRUCTION: &str = "Return ONLY valid JSON. No markdown. No extra text.";

pub const GUIDELINES: &str = "Guidelines:\n\
- Answer like a helpful sports analyst.\n\
- If an image is provided, you CAN analyze it (including reading text in it).\n\
- Keep it concise. Use bullets when helpful.\n\
- Do not mention internal tools or infrastructure.\n";

/// Append the context digest, slip payload and mode-specific tail to `base`.
///
/// Extraction modes skip the guideline block; it pushes the model toward prose
/// and breaks JSON-only output.
pub fn build_system_prompt(
    base: &str,
    digest: Option<&str>,
    slip: Option<&str>,
    mode: Mode,
) -> String {
    let mut system = base.trim().to_string();

    let mut section = |heading: &str, body: &str| {
        if !system.is_empty() {
            system.push_str("\n\n");
        }
        system.push_str(heading);
        if !body.is_empty() {
            system.push('\n');
            system.push_str(body);
        }
    };

    if let Some(digest) = digest {
        section(CONTEXT_HEADING, digest);
    }
    if let Some(slip) = slip {
        section(SLIP_HEADING, slip);
    }
    if mode.requires_json_only() {
        section(JSON_ONLY_INSTRUCTION, "");
    }
    if !mode.is_extract() {
        section(GUIDELINES, "");
    }

    system
}
