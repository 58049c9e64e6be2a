//! Bounded digest of a compiled context for prompt injection.
//!
//! Output size is bounded by `ContextConfig`: the template preview and the
//! number of per-section lines are capped, and each part of a section line
//! (title, category list, snippet) is cut at `max_chars_per_section`, so the
//! prompt does not grow with the size of the authored context.

use serde_json::Value;
use statgpt_config::ContextConfig;
use statgpt_core::compiled::CompiledContext;

/// Meta keys rendered as header lines, in this order, when present.
const META_FIELDS: &[(&str, &str)] = &[
    ("matchup", "Matchup"),
    ("league", "League"),
    ("sport", "Sport"),
    ("season", "Season"),
    ("week", "Week"),
    ("date", "Date"),
    ("generated_at", "Generated"),
];

pub const SECTION_TRUNCATION_MARKER: &str = " …[truncated]";

/// Render the digest.
pub fn summarize(context: &CompiledContext, config: &ContextConfig) -> String {
    let mut lines: Vec<String> = Vec::new();

    for (key, label) in META_FIELDS {
        if let Some(value) = context.meta.get(*key).map(|v| v.trim()).filter(|v| !v.is_empty()) {
            lines.push(format!("{label}: {}", flatten(value)));
        }
    }

    let template = flatten(context.prompt.trim());
    if !template.is_empty() {
        let (preview, cut) = truncate_chars(&template, config.prompt_preview_chars);
        let ellipsis = if cut { "…" } else { "" };
        lines.push(format!("Template: {preview}{ellipsis}"));
    }

    let total = context.section_count();
    lines.push(format!("Sections: {total}"));

    for (title, section) in context.sections.iter().take(config.max_sections_inline) {
        lines.push(section_line(title, section, config.max_chars_per_section));
    }

    let omitted = total.saturating_sub(config.max_sections_inline);
    if omitted > 0 {
        lines.push(format!("(+{omitted} more sections omitted)"));
    }

    lines.join("\n")
}

fn section_line(title: &str, section: &Value, max_chars: usize) -> String {
    let title = capped(&flatten(title), max_chars);
    let categories = capped(&CompiledContext::categories(section).join(", "), max_chars);
    // Compact JSON of a Value cannot fail to serialize.
    let snippet = capped(&section.to_string(), max_chars);
    format!("- {title} [{categories}]: {snippet}")
}

/// `text` cut to `max` characters, with the truncation marker when cut.
fn capped(text: &str, max: usize) -> String {
    match truncate_chars(text, max) {
        (head, true) => format!("{head}{SECTION_TRUNCATION_MARKER}"),
        (head, false) => head.to_string(),
    }
}

/// Replace each line break (`\r\n`, `\n` or `\r`) with a single space.
fn flatten(text: &str) -> String {
    text.replace("\r\n", " ").replace(['\r', '\n'], " ")
}

/// First `max` characters and whether anything was cut.
fn truncate_chars(text: &str, max: usize) -> (&str, bool) {
    match text.char_indices().nth(max) {
        Some((idx, _)) => (&text[..idx], true),
        None => (text, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context(sections: usize) -> CompiledContext {
        let mut map = serde_json::Map::new();
        for i in 0..sections {
            map.insert(format!("Section {i}"), json!({ "stats": { "n": i }, "notes": "ok" }));
        }
        CompiledContext {
            meta: [("matchup", "BUF @ KC"), ("week", "7"), ("venue", "Arrowhead")]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            prompt: "Analyze\nthe matchup.".into(),
            sections: map,
        }
    }

    fn config(max_sections: usize, max_chars: usize) -> ContextConfig {
        ContextConfig {
            max_sections_inline: max_sections,
            max_chars_per_section: max_chars,
            ..ContextConfig::default()
        }
    }

    #[test]
    fn renders_header_template_and_sections() {
        let digest = summarize(&context(2), &ContextConfig::default());
        let lines: Vec<&str> = digest.lines().collect();
        assert_eq!(
            lines,
            [
                "Matchup: BUF @ KC",
                "Week: 7",
                "Template: Analyze the matchup.",
                "Sections: 2",
                "- Section 0 [stats, notes]: {\"stats\":{\"n\":0},\"notes\":\"ok\"}",
                "- Section 1 [stats, notes]: {\"stats\":{\"n\":1},\"notes\":\"ok\"}",
            ]
        );
    }

    #[test]
    fn section_lines_never_exceed_cap() {
        for total in [0, 3, 4, 25] {
            let digest = summarize(&context(total), &config(3, 1800));
            let section_lines = digest.lines().filter(|l| l.starts_with("- ")).count();
            assert_eq!(section_lines, total.min(3));
            let omitted = digest.lines().any(|l| l.ends_with("more sections omitted)"));
            assert_eq!(omitted, total > 3);
        }
        let digest = summarize(&context(25), &config(3, 1800));
        assert!(digest.ends_with("(+22 more sections omitted)"));
    }

    #[test]
    fn long_sections_are_truncated_with_marker() {
        let digest = summarize(&context(1), &config(12, 10));
        let line = digest.lines().find(|l| l.starts_with("- ")).unwrap();
        assert_eq!(
            line,
            "- Section 0 [stats, not …[truncated]]: {\"stats\":{ …[truncated]"
        );
    }

    #[test]
    fn many_categories_stay_within_cap() {
        let section: serde_json::Map<String, Value> = (0..5000)
            .map(|i| (format!("category_{i:05}"), json!(i)))
            .collect();
        let mut ctx = context(0);
        ctx.sections.insert("Wide".into(), Value::Object(section));

        let max = ContextConfig::default().max_chars_per_section;
        let digest = summarize(&ctx, &ContextConfig::default());
        let line = digest.lines().find(|l| l.starts_with("- Wide")).unwrap();
        let marker = SECTION_TRUNCATION_MARKER.chars().count();
        assert!(line.chars().count() <= 3 * (max + marker) + "- ".len() + " []: ".len());
        assert!(line.starts_with("- Wide [category_00000, category_00001, "));
        assert_eq!(line.matches(SECTION_TRUNCATION_MARKER).count(), 2);
    }

    #[test]
    fn long_titles_are_capped() {
        let mut ctx = context(0);
        ctx.sections.insert("T".repeat(50), json!({ "a": 1 }));
        let digest = summarize(&ctx, &config(12, 10));
        let line = digest.lines().find(|l| l.starts_with("- ")).unwrap();
        assert_eq!(line, "- TTTTTTTTTT …[truncated] [a]: {\"a\":1}");
    }

    #[test]
    fn line_breaks_become_single_spaces() {
        assert_eq!(flatten("a\n\n  b"), "a    b");
        assert_eq!(flatten("a\r\nb\rc"), "a b c");
        assert_eq!(flatten("  keep  spacing "), "  keep  spacing ");
    }

    #[test]
    fn template_preview_is_capped() {
        let mut ctx = context(0);
        ctx.prompt = "é".repeat(400);
        let digest = summarize(&ctx, &ContextConfig::default());
        let template = digest.lines().find(|l| l.starts_with("Template: ")).unwrap();
        assert_eq!(template.chars().count(), "Template: ".len() + 300 + 1);
        assert!(template.ends_with('…'));
    }

    #[test]
    fn empty_context_still_reports_count() {
        let digest = summarize(&CompiledContext::default(), &ContextConfig::default());
        assert_eq!(digest, "Sections: 0");
    }
}
