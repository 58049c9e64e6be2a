//! Reply postprocessing: guarantee a trailing `Signal:` line and a canonical
//! `Confidence: <Tier> (<NN>%)` line.
//!
//! Labels only count when anchored at the start of a line, optionally wrapped
//! in `*`/`_` emphasis. A per-item label such as `Leg Confidence: 75%` never
//! matches. Only the last confidence line is canonical and only that line is
//! ever rewritten.

use regex_lite::{Captures, Regex};
use statgpt_config::{ConfidenceConfig, TierPercentages};
use std::sync::OnceLock;

fn signal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?mi)^[ \t]*[*_]{0,2}Signal[*_]{0,2}:").expect("signal regex must compile")
    })
}

fn confidence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?mi)^(?P<prefix>[ \t]*[*_]{0,2}Confidence[*_]{0,2}:[*_]{0,2}[ \t]*)(?P<body>[^\r\n]*)",
        )
        .expect("confidence regex must compile")
    })
}

fn percent_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{1,3}\s*%").expect("percent regex must compile"))
}

fn tier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(?P<tier>very\s*low|low|medium|high|very\s*high)\b(?P<tail>.*)$")
            .expect("tier regex must compile")
    })
}

/// Canonicalizes the trailing signal and confidence lines of a reply.
#[derive(Debug, Clone)]
pub struct ConfidenceNormalizer {
    default_signal: String,
    fallback_pct: u8,
    tiers: TierPercentages,
}

impl ConfidenceNormalizer {
    pub fn new(config: &ConfidenceConfig) -> Self {
        Self {
            default_signal: config.default_signal.clone(),
            fallback_pct: config.fallback_pct,
            tiers: config.tiers.clone(),
        }
    }

    /// Default percentage for a tier word as written (case and inner spacing ignored).
    fn tier_pct(&self, tier: &str) -> u8 {
        let key: String = tier
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "verylow" => self.tiers.very_low,
            "low" => self.tiers.low,
            "medium" => self.tiers.medium,
            "high" => self.tiers.high,
            "veryhigh" => self.tiers.very_high,
            _ => self.fallback_pct,
        }
    }

    /// Normalize a reply. Blank replies are returned unchanged.
    pub fn normalize(&self, reply: &str) -> String {
        if reply.trim().is_empty() {
            return reply.to_string();
        }

        let mut text = reply.to_string();
        if !signal_re().is_match(&text) {
            text = format!("{}\n\nSignal: {}", text.trim_end(), self.default_signal);
        }

        let replacement = {
            let Some(last) = confidence_re().captures_iter(&text).last() else {
                return format!(
                    "{}\nConfidence: Medium ({}%)",
                    text.trim_end(),
                    self.tiers.medium
                );
            };
            match (self.rewrite(&last), last.get(0), last.name("body")) {
                (Some(line), Some(whole), Some(body)) => Some((whole.start(), body.end(), line)),
                _ => None,
            }
        };

        match replacement {
            Some((start, end, line)) => format!("{}{}{}", &text[..start], line, &text[end..]),
            None => text,
        }
    }

    /// Replacement for the canonical line, or `None` when it already carries a percentage.
    fn rewrite(&self, caps: &Captures<'_>) -> Option<String> {
        let prefix = caps.name("prefix").map_or("", |m| m.as_str());
        let body = caps.name("body").map_or("", |m| m.as_str()).trim();

        if percent_re().is_match(body) {
            return None;
        }

        if body.is_empty() {
            return Some(format!("{} Medium ({}%)", prefix.trim_end(), self.tiers.medium));
        }

        if let Some(tier) = tier_re().captures(body) {
            let word = tier.name("tier").map_or("", |m| m.as_str());
            let tail = tier.name("tail").map_or("", |m| m.as_str());
            return Some(format!("{prefix}{word} ({}%){tail}", self.tier_pct(word)));
        }

        Some(format!("{prefix}{body} ({}%)", self.fallback_pct))
    }
}

impl Default for ConfidenceNormalizer {
    fn default() -> Self {
        Self::new(&ConfidenceConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize(text: &str) -> String {
        ConfidenceNormalizer::default().normalize(text)
    }

    #[test]
    fn leg_confidence_is_not_canonical() {
        let out = normalize("Leg Confidence: 75%\nSignal: Over\nConfidence: High");
        assert_eq!(out, "Leg Confidence: 75%\nSignal: Over\nConfidence: High (75%)");
    }

    #[test]
    fn appends_defaults_when_both_lines_missing() {
        let out = normalize("Chiefs look strong at home.\n");
        assert_eq!(
            out,
            "Chiefs look strong at home.\n\nSignal: See notes above\nConfidence: Medium (60%)"
        );
    }

    #[test]
    fn tier_tail_is_preserved() {
        let out = normalize("Signal: Under\nConfidence: Low – weather risk");
        assert_eq!(out, "Signal: Under\nConfidence: Low (40%) – weather risk");
    }

    #[test]
    fn existing_percentage_is_left_alone() {
        let text = "Signal: Over\n**Confidence:** High (80 %)";
        assert_eq!(normalize(text), text);
    }

    #[test]
    fn only_last_confidence_line_is_rewritten() {
        let out = normalize("Confidence: Low\nmore notes\nSignal: Over\nconfidence: very high");
        assert_eq!(
            out,
            "Confidence: Low\nmore notes\nSignal: Over\nconfidence: very high (85%)"
        );
    }

    #[test]
    fn emphasis_wrapped_labels_match() {
        let out = normalize("**Signal:** Over\n**Confidence:** Medium");
        assert_eq!(out, "**Signal:** Over\n**Confidence:** Medium (60%)");

        let out = normalize("_Signal_: Over\n  Confidence: VeryLow");
        assert_eq!(out, "_Signal_: Over\n  Confidence: VeryLow (25%)");
    }

    #[test]
    fn unrecognized_body_gets_fallback_percentage() {
        let out = normalize("Signal: Pass\nConfidence: moderate-ish");
        assert_eq!(out, "Signal: Pass\nConfidence: moderate-ish (60%)");
    }

    #[test]
    fn empty_confidence_body_becomes_medium() {
        let out = normalize("Signal: Pass\nConfidence:\nfin");
        assert_eq!(out, "Signal: Pass\nConfidence: Medium (60%)\nfin");
    }

    #[test]
    fn signal_missing_but_confidence_present() {
        let out = normalize("Take the over.\nConfidence: High");
        assert_eq!(
            out,
            "Take the over.\nConfidence: High (75%)\n\nSignal: See notes above"
        );
    }

    #[test]
    fn crlf_line_endings_are_respected() {
        let out = normalize("Signal: Over\r\nConfidence: High\r\n");
        assert_eq!(out, "Signal: Over\r\nConfidence: High (75%)\r\n");
    }

    #[test]
    fn blank_reply_is_unchanged() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("  \n"), "  \n");
    }

    #[test]
    fn normalization_is_idempotent() {
        let samples = [
            "",
            "plain answer",
            "Leg Confidence: 75%\nSignal: Over\nConfidence: High",
            "Signal: Under\nConfidence: Low – weather risk",
            "Confidence:",
            "Take the over.\nConfidence: High",
            "**Confidence:** whatever\n",
            "Signal: x\nConfidence: 70%",
            "Signal: Over\r\nConfidence: very  high\r\n",
        ];
        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn custom_tier_table_is_used() {
        let mut config = ConfidenceConfig::default();
        config.tiers.high = 70;
        let out = ConfidenceNormalizer::new(&config).normalize("Signal: x\nConfidence: High");
        assert_eq!(out, "Signal: x\nConfidence: High (70%)");
    }
}
