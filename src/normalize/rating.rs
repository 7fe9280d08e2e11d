//! Rating canonicalization.
//!
//! Canonical form is `"<value> out of 5 stars"`. Anything that cannot be
//! coerced into it becomes blank; this function never fails.

use std::sync::OnceLock;

use aho_corasick::{AhoCorasick, AhoCorasickBuilder};

/// Phrases an LLM or snippet uses when it has no real rating to offer.
const DESCRIPTIVE_PHRASES: [&str; 7] = [
    "not explicitly provided",
    "not available",
    "not found",
    "generally rated well",
    "based on the context",
    "no rating",
    "unavailable",
];

fn descriptive_matcher() -> &'static AhoCorasick {
    static MATCHER: OnceLock<AhoCorasick> = OnceLock::new();
    MATCHER.get_or_init(|| {
        AhoCorasickBuilder::new()
            .ascii_case_insensitive(true)
            .build(DESCRIPTIVE_PHRASES)
            .unwrap_or_else(|_| AhoCorasick::new::<_, &str>([]).unwrap())
    })
}

/// Normalizes arbitrary rating text to `"<value> out of 5 stars"` or `""`.
///
/// Recognized inputs, in order: `"X/5"` (with or without a trailing
/// `" stars"`), `"X out of 5"` (appends `" stars"` when missing), and a bare
/// numeric value in `[0, 5]`. Descriptive prose is rejected outright.
pub fn normalize_rating(raw: &str) -> String {
    let text = raw.trim();
    if text.is_empty() {
        return String::new();
    }

    if descriptive_matcher().is_match(text) {
        return String::new();
    }

    if let Some(idx) = text.find("/5") {
        let value = text[..idx].trim();
        if !value.is_empty() {
            return format!("{value} out of 5 stars");
        }
        return String::new();
    }

    if text.contains("out of 5") {
        if text.contains("stars") {
            return text.to_string();
        }
        return format!("{text} stars");
    }

    if let Ok(value) = text.parse::<f64>() {
        if (0.0..=5.0).contains(&value) {
            return format!("{text} out of 5 stars");
        }
    }

    String::new()
}
