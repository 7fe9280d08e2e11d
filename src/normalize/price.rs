//! Price canonicalization.
//!
//! Canonical form is `₹<integer with thousands grouping>` (e.g. `₹11,990`),
//! with a fractional tail kept only when the source genuinely carried one.
//! Inputs that contain no digits at all pass through with a `₹` prefix so the
//! caller can still render *something* next to a listing.

use std::sync::OnceLock;

use aho_corasick::{AhoCorasick, AhoCorasickBuilder};
use regex::Regex;

/// Inclusive plausibility band for bare numeric price candidates pulled out
/// of free text. Symbol- or token-prefixed candidates are trusted as-is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceBand {
    pub min: f64,
    pub max: f64,
}

impl Default for PriceBand {
    fn default() -> Self {
        Self { min: 1_000.0, max: 200_000.0 }
    }
}

impl PriceBand {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

fn currency_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // "Rs." before "Rs" so the dot is eaten together with the token.
    RE.get_or_init(|| Regex::new(r"(?i)₹|INR|Rs\.|Rs").unwrap())
}

fn digit_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[0-9][0-9,\.]*").unwrap())
}

/// Groups a plain digit string into threes: `"200000"` -> `"200,000"`.
fn group_thousands(digits: &str) -> String {
    let bytes = digits.as_bytes();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 && (bytes.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(*b as char);
    }
    out
}

/// Normalizes a raw price string to the canonical `₹<grouped>` form.
///
/// Currency tokens (`₹`, `INR`, `Rs.`, `Rs`, any case) are stripped before
/// the first digit run is read. A single comma followed by exactly two
/// digits and no dot is treated as a decimal comma and the fraction is
/// dropped (`"6499,00"` -> `₹6,499`); otherwise commas are grouping noise.
/// A fractional dot tail survives only when it is not all zeros.
pub fn normalize_price(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let stripped = currency_token_re().replace_all(trimmed, "");
    let stripped = stripped.trim();

    let Some(m) = digit_run_re().find(stripped) else {
        // No digits anywhere: pass the text through, prefixed once.
        return if trimmed.contains('₹') {
            trimmed.to_string()
        } else {
            format!("₹{trimmed}")
        };
    };

    let run = m.as_str().trim_end_matches(['.', ',']);
    if run.is_empty() {
        return if trimmed.contains('₹') {
            trimmed.to_string()
        } else {
            format!("₹{trimmed}")
        };
    }

    let comma_count = run.matches(',').count();
    let (int_digits, frac_digits) = if comma_count == 1 && !run.contains('.') {
        let (head, tail) = run.split_once(',').unwrap_or((run, ""));
        if tail.len() == 2 {
            // European decimal comma; the fraction is dropped.
            (head.to_string(), String::new())
        } else {
            (run.replace(',', ""), String::new())
        }
    } else {
        let no_commas = run.replace(',', "");
        match no_commas.split_once('.') {
            Some((head, tail)) => (head.to_string(), tail.to_string()),
            None => (no_commas, String::new()),
        }
    };

    if int_digits.is_empty() {
        return if trimmed.contains('₹') {
            trimmed.to_string()
        } else {
            format!("₹{trimmed}")
        };
    }

    let significant = int_digits.trim_start_matches('0');
    let grouped = group_thousands(if significant.is_empty() { "0" } else { significant });
    let frac = frac_digits.trim_end_matches('0');
    if frac.is_empty() {
        format!("₹{grouped}")
    } else {
        format!("₹{grouped}.{frac}")
    }
}

fn symbol_price_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[₹$€£]\s*[0-9][0-9,]*(?:\.[0-9]+)?").unwrap())
}

fn token_price_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(?:rs\.?|inr)\s+[0-9][0-9,]*(?:\.[0-9]+)?").unwrap())
}

fn bare_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Lakh grouping before western grouping so "1,04,999" is taken whole.
        Regex::new(
            r"\b[0-9]{1,2}(?:,[0-9]{2})*,[0-9]{3}\b|\b[0-9]{1,3}(?:,[0-9]{3})+\b|\b[0-9]{3,}\b",
        )
        .unwrap()
    })
}

/// Spec-words that mark a nearby number as *not* a price.
fn disqualifier_matcher() -> &'static AhoCorasick {
    static MATCHER: OnceLock<AhoCorasick> = OnceLock::new();
    MATCHER.get_or_init(|| {
        AhoCorasickBuilder::new()
            .ascii_case_insensitive(true)
            .build(["resolution", "pixel", "refresh", "display", "model"])
            .unwrap_or_else(|_| AhoCorasick::new::<_, &str>([]).unwrap())
    })
}

const UNIT_FRAGMENTS: [&str; 3] = ["x", "hz", "degree"];

/// Up to `n` characters of `text` immediately before byte offset `at`.
fn chars_before(text: &str, at: usize, n: usize) -> String {
    let head: Vec<char> = text[..at].chars().rev().take(n).collect();
    head.into_iter().rev().collect()
}

/// Up to `n` characters of `text` starting at byte offset `at`.
fn chars_after(text: &str, at: usize, n: usize) -> String {
    text[at..].chars().take(n).collect()
}

/// Pulls the first plausible price out of free text, or returns `""`.
///
/// Three patterns are tried in priority order: symbol-prefixed amounts,
/// token-prefixed amounts (`Rs 6,499`, `INR 6499`), then bare grouped
/// (western `23,490` or lakh `1,04,999`) or 3+ digit numbers. Candidates
/// that carry a unit fragment (`1920x1080`, `120Hz`) or sit within ten
/// characters of a spec-word are skipped, as is a match that starts right
/// after `<digit>,` (the tail of a larger grouped amount). Bare numbers
/// must additionally fall inside `band`.
pub fn extract_price_from_text(text: &str, band: &PriceBand) -> String {
    let patterns = [symbol_price_re(), token_price_re(), bare_number_re()];
    for re in patterns {
        for m in re.find_iter(text) {
            let candidate = m.as_str();
            let lowered = candidate.to_lowercase();
            if UNIT_FRAGMENTS.iter().any(|frag| lowered.contains(frag)) {
                continue;
            }

            // Directly after "<digit>," the match is the tail of a larger
            // grouped amount, not an amount of its own.
            let mut preceding = text[..m.start()].chars().rev();
            if preceding.next() == Some(',')
                && preceding.next().is_some_and(|c| c.is_ascii_digit())
            {
                continue;
            }

            let window = format!(
                "{}{}{}",
                chars_before(text, m.start(), 10),
                candidate,
                chars_after(text, m.end(), 10)
            );
            if disqualifier_matcher().is_match(&window) {
                continue;
            }

            let purely_numeric = candidate
                .chars()
                .all(|c| c.is_ascii_digit() || c == ',' || c == '.');
            if purely_numeric {
                let value: f64 = match candidate.replace(',', "").parse() {
                    Ok(v) => v,
                    Err(_) => continue,
                };
                if !band.contains(value) {
                    continue;
                }
            }

            return candidate.split_whitespace().collect::<Vec<_>>().join(" ");
        }
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_form_is_idempotent() {
        assert_eq!(normalize_price("₹11,990"), "₹11,990");
        assert_eq!(normalize_price("₹1,999"), "₹1,999");
    }

    #[test]
    fn currency_tokens_are_stripped() {
        assert_eq!(normalize_price("Rs. 6499"), "₹6,499");
        assert_eq!(normalize_price("rs 6499"), "₹6,499");
        assert_eq!(normalize_price("INR 23490"), "₹23,490");
        assert_eq!(normalize_price("6499 INR"), "₹6,499");
    }

    #[test]
    fn decimal_comma_is_collapsed() {
        assert_eq!(normalize_price("6499,00 INR"), "₹6,499");
        assert_eq!(normalize_price("6499,00"), "₹6,499");
    }

    #[test]
    fn grouping_commas_are_reapplied() {
        assert_eq!(normalize_price("23,490"), "₹23,490");
        assert_eq!(normalize_price("200000"), "₹200,000");
        assert_eq!(normalize_price("999"), "₹999");
    }

    #[test]
    fn fractional_tail_survives_when_nonzero() {
        assert_eq!(normalize_price("1499.50"), "₹1,499.5");
        assert_eq!(normalize_price("1499.00"), "₹1,499");
    }

    #[test]
    fn digit_free_input_passes_through_prefixed() {
        assert_eq!(normalize_price("abc"), "₹abc");
        assert_eq!(normalize_price("₹ see listing"), "₹ see listing");
        assert_eq!(normalize_price(""), "");
        assert_eq!(normalize_price("   "), "");
    }

    #[test]
    fn extraction_prefers_symbol_prefixed_amounts() {
        let text = "Launched at 15999 but now ₹11,990 on sale";
        assert_eq!(extract_price_from_text(text, &PriceBand::default()), "₹11,990");
    }

    #[test]
    fn extraction_reads_token_prefixed_amounts() {
        let text = "best price Rs. 6,499 with bank offer";
        assert_eq!(extract_price_from_text(text, &PriceBand::default()), "Rs. 6,499");
        let text = "deal of the day INR 7299 only";
        assert_eq!(extract_price_from_text(text, &PriceBand::default()), "INR 7299");
    }

    #[test]
    fn bare_numbers_must_sit_inside_the_band() {
        let band = PriceBand::default();
        assert_eq!(extract_price_from_text("selling for 43999 today", &band), "43999");
        assert_eq!(extract_price_from_text("pack of 500 sheets", &band), "");
        assert_eq!(extract_price_from_text("warranty covers 999999 units", &band), "");
    }

    #[test]
    fn lakh_grouped_amounts_are_extracted_whole() {
        let band = PriceBand::default();
        let text = "Bravia 4K TV now at 1,04,999 with exchange offer";
        assert_eq!(extract_price_from_text(text, &band), "1,04,999");
        assert_eq!(normalize_price("1,04,999"), "₹104,999");
    }

    #[test]
    fn grouped_fragments_are_never_prices() {
        let band = PriceBand::default();
        // No word boundary before the full amount, so only the tail after
        // "1," could match; it must be dropped, not read as 4,999.
        assert_eq!(extract_price_from_text("SKU-A1,04,999 in stock", &band), "");
        // Over-band lakh amounts are rejected without surfacing a fragment.
        assert_eq!(extract_price_from_text("MRP 2,50,000 on launch", &band), "");
    }

    #[test]
    fn band_is_configurable() {
        let narrow = PriceBand { min: 100.0, max: 900.0 };
        assert_eq!(extract_price_from_text("sold at 500 apiece", &narrow), "500");
        assert_eq!(extract_price_from_text("sold at 5000 apiece", &narrow), "");
    }

    #[test]
    fn display_spec_numbers_are_not_prices() {
        let band = PriceBand::default();
        assert_eq!(extract_price_from_text("panel is 1920x1080 at 43999", &band), "43999");
        assert_eq!(extract_price_from_text("smooth 120Hz panel", &band), "");
    }

    #[test]
    fn spec_words_nearby_disqualify_a_number() {
        let band = PriceBand::default();
        assert_eq!(extract_price_from_text("model 43999", &band), "");
        assert_eq!(extract_price_from_text("2160 pixel display", &band), "");
        // Same number far away from the spec-word is fine.
        assert_eq!(
            extract_price_from_text("great display quality overall, yours for 43999", &band),
            "43999"
        );
    }

    #[test]
    fn no_candidate_yields_blank() {
        assert_eq!(extract_price_from_text("brand new in box", &PriceBand::default()), "");
        assert_eq!(extract_price_from_text("", &PriceBand::default()), "");
    }
}
