//! Extraction of the lookup record from a free-text LLM reply.
//!
//! Replies arrive as bare JSON, fenced ```json blocks, or JSON buried in
//! prose. We strip fence markers, cut the first-`{`-to-last-`}` span, and
//! parse that. Tolerant by design: a reply we cannot read is simply no data.

use serde_json::Value;

/// The three fields the web-search lookup is asked for. `None` means the
/// reply did not carry a usable value for that field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LookupFields {
    pub price: Option<String>,
    pub rating: Option<String>,
    pub reviews_count: Option<String>,
}

fn read_field(record: &Value, key: &str) -> Option<String> {
    match record.get(key) {
        Some(Value::String(s)) => {
            let text = s.trim();
            if text.is_empty() || text == "null" {
                None
            } else {
                Some(text.to_string())
            }
        }
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Parses a lookup reply into its three fields.
///
/// Returns `None` when no JSON object can be located, when it fails to
/// parse, or when all three fields are absent/`"null"`; the caller treats
/// all of those identically as "the lookup found nothing".
pub fn parse_lookup_reply(reply: &str) -> Option<LookupFields> {
    let text = reply.trim();
    let unfenced = if text.starts_with("```") {
        text.replace("```json", "").replace("```", "")
    } else {
        text.to_string()
    };
    let unfenced = unfenced.trim();

    let start = unfenced.find('{')?;
    let end = unfenced.rfind('}')?;
    if end < start {
        return None;
    }

    let record: Value = serde_json::from_str(&unfenced[start..=end]).ok()?;
    let fields = LookupFields {
        price: read_field(&record, "price"),
        rating: read_field(&record, "rating"),
        reviews_count: read_field(&record, "reviews_count"),
    };

    if fields.price.is_none() && fields.rating.is_none() && fields.reviews_count.is_none() {
        return None;
    }
    Some(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_bare_json() {
        let fields = parse_lookup_reply(
            r#"{"reviews_count": "1,204 ratings", "rating": "4.2/5", "price": "₹23,490"}"#,
        )
        .unwrap();
        assert_eq!(fields.price.as_deref(), Some("₹23,490"));
        assert_eq!(fields.rating.as_deref(), Some("4.2/5"));
        assert_eq!(fields.reviews_count.as_deref(), Some("1,204 ratings"));
    }

    #[test]
    fn strips_code_fences() {
        let reply = "```json\n{\"price\": \"Rs. 6499\", \"rating\": null, \"reviews_count\": null}\n```";
        let fields = parse_lookup_reply(reply).unwrap();
        assert_eq!(fields.price.as_deref(), Some("Rs. 6499"));
        assert_eq!(fields.rating, None);
    }

    #[test]
    fn skips_leading_prose() {
        let reply = "Here is what I found:\n{\"price\": \"6,499\", \"rating\": \"4.3\", \"reviews_count\": \"87\"}\nHope that helps!";
        let fields = parse_lookup_reply(reply).unwrap();
        assert_eq!(fields.price.as_deref(), Some("6,499"));
    }

    #[test]
    fn numeric_values_are_stringified() {
        let fields =
            parse_lookup_reply(r#"{"price": 23490, "rating": 4.2, "reviews_count": 1204}"#)
                .unwrap();
        assert_eq!(fields.price.as_deref(), Some("23490"));
        assert_eq!(fields.rating.as_deref(), Some("4.2"));
        assert_eq!(fields.reviews_count.as_deref(), Some("1204"));
    }

    #[test]
    fn null_string_means_absent() {
        let reply = r#"{"price": "null", "rating": "null", "reviews_count": "null"}"#;
        assert_eq!(parse_lookup_reply(reply), None);
    }

    #[test]
    fn all_null_or_garbage_is_no_data() {
        assert_eq!(
            parse_lookup_reply(r#"{"price": null, "rating": null, "reviews_count": null}"#),
            None
        );
        assert_eq!(parse_lookup_reply("I could not find that product."), None);
        assert_eq!(parse_lookup_reply("{not json at all}"), None);
        assert_eq!(parse_lookup_reply(""), None);
    }

    #[test]
    fn partial_data_still_counts() {
        let fields = parse_lookup_reply(r#"{"price": "₹9,999", "rating": "null"}"#).unwrap();
        assert_eq!(fields.price.as_deref(), Some("₹9,999"));
        assert_eq!(fields.rating, None);
        assert_eq!(fields.reviews_count, None);
    }
}
