//! Outbound listing sources and the plumbing they share.
//!
//! Every fetcher goes through [`fetch_html`], which rotates the user agent
//! and turns block pages into [`SourceError::RateLimited`] so the pipeline
//! can log *why* a source contributed nothing.

pub mod ai_lookup;
pub mod marketplace;
pub mod serp;
pub mod service;

use reqwest::StatusCode;
use thiserror::Error;

/// Why a source contributed nothing to a resolution.
///
/// The pipeline handles every variant identically (log, move to the next
/// source); the distinction exists for logs and tests.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Missing credential or configuration; the source was never called.
    #[error("source unavailable: {0}")]
    Unavailable(String),
    /// The call succeeded but yielded nothing usable.
    #[error("source returned no usable data")]
    Empty,
    /// The reply could not be read as the expected shape.
    #[error("malformed reply: {0}")]
    Malformed(String),
    /// The source explicitly signalled throttling or served a block page.
    #[error("rate limited: {reason}")]
    RateLimited { reason: String },
    /// Transport-level failure.
    #[error("http error: {0}")]
    Http(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Http(err.to_string())
    }
}

/// Desktop-only pool: the marketplace serves different result markup to
/// mobile user agents, which would break the card selectors.
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0",
];

pub fn random_user_agent() -> &'static str {
    use rand::seq::IndexedRandom;
    USER_AGENTS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

pub fn detect_block_reason(status: StatusCode, body: &str) -> Option<String> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Some("http_429".to_string());
    }
    if status == StatusCode::FORBIDDEN {
        return Some("http_403".to_string());
    }
    if status == StatusCode::SERVICE_UNAVAILABLE {
        return Some("http_503".to_string());
    }

    let lower = body.to_lowercase();
    let maybe = [
        ("unusual traffic", "unusual_traffic"),
        (
            "sorry, but your computer or network may be sending automated queries",
            "captcha",
        ),
        ("api-services-support@amazon.com", "captcha"),
        ("type the characters you see in this image", "captcha"),
        ("captcha", "captcha"),
        ("recaptcha", "captcha"),
        ("verify you are human", "captcha"),
        ("enable javascript", "js_required"),
        ("access denied", "access_denied"),
    ];

    for (needle, label) in maybe {
        if lower.contains(needle) {
            return Some(label.to_string());
        }
    }

    // Heuristic: tiny HTML + any block-ish token
    if body.len() < 3500 && (lower.contains("captcha") || lower.contains("blocked")) {
        return Some("block_page".to_string());
    }

    None
}

/// Fetches a page with a rotated user agent and browser-ish headers.
///
/// Block pages become `RateLimited` and other non-success statuses become
/// `Http`, so callers only ever see a body they can parse.
pub async fn fetch_html(client: &reqwest::Client, url: reqwest::Url) -> Result<String, SourceError> {
    let resp = client
        .get(url)
        .header("User-Agent", random_user_agent())
        .header("Accept", "text/html,application/xhtml+xml")
        .header(
            "Accept-Language",
            std::env::var("SCRAPE_ACCEPT_LANGUAGE").unwrap_or_else(|_| "en-IN,en;q=0.9".into()),
        )
        .send()
        .await?;

    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();

    if let Some(reason) = detect_block_reason(status, &body) {
        return Err(SourceError::RateLimited { reason });
    }
    if !status.is_success() {
        return Err(SourceError::Http(format!("status {}", status)));
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throttling_statuses_are_recognized() {
        assert_eq!(
            detect_block_reason(StatusCode::TOO_MANY_REQUESTS, ""),
            Some("http_429".to_string())
        );
        assert_eq!(
            detect_block_reason(StatusCode::FORBIDDEN, ""),
            Some("http_403".to_string())
        );
        assert_eq!(
            detect_block_reason(StatusCode::SERVICE_UNAVAILABLE, ""),
            Some("http_503".to_string())
        );
    }

    #[test]
    fn captcha_bodies_are_recognized() {
        let body = "<html>Type the characters you see in this image</html>";
        assert_eq!(
            detect_block_reason(StatusCode::OK, body),
            Some("captcha".to_string())
        );
    }

    #[test]
    fn ordinary_pages_pass() {
        let page = format!("<html><body>{}</body></html>", "result ".repeat(600));
        assert_eq!(detect_block_reason(StatusCode::OK, &page), None);
    }

    #[test]
    fn user_agent_pool_is_desktop_only() {
        assert!(!USER_AGENTS.is_empty());
        for ua in USER_AGENTS {
            assert!(ua.contains("Mozilla"));
            assert!(!ua.contains("Mobile"));
        }
        assert!(USER_AGENTS.contains(&random_user_agent()));
    }
}
