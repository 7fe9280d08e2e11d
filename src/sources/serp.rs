//! Search-engine results scraper.
//!
//! Scrapes Google's result page into [`SerpHit`]s. Organic results carry an
//! annotation row ("Rating: 4.2 · 1,204 ratings · ₹23,490") on shopping-ish
//! hits; we lift price/rating/reviews out of it as structured rich fields so
//! the pipeline can prefer them over free-text snippet extraction.

use std::sync::OnceLock;

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::service::SerpFetcher;
use super::{fetch_html, SourceError};
use crate::core::config::SearchEngineConfig;
use crate::core::types::SerpHit;

const MAX_RESULTS: usize = 10;

pub struct GoogleSerpFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl GoogleSerpFetcher {
    pub fn new(client: reqwest::Client, config: &SearchEngineConfig) -> Self {
        Self {
            client,
            base_url: config.resolve_base_url(),
        }
    }
}

fn normalize_serp_href(href: &str) -> Option<String> {
    if href.is_empty() {
        return None;
    }

    if href.starts_with("/url?") {
        if let Ok(url) = reqwest::Url::parse(&format!("https://www.google.com{}", href)) {
            for (k, v) in url.query_pairs() {
                if k == "q" && !v.is_empty() {
                    return Some(v.to_string());
                }
            }
        }
        return None;
    }

    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }

    None
}

fn domain_of(url: &str) -> Option<String> {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
}

fn extract_snippet(container: &ElementRef<'_>) -> String {
    // Result markup changes often. We try a few common patterns.
    let candidates = ["div.VwiC3b", "div.IsZvec", "span.aCOpRe", "div.MUxGbd"];

    for css in candidates {
        if let Ok(sel) = Selector::parse(css) {
            if let Some(n) = container.select(&sel).next() {
                let txt = n.text().collect::<Vec<_>>().join(" ");
                let trimmed = txt.split_whitespace().collect::<Vec<_>>().join(" ");
                if trimmed.len() >= 20 {
                    return trimmed;
                }
            }
        }
    }

    String::new()
}

fn row_price_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([₹$€£])\s*([0-9][0-9,]*(?:\.[0-9]+)?)").unwrap())
}

fn row_rating_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)rating:\s*([0-9]+(?:\.[0-9]+)?)").unwrap())
}

fn row_reviews_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)([0-9][0-9,]*)\s*(?:reviews?|ratings?|votes?)").unwrap())
}

struct RichFields {
    price: Option<String>,
    currency: Option<String>,
    rating: Option<String>,
    reviews: Option<String>,
}

/// Reads the annotation row under a result title, when present.
fn extract_rich_fields(container: &ElementRef<'_>) -> RichFields {
    let mut fields = RichFields {
        price: None,
        currency: None,
        rating: None,
        reviews: None,
    };

    let candidates = ["div.fG8Fp", "div.uo4vr", "span.oqSTJd"];
    for css in candidates {
        let Ok(sel) = Selector::parse(css) else {
            continue;
        };
        let Some(row) = container.select(&sel).next() else {
            continue;
        };
        let txt = row.text().collect::<Vec<_>>().join(" ");
        let row_text = txt.split_whitespace().collect::<Vec<_>>().join(" ");
        if row_text.is_empty() {
            continue;
        }

        if let Some(caps) = row_price_re().captures(&row_text) {
            fields.currency = caps.get(1).map(|m| m.as_str().to_string());
            fields.price = caps.get(2).map(|m| m.as_str().to_string());
        }
        if let Some(caps) = row_rating_re().captures(&row_text) {
            fields.rating = caps.get(1).map(|m| m.as_str().to_string());
        }
        if let Some(caps) = row_reviews_re().captures(&row_text) {
            fields.reviews = caps.get(1).map(|m| m.as_str().to_string());
        }

        if fields.price.is_some() || fields.rating.is_some() || fields.reviews.is_some() {
            break;
        }
    }
    fields
}

pub fn parse_results(html: &str, max_results: usize) -> Vec<SerpHit> {
    let doc = Html::parse_document(html);

    let container_selectors = ["div#search div.MjjYud", "div#search div.g"];
    let link_sel = Selector::parse("a").unwrap();
    let h3_sel = Selector::parse("h3").unwrap();

    let mut out = Vec::new();
    'outer: for css in container_selectors {
        let Ok(container_sel) = Selector::parse(css) else {
            continue;
        };

        for container in doc.select(&container_sel) {
            if out.len() >= max_results {
                break 'outer;
            }

            let mut chosen: Option<(String, String)> = None;
            for a in container.select(&link_sel) {
                if a.select(&h3_sel).next().is_some() {
                    let href = a.value().attr("href").unwrap_or("");
                    let url = match normalize_serp_href(href) {
                        Some(u) => u,
                        None => continue,
                    };
                    let title = a
                        .select(&h3_sel)
                        .next()
                        .map(|h| h.text().collect::<Vec<_>>().join(" "))
                        .unwrap_or_default();
                    let title = title.split_whitespace().collect::<Vec<_>>().join(" ");
                    if title.is_empty() {
                        continue;
                    }
                    chosen = Some((url, title));
                    break;
                }
            }

            let Some((url, title)) = chosen else {
                continue;
            };

            if url.contains("google.com") {
                continue;
            }

            let snippet = extract_snippet(&container);
            let rich = extract_rich_fields(&container);
            let domain = domain_of(&url);

            out.push(SerpHit {
                url,
                title,
                snippet,
                rich_price: rich.price,
                rich_currency: rich.currency,
                rich_rating: rich.rating,
                rich_reviews: rich.reviews,
                domain,
            });
        }

        if !out.is_empty() {
            break;
        }
    }

    out
}

#[async_trait]
impl SerpFetcher for GoogleSerpFetcher {
    async fn search(&self, query: &str) -> Result<Vec<SerpHit>, SourceError> {
        let encoded = utf8_percent_encode(query, NON_ALPHANUMERIC).to_string();
        let url = format!("{}?q={}&hl=en&num={}", self.base_url, encoded, MAX_RESULTS);
        let url = reqwest::Url::parse(&url)
            .map_err(|e| SourceError::Unavailable(format!("bad search url: {}", e)))?;

        debug!(%url, "serp search");
        let body = fetch_html(&self.client, url).await?;
        let hits = parse_results(&body, MAX_RESULTS);
        debug!(hits = hits.len(), "serp hits parsed");
        Ok(hits)
    }
}
