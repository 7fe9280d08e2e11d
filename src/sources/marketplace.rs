//! Marketplace search-page scraper.
//!
//! Scrapes the Amazon.in search results page into raw [`CandidateRecord`]s.
//! Every field is optional and verbatim; normalization happens later, in the
//! pipeline, so tests can feed raw fixtures straight through.

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::service::MarketplaceFetcher;
use super::{fetch_html, SourceError};
use crate::core::config::MarketplaceConfig;
use crate::core::types::CandidateRecord;

pub struct AmazonSearchFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl AmazonSearchFetcher {
    pub fn new(client: reqwest::Client, config: &MarketplaceConfig) -> Self {
        Self {
            client,
            base_url: config.resolve_base_url(),
        }
    }
}

/// Joins query words with '+', percent-encoding each word. `&` in category
/// names would otherwise terminate the `k=` parameter.
pub fn plus_joined_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(|word| utf8_percent_encode(word, NON_ALPHANUMERIC).to_string())
        .collect::<Vec<_>>()
        .join("+")
}

/// Rebases a relative href onto the marketplace origin. Absolute URLs and
/// anything that is not root-relative pass through untouched.
pub fn absolutize(base_url: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    if href.starts_with('/') {
        return format!("{}{}", base_url, href);
    }
    href.to_string()
}

fn text_of(node: &ElementRef<'_>) -> Option<String> {
    let joined = node.text().collect::<Vec<_>>().join(" ");
    let collapsed = joined.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

/// Parses the search results page into one record per result card.
///
/// Selectors follow the marketplace's stable data attributes: any field a
/// card does not carry is simply absent in the record.
pub fn parse_search_cards(html: &str) -> Vec<CandidateRecord> {
    let doc = Html::parse_document(html);

    let card_sel = Selector::parse("[data-component-type='s-search-result']").unwrap();
    let title_sel = Selector::parse("h2 span").unwrap();
    let reviews_sel = Selector::parse(".a-size-base").unwrap();
    let rating_sel = Selector::parse(".a-icon-star-small .a-icon-alt").unwrap();
    let price_sel = Selector::parse(".a-price .a-offscreen").unwrap();
    let link_sel = Selector::parse(".a-link-normal").unwrap();

    let mut out = Vec::new();
    for card in doc.select(&card_sel) {
        let title = card.select(&title_sel).next().and_then(|n| text_of(&n));
        let reviews_count = card.select(&reviews_sel).next().and_then(|n| text_of(&n));
        let rating = card.select(&rating_sel).next().and_then(|n| text_of(&n));
        let price = card.select(&price_sel).next().and_then(|n| text_of(&n));
        let url = card
            .select(&link_sel)
            .next()
            .and_then(|n| n.value().attr("href"))
            .map(|href| href.trim().to_string())
            .filter(|href| !href.is_empty());

        out.push(CandidateRecord {
            title,
            price,
            rating,
            reviews_count,
            url,
        });
    }
    out
}

#[async_trait]
impl MarketplaceFetcher for AmazonSearchFetcher {
    async fn search(&self, query: &str) -> Result<Vec<CandidateRecord>, SourceError> {
        let url = format!("{}/s?k={}", self.base_url, plus_joined_query(query));
        let url = reqwest::Url::parse(&url)
            .map_err(|e| SourceError::Unavailable(format!("bad marketplace url: {}", e)))?;

        debug!(%url, "marketplace search");
        let body = fetch_html(&self.client, url).await?;
        let cards = parse_search_cards(&body);
        debug!(cards = cards.len(), "marketplace cards parsed");
        Ok(cards)
    }
}
