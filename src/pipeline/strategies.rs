//! The three listing sources, in cascade priority order:
//! search engine, marketplace scrape, AI web-search lookup.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;
use tracing::warn;

use super::{is_blank, ListingSource, PartialListing};
use crate::catalog::format_factor;
use crate::core::types::{ProductQuery, SerpHit};
use crate::normalize::ai_reply::parse_lookup_reply;
use crate::normalize::price::{extract_price_from_text, normalize_price, PriceBand};
use crate::normalize::rating::normalize_rating;
use crate::oracle::MatchOracle;
use crate::sources::marketplace::absolutize;
use crate::sources::service::{AiLookup, MarketplaceFetcher, SerpFetcher};
use crate::sources::SourceError;

/// Domains whose prices are trusted for the cheapest-match fallback.
const ECOMMERCE_DOMAINS: [&str; 8] = [
    "amazon.in",
    "flipkart.com",
    "croma.com",
    "reliancedigital.in",
    "vijaysales.com",
    "tatacliq.com",
    "jiomart.com",
    "snapdeal.com",
];

fn snippet_rating_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[0-9](?:\.[0-9]+)?\s*(?:out of 5|/\s*5)").unwrap())
}

fn snippet_reviews_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)([0-9][0-9,]*)\s*(?:ratings?|reviews?)").unwrap())
}

fn domain_matches(domain: Option<&str>, site: &str) -> bool {
    let Some(domain) = domain else {
        return false;
    };
    domain == site || domain.ends_with(&format!(".{}", site))
}

fn mentions_model(hit: &SerpHit, model_lower: &str) -> bool {
    hit.title.to_lowercase().contains(model_lower) || hit.url.to_lowercase().contains(model_lower)
}

/// Numeric value of a price string, for cheapest-candidate comparison.
fn price_value(price: &str) -> Option<f64> {
    let digits: String = price
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Price of one hit: structured rich field first, snippet extraction second.
fn hit_price(hit: &SerpHit, band: &PriceBand) -> Option<String> {
    if let Some(price) = hit.rich_price.as_deref().filter(|p| !p.trim().is_empty()) {
        let currency = hit.rich_currency.as_deref().unwrap_or_default();
        return Some(normalize_price(&format!("{}{}", currency, price)));
    }

    let extracted = extract_price_from_text(&hit.snippet, band);
    if extracted.is_empty() {
        None
    } else {
        Some(normalize_price(&extracted))
    }
}

fn hit_rating(hit: &SerpHit) -> Option<String> {
    if let Some(rating) = hit.rich_rating.as_deref().filter(|r| !r.trim().is_empty()) {
        let normalized = normalize_rating(rating);
        if !normalized.is_empty() {
            return Some(normalized);
        }
    }

    let m = snippet_rating_re().find(&hit.snippet)?;
    let normalized = normalize_rating(m.as_str());
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

fn hit_reviews(hit: &SerpHit) -> Option<String> {
    if let Some(reviews) = hit.rich_reviews.as_deref().filter(|r| !r.trim().is_empty()) {
        return Some(reviews.to_string());
    }

    snippet_reviews_re()
        .captures(&hit.snippet)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Highest-priority source: scan SERP hits for a marketplace listing of the
/// exact model, reading price/rating/reviews from rich-result fields with
/// free-text fallbacks.
pub struct SerpStrategy {
    fetcher: Arc<dyn SerpFetcher>,
    marketplace_host: String,
    band: PriceBand,
}

impl SerpStrategy {
    pub fn new(fetcher: Arc<dyn SerpFetcher>, marketplace_host: String, band: PriceBand) -> Self {
        Self {
            fetcher,
            marketplace_host,
            band,
        }
    }

    fn on_marketplace(&self, hit: &SerpHit) -> bool {
        domain_matches(hit.domain.as_deref(), &self.marketplace_host)
    }

    fn on_known_shop(hit: &SerpHit) -> bool {
        ECOMMERCE_DOMAINS
            .iter()
            .any(|site| domain_matches(hit.domain.as_deref(), site))
    }

    /// Price fallback when the chosen marketplace hit carries none: another
    /// marketplace hit for the same model wins outright; otherwise the
    /// cheapest plausible price across known shop domains is taken, which
    /// guards against inflated or irrelevant matches.
    fn price_from_other_hits(&self, hits: &[SerpHit], skip: usize, model: &str) -> Option<String> {
        for (i, hit) in hits.iter().enumerate() {
            if i == skip || !mentions_model(hit, model) {
                continue;
            }
            if !self.on_marketplace(hit) {
                continue;
            }
            if let Some(price) = hit_price(hit, &self.band) {
                return Some(price);
            }
        }

        let mut cheapest: Option<(f64, String)> = None;
        for (i, hit) in hits.iter().enumerate() {
            if i == skip || !mentions_model(hit, model) {
                continue;
            }
            if !Self::on_known_shop(hit) {
                continue;
            }
            let Some(price) = hit_price(hit, &self.band) else {
                continue;
            };
            let Some(value) = price_value(&price) else {
                continue;
            };
            if cheapest.as_ref().map_or(true, |(best, _)| value < *best) {
                cheapest = Some((value, price));
            }
        }
        cheapest.map(|(_, price)| price)
    }
}

#[async_trait]
impl ListingSource for SerpStrategy {
    fn name(&self) -> &'static str {
        "serp"
    }

    async fn lookup(&self, query: &ProductQuery) -> Result<PartialListing, SourceError> {
        let serp_query = format!("{} {}", query.brand, query.model_number);
        let hits = self.fetcher.search(&serp_query).await?;

        let model = query.model_number.to_lowercase();
        let Some(pos) = hits
            .iter()
            .position(|h| self.on_marketplace(h) && mentions_model(h, &model))
        else {
            return Err(SourceError::Empty);
        };
        let hit = &hits[pos];

        let mut listing = PartialListing {
            title: Some(hit.title.clone()),
            url: Some(hit.url.clone()),
            price: hit_price(hit, &self.band),
            rating: hit_rating(hit),
            reviews_count: hit_reviews(hit),
        };

        if is_blank(&listing.price) {
            listing.price = self.price_from_other_hits(&hits, pos, &model);
        }

        Ok(listing)
    }
}

/// Mid-priority source: first marketplace search card whose title carries
/// the model number and is confirmed in-category by the oracle.
pub struct MarketplaceStrategy {
    fetcher: Arc<dyn MarketplaceFetcher>,
    oracle: Arc<dyn MatchOracle>,
    base_url: String,
}

impl MarketplaceStrategy {
    pub fn new(
        fetcher: Arc<dyn MarketplaceFetcher>,
        oracle: Arc<dyn MatchOracle>,
        base_url: String,
    ) -> Self {
        Self {
            fetcher,
            oracle,
            base_url,
        }
    }
}

#[async_trait]
impl ListingSource for MarketplaceStrategy {
    fn name(&self) -> &'static str {
        "marketplace"
    }

    async fn lookup(&self, query: &ProductQuery) -> Result<PartialListing, SourceError> {
        let factor_with_unit = format_factor(&query.category, &query.factor);
        let search_query = format!(
            "{} {} {} {}",
            query.brand, factor_with_unit, query.category, query.model_number
        );
        let search_query = search_query.split_whitespace().collect::<Vec<_>>().join(" ");

        let cards = self.fetcher.search(&search_query).await?;

        let model = query.model_number.to_lowercase();
        for card in cards {
            let Some(title) = card.title else {
                continue;
            };
            if !title.to_lowercase().contains(&model) {
                continue;
            }

            let confirmed = match self.oracle.category_match(&title, &query.category).await {
                Ok(verdict) => verdict,
                Err(e) => {
                    warn!("category oracle failed (treated as no): {}", e);
                    false
                }
            };
            if !confirmed {
                continue;
            }

            return Ok(PartialListing {
                title: Some(title),
                price: card
                    .price
                    .as_deref()
                    .map(normalize_price)
                    .filter(|p| !p.is_empty()),
                rating: card
                    .rating
                    .as_deref()
                    .map(normalize_rating)
                    .filter(|r| !r.is_empty()),
                reviews_count: card.reviews_count,
                url: card.url.as_deref().map(|u| absolutize(&self.base_url, u)),
            });
        }

        Err(SourceError::Empty)
    }
}

/// Last-resort source: ask an LLM with web search for the three listing
/// numbers. It has no listing to quote, so the title is synthesized and the
/// url stays blank.
pub struct AiLookupStrategy {
    lookup: Arc<dyn AiLookup>,
}

impl AiLookupStrategy {
    pub fn new(lookup: Arc<dyn AiLookup>) -> Self {
        Self { lookup }
    }
}

fn lookup_prompt(brand: &str, model: &str, factor_with_unit: &str, category: &str) -> String {
    format!(
        "Search the web for the current price, ratings and reviews for {brand} {model} {factor_with_unit} {category}. \
         Find the actual current information and return it in this exact JSON format:\n\
         {{\n  \
         \"reviews_count\": \"[actual number of reviews]\",\n  \
         \"rating\": \"[actual rating out of 5 stars]\",\n  \
         \"price\": \"[actual current price in INR]\"\n\
         }}\n\n\
         Important: Search for the real current data, not example data. If not found, return null for all fields."
    )
}

#[async_trait]
impl ListingSource for AiLookupStrategy {
    fn name(&self) -> &'static str {
        "ai_lookup"
    }

    async fn lookup(&self, query: &ProductQuery) -> Result<PartialListing, SourceError> {
        let factor_with_unit = format_factor(&query.category, &query.factor);
        let prompt = lookup_prompt(
            &query.brand,
            &query.model_number,
            &factor_with_unit,
            &query.category,
        );

        let reply = self.lookup.ask(&prompt).await?;
        let Some(fields) = parse_lookup_reply(&reply) else {
            return Err(SourceError::Empty);
        };

        Ok(PartialListing {
            title: Some(format!("{} {}", query.brand, query.model_number)),
            price: fields
                .price
                .as_deref()
                .map(normalize_price)
                .filter(|p| !p.is_empty()),
            rating: fields
                .rating
                .as_deref()
                .map(normalize_rating)
                .filter(|r| !r.is_empty()),
            reviews_count: fields.reviews_count,
            // No listing to point at.
            url: None,
        })
    }
}
