//! Resolution pipeline.
//!
//! Main-product resolution is a priority cascade over an ordered list of
//! [`ListingSource`]s. Each source returns a partial record that is folded
//! into an accumulator filling only blank fields; the cascade stops as soon
//! as price, rating, and reviews are all known. Competitor resolution runs
//! once afterwards over a separate category-level candidate list.

pub mod strategies;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::catalog::{factor_unit, format_factor, title_mentions_factor};
use crate::core::types::{
    BulkResolveEntry, BulkResolveResponse, CompetitorProduct, ProductQuery, ResolvedProduct,
};
use crate::normalize::price::normalize_price;
use crate::oracle::MatchOracle;
use crate::sources::marketplace::absolutize;
use crate::sources::service::MarketplaceFetcher;
use crate::sources::SourceError;

const MAX_COMPETITORS: usize = 5;

pub(crate) fn is_blank(slot: &Option<String>) -> bool {
    slot.as_deref().map_or(true, |v| v.trim().is_empty())
}

/// Accumulator for the priority cascade. A field, once set from a
/// higher-priority source, is never overwritten by a lower-priority one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialListing {
    pub title: Option<String>,
    pub price: Option<String>,
    pub rating: Option<String>,
    pub reviews_count: Option<String>,
    pub url: Option<String>,
}

fn fill(slot: &mut Option<String>, value: Option<String>) {
    if !is_blank(slot) {
        return;
    }
    if let Some(v) = value {
        if !v.trim().is_empty() {
            *slot = Some(v);
        }
    }
}

impl PartialListing {
    /// Field-level first-writer-wins merge: only blank fields take values.
    pub fn fill_from(&mut self, other: PartialListing) {
        fill(&mut self.title, other.title);
        fill(&mut self.price, other.price);
        fill(&mut self.rating, other.rating);
        fill(&mut self.reviews_count, other.reviews_count);
        fill(&mut self.url, other.url);
    }

    /// The cascade stops once price, rating, and reviews are all non-blank.
    pub fn is_complete(&self) -> bool {
        !is_blank(&self.price) && !is_blank(&self.rating) && !is_blank(&self.reviews_count)
    }

    /// A record with neither title nor url identifies nothing and resolves
    /// to `None`; everything else keeps whatever fields it has, blanked.
    pub fn into_resolved(self) -> Option<ResolvedProduct> {
        let title = self.title.unwrap_or_default();
        let url = self.url.unwrap_or_default();
        if title.trim().is_empty() && url.trim().is_empty() {
            return None;
        }
        Some(ResolvedProduct {
            title,
            price: self.price.unwrap_or_default(),
            rating: self.rating.unwrap_or_default(),
            reviews_count: self.reviews_count.unwrap_or_default(),
            url,
        })
    }
}

/// One step of the priority cascade.
#[async_trait]
pub trait ListingSource: Send + Sync {
    fn name(&self) -> &'static str;
    async fn lookup(&self, query: &ProductQuery) -> Result<PartialListing, SourceError>;
}

fn source_timeout(source: &str) -> Duration {
    // Built-in per-source defaults.
    let builtin_ms: u64 = match source {
        "serp" => 8_000,
        "marketplace" => 12_000,
        "ai_lookup" => 20_000,
        _ => 10_000,
    };

    let key = format!("SOURCE_TIMEOUT_MS_{}", source.to_ascii_uppercase());
    let per_source = std::env::var(key).ok().and_then(|v| v.parse::<u64>().ok());
    let base = std::env::var("SOURCE_TIMEOUT_MS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok());

    // Precedence: per-source env, then base env, then builtin.
    let ms = per_source.or(base).unwrap_or(builtin_ms);
    Duration::from_millis(ms.max(250))
}

/// Runs the cascade and the competitor scan for one query.
///
/// Sources run strictly sequentially: a later source is consulted only for
/// fields the earlier ones left blank. Every outbound step takes a permit
/// from the shared semaphore, so bulk fan-out stays within the configured
/// outbound budget; a source's internal oracle traffic rides the same
/// permit as its fetch.
pub struct Resolver {
    sources: Vec<Arc<dyn ListingSource>>,
    marketplace: Arc<dyn MarketplaceFetcher>,
    oracle: Arc<dyn MatchOracle>,
    marketplace_base: String,
    outbound: Arc<Semaphore>,
}

impl Resolver {
    pub fn new(
        sources: Vec<Arc<dyn ListingSource>>,
        marketplace: Arc<dyn MarketplaceFetcher>,
        oracle: Arc<dyn MatchOracle>,
        marketplace_base: String,
        outbound: Arc<Semaphore>,
    ) -> Self {
        Self {
            sources,
            marketplace,
            oracle,
            marketplace_base,
            outbound,
        }
    }

    pub async fn resolve(
        &self,
        query: &ProductQuery,
    ) -> (Option<ResolvedProduct>, Vec<CompetitorProduct>) {
        let listing = self.resolve_main(query).await;
        let main = listing.into_resolved();

        let main_title = main
            .as_ref()
            .map(|m| m.title.trim())
            .filter(|t| !t.is_empty());
        let competitors = self.find_competitors(query, main_title).await;

        (main, competitors)
    }

    async fn resolve_main(&self, query: &ProductQuery) -> PartialListing {
        let mut acc = PartialListing::default();

        for source in &self.sources {
            let timeout = source_timeout(source.name());
            // Take the permit before starting the clock so queueing behind
            // the outbound budget is not billed against the source.
            let _permit = self.outbound.acquire().await.ok();

            match tokio::time::timeout(timeout, source.lookup(query)).await {
                Err(_) => {
                    warn!(
                        "source '{}' timed out after {}ms",
                        source.name(),
                        timeout.as_millis()
                    );
                }
                Ok(Err(e)) => {
                    warn!("source '{}' contributed nothing: {}", source.name(), e);
                }
                Ok(Ok(partial)) => {
                    debug!("source '{}' contributed {:?}", source.name(), partial);
                    acc.fill_from(partial);
                }
            }

            if acc.is_complete() {
                info!("resolution complete after source '{}'", source.name());
                break;
            }
        }

        acc
    }

    async fn confirm_category(&self, title: &str, category: &str) -> bool {
        let _permit = self.outbound.acquire().await.ok();
        match self.oracle.category_match(title, category).await {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!("category oracle failed (treated as no): {}", e);
                false
            }
        }
    }

    async fn confirm_subtype(&self, main_title: &str, title: &str) -> bool {
        let _permit = self.outbound.acquire().await.ok();
        match self.oracle.subtype_match(main_title, title).await {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!("subtype oracle failed (treated as no): {}", e);
                false
            }
        }
    }

    /// Scans the category-level candidate list in order, keeping at most
    /// five entries that pass every filter. The scan short-circuits at the
    /// cap instead of filtering the whole list.
    async fn find_competitors(
        &self,
        query: &ProductQuery,
        main_title: Option<&str>,
    ) -> Vec<CompetitorProduct> {
        let factor_with_unit = format_factor(&query.category, &query.factor);
        let competitor_query = format!("{} {}", factor_with_unit, query.category);

        let candidates = {
            let _permit = self.outbound.acquire().await.ok();
            match self.marketplace.search(competitor_query.trim()).await {
                Ok(c) => c,
                Err(e) => {
                    warn!("competitor fetch contributed nothing: {}", e);
                    return Vec::new();
                }
            }
        };

        let unit = factor_unit(&query.category);
        let brand = query.brand.to_lowercase();
        let factor = query.factor.trim();

        let mut out = Vec::new();
        for candidate in candidates {
            let Some(title) = candidate.title.as_deref() else {
                continue;
            };

            if title.to_lowercase().contains(&brand) {
                continue;
            }
            if !self.confirm_category(title, &query.category).await {
                continue;
            }
            if !factor.is_empty() && !title_mentions_factor(title, factor, unit) {
                continue;
            }
            if let Some(main_title) = main_title {
                if !self.confirm_subtype(main_title, title).await {
                    continue;
                }
            }

            // All five fields must be present to list an entry.
            let (Some(title), Some(price), Some(rating), Some(reviews_count), Some(url)) = (
                candidate.title,
                candidate.price,
                candidate.rating,
                candidate.reviews_count,
                candidate.url,
            ) else {
                continue;
            };

            out.push(CompetitorProduct {
                title,
                price: normalize_price(&price),
                rating,
                reviews_count,
                url: absolutize(&self.marketplace_base, &url),
            });

            if out.len() == MAX_COMPETITORS {
                break;
            }
        }

        out
    }
}

/// Resolves a batch concurrently, one task per item, and reassembles the
/// outcomes in input order. A panicked or failed item becomes a per-item
/// error entry; it never aborts its siblings.
pub async fn resolve_bulk(resolver: Arc<Resolver>, queries: Vec<ProductQuery>) -> BulkResolveResponse {
    let mut handles = Vec::with_capacity(queries.len());
    for query in queries {
        let resolver = Arc::clone(&resolver);
        let category = query.category.clone();
        let handle = tokio::spawn(async move {
            let (main, competitors) = resolver.resolve(&query).await;
            BulkResolveEntry::Ok {
                product_category: query.category,
                product_info: main,
                competitors,
            }
        });
        handles.push((category, handle));
    }

    let mut results = Vec::with_capacity(handles.len());
    for (category, handle) in handles {
        match handle.await {
            Ok(entry) => results.push(entry),
            Err(e) => {
                warn!("bulk item for '{}' failed: {}", category, e);
                results.push(BulkResolveEntry::Err {
                    product_category: category,
                    error: e.to_string(),
                });
            }
        }
    }

    BulkResolveResponse { results }
}
