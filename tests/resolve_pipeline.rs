//! Offline end-to-end resolution tests: scripted fetchers and oracle, no
//! network. Exercises the full cascade, the competitor scan, and the wire
//! shapes of the public API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use listing_scout::normalize::price::PriceBand;
use listing_scout::oracle::MatchOracle;
use listing_scout::pipeline::strategies::{MarketplaceStrategy, SerpStrategy};
use listing_scout::pipeline::{ListingSource, PartialListing};
use listing_scout::sources::service::{MarketplaceFetcher, SerpFetcher};
use listing_scout::sources::SourceError;
use listing_scout::types::{
    BulkResolveEntry, CandidateRecord, ProductQuery, ResolveResponse, SerpHit,
};
use listing_scout::{resolve_bulk, Resolver};

fn tv_query() -> ProductQuery {
    ProductQuery {
        category: "Television".to_string(),
        model_number: "43PFT6915".to_string(),
        brand: "Philips".to_string(),
        factor: "43".to_string(),
    }
}

/// A complete competitor card with a raw (unnormalized) price and a
/// relative url, so the scan has something to normalize and absolutize.
fn listed(title: &str) -> CandidateRecord {
    CandidateRecord {
        title: Some(title.to_string()),
        price: Some("20,999.00".to_string()),
        rating: Some("4.1 out of 5 stars".to_string()),
        reviews_count: Some("312".to_string()),
        url: Some(format!("/{}/dp/B0X", title.replace(' ', "-"))),
    }
}

/// SERP fixture: one marketplace hit with a structured price but no rating
/// or review data, so the cascade must fall through to the marketplace.
struct ScriptedSerp;

#[async_trait]
impl SerpFetcher for ScriptedSerp {
    async fn search(&self, query: &str) -> Result<Vec<SerpHit>, SourceError> {
        assert_eq!(query, "Philips 43PFT6915", "serp query is brand + model");
        Ok(vec![SerpHit {
            url: "https://www.amazon.in/Philips-43PFT6915/dp/B0TEST".to_string(),
            title: "Philips 43PFT6915 108cm Full HD LED TV : Amazon.in".to_string(),
            snippet: "Philips 6900 series Full HD LED television.".to_string(),
            rich_price: Some("23490".to_string()),
            rich_currency: Some("₹".to_string()),
            rich_rating: None,
            rich_reviews: None,
            domain: Some("amazon.in".to_string()),
        }])
    }
}

/// Marketplace fixture serving both the main-product search (query carries
/// the model number) and the competitor search (factor + category only).
struct ScriptedMarketplace;

#[async_trait]
impl MarketplaceFetcher for ScriptedMarketplace {
    async fn search(&self, query: &str) -> Result<Vec<CandidateRecord>, SourceError> {
        if query.contains("43PFT6915") {
            assert_eq!(query, "Philips 43 inch Television 43PFT6915");
            return Ok(vec![CandidateRecord {
                title: Some("Philips 43PFT6915 108cm Full HD LED TV".to_string()),
                // Must not overwrite the price the SERP source already set.
                price: Some("₹24,999".to_string()),
                rating: Some("4.2 out of 5 stars".to_string()),
                reviews_count: Some("1,204".to_string()),
                url: Some("/Philips-43PFT6915/dp/B0TEST".to_string()),
            }]);
        }

        assert_eq!(query, "43 inch Television");
        let mut incomplete = listed("LG 43 inch UHD");
        incomplete.price = None;
        Ok(vec![
            listed("Philips 43 inch sibling model"),
            listed("Sony Bravia 43 inch Google TV"),
            incomplete,
            listed("Samsung Crystal 43 inch 4K"),
        ])
    }
}

struct YesOracle;

#[async_trait]
impl MatchOracle for YesOracle {
    async fn category_match(&self, _title: &str, _category: &str) -> Result<bool, SourceError> {
        Ok(true)
    }

    async fn subtype_match(&self, _a: &str, _b: &str) -> Result<bool, SourceError> {
        Ok(true)
    }
}

/// Cascade tail guard: fails the test if the pipeline consults it after the
/// earlier sources already completed the record.
struct LastResortGuard {
    calls: AtomicUsize,
}

#[async_trait]
impl ListingSource for LastResortGuard {
    fn name(&self) -> &'static str {
        "ai_lookup"
    }

    async fn lookup(&self, _query: &ProductQuery) -> Result<PartialListing, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(SourceError::Empty)
    }
}

#[tokio::test]
async fn television_resolution_merges_serp_and_marketplace() {
    let serp = Arc::new(ScriptedSerp);
    let marketplace = Arc::new(ScriptedMarketplace);
    let oracle: Arc<dyn MatchOracle> = Arc::new(YesOracle);
    let guard = Arc::new(LastResortGuard {
        calls: AtomicUsize::new(0),
    });

    let base = "https://www.amazon.in".to_string();
    let sources: Vec<Arc<dyn ListingSource>> = vec![
        Arc::new(SerpStrategy::new(
            serp,
            "amazon.in".to_string(),
            PriceBand::default(),
        )),
        Arc::new(MarketplaceStrategy::new(
            marketplace.clone(),
            Arc::clone(&oracle),
            base.clone(),
        )),
        guard.clone(),
    ];
    let resolver = Resolver::new(
        sources,
        marketplace,
        oracle,
        base,
        Arc::new(Semaphore::new(8)),
    );

    let (main, competitors) = resolver.resolve(&tv_query()).await;
    let main = main.expect("two sources carried identifying data");

    // Title, url, and price come from the SERP hit; rating and reviews are
    // filled by the marketplace card.
    assert_eq!(main.title, "Philips 43PFT6915 108cm Full HD LED TV : Amazon.in");
    assert_eq!(main.url, "https://www.amazon.in/Philips-43PFT6915/dp/B0TEST");
    assert_eq!(main.price, "₹23,490");
    assert_eq!(main.rating, "4.2 out of 5 stars");
    assert_eq!(main.reviews_count, "1,204");

    assert_eq!(
        guard.calls.load(Ordering::SeqCst),
        0,
        "cascade must stop once price, rating, and reviews are all known"
    );

    // Competitor scan: the same-brand card and the incomplete card drop out.
    let titles: Vec<&str> = competitors.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(
        titles,
        ["Sony Bravia 43 inch Google TV", "Samsung Crystal 43 inch 4K"]
    );
    for competitor in &competitors {
        assert_eq!(competitor.price, "₹20,999", "competitor price is normalized");
        assert!(
            competitor.url.starts_with("https://www.amazon.in/"),
            "competitor url is absolutized: {}",
            competitor.url
        );
    }
}

/// SERP stub for the bulk test: knows one product, nothing else.
struct OneProductSerp;

#[async_trait]
impl SerpFetcher for OneProductSerp {
    async fn search(&self, query: &str) -> Result<Vec<SerpHit>, SourceError> {
        if !query.contains("Philips") {
            return Ok(Vec::new());
        }
        Ok(vec![SerpHit {
            url: "https://www.amazon.in/Philips-43PFT6915/dp/B0TEST".to_string(),
            title: "Philips 43PFT6915 TV".to_string(),
            snippet: String::new(),
            rich_price: Some("23,490".to_string()),
            rich_currency: Some("₹".to_string()),
            rich_rating: Some("4.2".to_string()),
            rich_reviews: Some("1,204".to_string()),
            domain: Some("amazon.in".to_string()),
        }])
    }
}

struct EmptyMarketplace;

#[async_trait]
impl MarketplaceFetcher for EmptyMarketplace {
    async fn search(&self, _query: &str) -> Result<Vec<CandidateRecord>, SourceError> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn bulk_resolution_preserves_order_and_isolates_misses() {
    let oracle: Arc<dyn MatchOracle> = Arc::new(YesOracle);
    let sources: Vec<Arc<dyn ListingSource>> = vec![Arc::new(SerpStrategy::new(
        Arc::new(OneProductSerp),
        "amazon.in".to_string(),
        PriceBand::default(),
    ))];
    let resolver = Arc::new(Resolver::new(
        sources,
        Arc::new(EmptyMarketplace),
        oracle,
        "https://www.amazon.in".to_string(),
        Arc::new(Semaphore::new(8)),
    ));

    let queries = vec![
        tv_query(),
        ProductQuery {
            category: "Washing Machine".to_string(),
            model_number: "WA65A4002VS".to_string(),
            brand: "Samsung".to_string(),
            factor: "6.5".to_string(),
        },
    ];

    let response = resolve_bulk(resolver, queries).await;
    assert_eq!(response.results.len(), 2);

    match &response.results[0] {
        BulkResolveEntry::Ok {
            product_category,
            product_info,
            ..
        } => {
            assert_eq!(product_category, "Television");
            let info = product_info.as_ref().expect("known product resolves");
            assert_eq!(info.price, "₹23,490");
        }
        BulkResolveEntry::Err { error, .. } => panic!("first item failed: {}", error),
    }

    match &response.results[1] {
        BulkResolveEntry::Ok {
            product_category,
            product_info,
            competitors,
        } => {
            assert_eq!(product_category, "Washing Machine");
            assert!(
                product_info.is_none(),
                "unknown product resolves to null, not an error"
            );
            assert!(competitors.is_empty());
        }
        BulkResolveEntry::Err { error, .. } => panic!("second item failed: {}", error),
    }
}

#[test]
fn response_wire_shape_matches_the_public_api() {
    let empty = ResolveResponse {
        main_product: None,
        competitors: Vec::new(),
    };
    let value = serde_json::to_value(&empty).expect("serializes");
    assert!(
        value.get("main_product").is_some_and(|v| v.is_null()),
        "missing main is null, not absent"
    );
    assert!(value["competitors"].as_array().is_some_and(|a| a.is_empty()));

    let ok = BulkResolveEntry::Ok {
        product_category: "Television".to_string(),
        product_info: None,
        competitors: Vec::new(),
    };
    let value = serde_json::to_value(&ok).expect("serializes");
    assert!(value.get("product_info").is_some());
    assert!(value.get("error").is_none());

    let err = BulkResolveEntry::Err {
        product_category: "Television".to_string(),
        error: "scrape failed".to_string(),
    };
    let value = serde_json::to_value(&err).expect("serializes");
    assert_eq!(value["error"], "scrape failed");
    assert_eq!(value["product_category"], "Television");
    assert!(value.get("product_info").is_none());
}
