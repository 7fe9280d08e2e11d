use std::env;

use crate::core::config::{load_scout_config, ScoutConfig};
use crate::oracle::{LlmMatchOracle, MatchOracle};
use crate::pipeline::strategies::{AiLookupStrategy, MarketplaceStrategy, SerpStrategy};
use crate::pipeline::{ListingSource, Resolver};
use crate::sources::ai_lookup::OpenAiLookup;
use crate::sources::marketplace::AmazonSearchFetcher;
use crate::sources::serp::GoogleSerpFetcher;

#[derive(Clone)]
pub struct AppState {
    pub resolver: std::sync::Arc<Resolver>,
    /// File-based config loaded from `listing-scout.json` (env-var fallback for all fields).
    pub scout_config: std::sync::Arc<ScoutConfig>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field(
                "lookup_enabled",
                &self.scout_config.lookup.resolve_api_key().is_some(),
            )
            .field(
                "oracle_enabled",
                &self.scout_config.oracle.resolve_api_key().is_some(),
            )
            .finish()
    }
}

impl AppState {
    pub fn new(http_client: reqwest::Client) -> Self {
        Self::with_config(http_client, std::sync::Arc::new(load_scout_config()))
    }

    pub fn with_config(
        http_client: reqwest::Client,
        scout_config: std::sync::Arc<ScoutConfig>,
    ) -> Self {
        let outbound_limit = env::var("OUTBOUND_LIMIT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(32);
        let outbound_limit =
            std::sync::Arc::new(tokio::sync::Semaphore::new(outbound_limit));

        let resolver = std::sync::Arc::new(build_resolver(
            http_client,
            &scout_config,
            outbound_limit,
        ));

        Self {
            resolver,
            scout_config,
        }
    }
}

/// Wires the cascade in priority order: SERP scan, marketplace scrape, AI
/// web lookup. The same oracle instance serves the marketplace source and
/// the competitor filters.
pub fn build_resolver(
    http_client: reqwest::Client,
    config: &ScoutConfig,
    outbound: std::sync::Arc<tokio::sync::Semaphore>,
) -> Resolver {
    let marketplace_base = config.marketplace.resolve_base_url();
    let marketplace_host = config.marketplace.resolve_host();
    let band = config.resolution.resolve_price_band();

    let serp_fetcher = std::sync::Arc::new(GoogleSerpFetcher::new(
        http_client.clone(),
        &config.search_engine,
    ));
    let marketplace_fetcher = std::sync::Arc::new(AmazonSearchFetcher::new(
        http_client.clone(),
        &config.marketplace,
    ));
    let ai_lookup = std::sync::Arc::new(OpenAiLookup::new(http_client.clone(), &config.lookup));
    let oracle: std::sync::Arc<dyn MatchOracle> =
        std::sync::Arc::new(LlmMatchOracle::new(http_client, &config.oracle));

    let sources: Vec<std::sync::Arc<dyn ListingSource>> = vec![
        std::sync::Arc::new(SerpStrategy::new(serp_fetcher, marketplace_host, band)),
        std::sync::Arc::new(MarketplaceStrategy::new(
            marketplace_fetcher.clone(),
            std::sync::Arc::clone(&oracle),
            marketplace_base.clone(),
        )),
        std::sync::Arc::new(AiLookupStrategy::new(ai_lookup)),
    ];

    Resolver::new(
        sources,
        marketplace_fetcher,
        oracle,
        marketplace_base,
        outbound,
    )
}
