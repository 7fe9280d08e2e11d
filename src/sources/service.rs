//! Capability traits the resolution pipeline consumes.
//!
//! Each outbound dependency sits behind one of these seams so the pipeline
//! can be exercised with in-process stubs and so an alternate marketplace,
//! search engine, or lookup backend is a drop-in swap.

use async_trait::async_trait;

use super::SourceError;
use crate::core::types::{CandidateRecord, SerpHit};

/// Scrapes the marketplace's search page into raw candidate records.
#[async_trait]
pub trait MarketplaceFetcher: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<CandidateRecord>, SourceError>;
}

/// Queries a web search engine and returns organic/shopping hits.
#[async_trait]
pub trait SerpFetcher: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SerpHit>, SourceError>;
}

/// Free-text question to an LLM with web-search grounding.
#[async_trait]
pub trait AiLookup: Send + Sync {
    async fn ask(&self, prompt: &str) -> Result<String, SourceError>;
}
