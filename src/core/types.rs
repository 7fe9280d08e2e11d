use serde::{Deserialize, Serialize};

/// One resolution request: the product the caller wants priced.
///
/// `factor` is the category-specific sizing descriptor (screen inches,
/// capacity litres, wattage, …) used to narrow the competitor search.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProductQuery {
    #[serde(rename = "product_category")]
    pub category: String,
    pub model_number: String,
    pub brand: String,
    pub factor: String,
}

/// A raw, unnormalized product card as produced by a source.
///
/// Every field is optional (sources routinely return partial cards), and
/// empty text is collapsed to `None` at parse time so "missing" means one
/// thing everywhere.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct CandidateRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviews_count: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// One parsed search-engine result.
///
/// `rich_*` fields carry structured shopping/rich-result data when the SERP
/// exposed it; otherwise extraction falls back to the free-text snippet.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct SerpHit {
    pub url: String,
    pub title: String,
    pub snippet: String,
    #[serde(default)]
    pub rich_price: Option<String>,
    #[serde(default)]
    pub rich_currency: Option<String>,
    #[serde(default)]
    pub rich_rating: Option<String>,
    #[serde(default)]
    pub rich_reviews: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
}

/// The merged, normalized best knowledge about the queried product.
///
/// Blank string = the cascade never learned that field. `url` is always
/// absolute once set.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ResolvedProduct {
    pub title: String,
    pub price: String,
    pub rating: String,
    pub reviews_count: String,
    pub url: String,
}

/// A competitor entry: all five fields present, price normalized, url
/// absolutized.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CompetitorProduct {
    pub title: String,
    pub price: String,
    pub rating: String,
    pub reviews_count: String,
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResolveResponse {
    pub main_product: Option<ResolvedProduct>,
    pub competitors: Vec<CompetitorProduct>,
}

/// Per-item outcome of a bulk request. Serialized untagged so the wire shape
/// is `{product_category, product_info, competitors}` on success and
/// `{product_category, error}` on failure; a failed item never hides its
/// siblings.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum BulkResolveEntry {
    Ok {
        product_category: String,
        product_info: Option<ResolvedProduct>,
        competitors: Vec<CompetitorProduct>,
    },
    Err {
        product_category: String,
        error: String,
    },
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BulkResolveResponse {
    pub results: Vec<BulkResolveEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
