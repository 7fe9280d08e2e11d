use crate::normalize::price::PriceBand;

// ---------------------------------------------------------------------------
// ScoutConfig: file-based config loader (listing-scout.json) with env-var
// fallback for every field.
// ---------------------------------------------------------------------------

/// AI web-lookup sub-config (mirrors the `lookup` key in listing-scout.json).
#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct LookupLlmConfig {
    /// LLM endpoint, e.g. `https://api.perplexity.ai` or any
    /// OpenAI-compatible base such as `http://localhost:11434/v1`.
    pub llm_base_url: Option<String>,
    /// API key. Never logged. Leave blank for key-less local endpoints.
    pub llm_api_key: Option<String>,
    /// Model name. Must be a web-search-capable model for live prices.
    pub llm_model: Option<String>,
    /// Max tokens the lookup reply may use. The reply is a tiny JSON object.
    pub max_tokens: Option<u32>,
}

impl LookupLlmConfig {
    /// API key: JSON field → `LOOKUP_API_KEY` → `OPENAI_API_KEY` → `None`.
    ///
    /// When `llm_api_key` is explicitly `""` in the config file, returns
    /// `Some("")`, meaning "no key required" (local endpoint). `None` means
    /// the lookup source is unavailable.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(k) = &self.llm_api_key {
            return Some(k.trim().to_string());
        }
        for var in ["LOOKUP_API_KEY", "OPENAI_API_KEY"] {
            if let Ok(v) = std::env::var(var) {
                if !v.trim().is_empty() {
                    return Some(v.trim().to_string());
                }
            }
        }
        None
    }

    /// Base URL: JSON field → `LOOKUP_BASE_URL` → `OPENAI_BASE_URL` →
    /// `https://api.openai.com/v1`.
    pub fn resolve_base_url(&self) -> String {
        if let Some(u) = &self.llm_base_url {
            if !u.trim().is_empty() {
                return u.clone();
            }
        }
        for var in ["LOOKUP_BASE_URL", "OPENAI_BASE_URL"] {
            if let Ok(v) = std::env::var(var) {
                if !v.trim().is_empty() {
                    return v;
                }
            }
        }
        "https://api.openai.com/v1".to_string()
    }

    /// Model name: JSON field → `LOOKUP_LLM_MODEL` env var → `gpt-4o-mini`.
    pub fn resolve_model(&self) -> String {
        if let Some(m) = &self.llm_model {
            if !m.trim().is_empty() {
                return m.clone();
            }
        }
        std::env::var("LOOKUP_LLM_MODEL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "gpt-4o-mini".to_string())
    }

    /// Max output tokens: JSON field → `LOOKUP_MAX_TOKENS` env var → 150.
    pub fn resolve_max_tokens(&self) -> u32 {
        if let Some(n) = self.max_tokens {
            return n;
        }
        std::env::var("LOOKUP_MAX_TOKENS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(150)
    }
}

/// Text-matching-oracle sub-config (`oracle` key). Same resolution rules as
/// the lookup config so a single shared endpoint can serve both.
#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct OracleLlmConfig {
    pub llm_base_url: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_model: Option<String>,
}

impl OracleLlmConfig {
    /// API key: JSON field → `ORACLE_API_KEY` → `OPENAI_API_KEY` → `None`.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(k) = &self.llm_api_key {
            return Some(k.trim().to_string());
        }
        for var in ["ORACLE_API_KEY", "OPENAI_API_KEY"] {
            if let Ok(v) = std::env::var(var) {
                if !v.trim().is_empty() {
                    return Some(v.trim().to_string());
                }
            }
        }
        None
    }

    /// Base URL: JSON field → `ORACLE_BASE_URL` → `OPENAI_BASE_URL` →
    /// `https://api.openai.com/v1`.
    pub fn resolve_base_url(&self) -> String {
        if let Some(u) = &self.llm_base_url {
            if !u.trim().is_empty() {
                return u.clone();
            }
        }
        for var in ["ORACLE_BASE_URL", "OPENAI_BASE_URL"] {
            if let Ok(v) = std::env::var(var) {
                if !v.trim().is_empty() {
                    return v;
                }
            }
        }
        "https://api.openai.com/v1".to_string()
    }

    /// Model name: JSON field → `ORACLE_LLM_MODEL` env var → `gpt-4o-mini`.
    pub fn resolve_model(&self) -> String {
        if let Some(m) = &self.llm_model {
            if !m.trim().is_empty() {
                return m.clone();
            }
        }
        std::env::var("ORACLE_LLM_MODEL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "gpt-4o-mini".to_string())
    }
}

/// Marketplace sub-config (`marketplace` key).
#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct MarketplaceConfig {
    /// Storefront base URL. Search pages are fetched from `{base}/s?k=…`.
    pub base_url: Option<String>,
}

impl MarketplaceConfig {
    /// Base URL: JSON field → `MARKETPLACE_BASE_URL` → `https://www.amazon.in`.
    pub fn resolve_base_url(&self) -> String {
        if let Some(u) = &self.base_url {
            if !u.trim().is_empty() {
                return u.trim_end_matches('/').to_string();
            }
        }
        std::env::var("MARKETPLACE_BASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or_else(|| "https://www.amazon.in".to_string())
    }

    /// Bare marketplace host ("amazon.in") used for SERP domain matching.
    pub fn resolve_host(&self) -> String {
        let base = self.resolve_base_url();
        url::Url::parse(&base)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()))
            .map(|h| h.trim_start_matches("www.").to_string())
            .unwrap_or_else(|| "amazon.in".to_string())
    }
}

/// Search-engine sub-config (`search_engine` key).
#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct SearchEngineConfig {
    pub base_url: Option<String>,
}

impl SearchEngineConfig {
    /// SERP base URL: JSON field → `SERP_BASE_URL` →
    /// `https://www.google.com/search`.
    pub fn resolve_base_url(&self) -> String {
        if let Some(u) = &self.base_url {
            if !u.trim().is_empty() {
                return u.clone();
            }
        }
        std::env::var("SERP_BASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "https://www.google.com/search".to_string())
    }
}

/// Resolution tuning (`resolution` key).
#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct ResolutionConfig {
    /// Lower bound of the retail-price plausibility band. Tuned for
    /// appliance-class goods; adjust for low-cost accessories.
    pub price_min: Option<f64>,
    /// Upper bound of the plausibility band.
    pub price_max: Option<f64>,
}

impl ResolutionConfig {
    /// Plausibility band for symbol-less numeric price candidates:
    /// JSON fields → `PRICE_BAND_MIN`/`PRICE_BAND_MAX` env vars → [1000, 200000].
    pub fn resolve_price_band(&self) -> PriceBand {
        let min = self
            .price_min
            .or_else(|| {
                std::env::var("PRICE_BAND_MIN")
                    .ok()
                    .and_then(|v| v.parse().ok())
            })
            .unwrap_or(1_000.0);
        let max = self
            .price_max
            .or_else(|| {
                std::env::var("PRICE_BAND_MAX")
                    .ok()
                    .and_then(|v| v.parse().ok())
            })
            .unwrap_or(200_000.0);
        PriceBand { min, max }
    }
}

/// Top-level config loaded from `listing-scout.json`.
#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct ScoutConfig {
    #[serde(default)]
    pub lookup: LookupLlmConfig,
    #[serde(default)]
    pub oracle: OracleLlmConfig,
    #[serde(default)]
    pub marketplace: MarketplaceConfig,
    #[serde(default)]
    pub search_engine: SearchEngineConfig,
    #[serde(default)]
    pub resolution: ResolutionConfig,
}

/// Load `listing-scout.json` from standard locations.
///
/// Search order (first found wins):
/// 1. `LISTING_SCOUT_CONFIG` env var path
/// 2. `./listing-scout.json`  (process cwd)
/// 3. `../listing-scout.json` (repo root when running from a subdir)
///
/// Missing file → `ScoutConfig::default()` (silent, all env-var fallbacks
/// apply). Parse error → log a warning, return defaults.
pub fn load_scout_config() -> ScoutConfig {
    let candidates: Vec<std::path::PathBuf> = {
        let mut v = vec![
            std::path::PathBuf::from("listing-scout.json"),
            std::path::PathBuf::from("../listing-scout.json"),
        ];
        if let Ok(env_path) = std::env::var("LISTING_SCOUT_CONFIG") {
            v.insert(0, std::path::PathBuf::from(env_path));
        }
        v
    };

    for path in &candidates {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<ScoutConfig>(&contents) {
                Ok(cfg) => {
                    tracing::info!("listing-scout.json loaded from {}", path.display());
                    return cfg;
                }
                Err(e) => {
                    tracing::warn!(
                        "listing-scout.json parse error at {}: {}. Using defaults.",
                        path.display(),
                        e
                    );
                    return ScoutConfig::default();
                }
            },
            Err(_) => continue, // not at this path, try the next
        }
    }

    ScoutConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_parses() {
        let cfg: ScoutConfig =
            serde_json::from_str(r#"{"marketplace": {"base_url": "https://www.amazon.in/"}}"#)
                .unwrap();
        assert_eq!(cfg.marketplace.resolve_base_url(), "https://www.amazon.in");
        assert_eq!(cfg.marketplace.resolve_host(), "amazon.in");
    }

    #[test]
    fn test_price_band_defaults() {
        let band = ResolutionConfig::default().resolve_price_band();
        assert_eq!(band.min, 1_000.0);
        assert_eq!(band.max, 200_000.0);
    }

    #[test]
    fn test_explicit_empty_api_key_means_keyless() {
        let cfg: ScoutConfig =
            serde_json::from_str(r#"{"lookup": {"llm_api_key": ""}}"#).unwrap();
        assert_eq!(cfg.lookup.resolve_api_key(), Some(String::new()));
    }

    #[test]
    fn test_band_from_json_overrides_default() {
        let cfg: ScoutConfig =
            serde_json::from_str(r#"{"resolution": {"price_min": 50.0, "price_max": 900000.0}}"#)
                .unwrap();
        let band = cfg.resolution.resolve_price_band();
        assert_eq!(band.min, 50.0);
        assert_eq!(band.max, 900_000.0);
    }
}
