//! LLM-backed text matching oracle.
//!
//! Two yes/no judgement calls over product titles: "is this title really in
//! that category" and "are these two titles the same subtype". The subtype
//! taxonomy (semi vs fully automatic, window vs split, ...) lives in the
//! prompt, not in code: it is domain data, and swapping the oracle swaps the
//! rules with it.

use async_trait::async_trait;
use tracing::debug;

use crate::core::config::OracleLlmConfig;
use crate::sources::ai_lookup::chat_completion;
use crate::sources::SourceError;

/// The oracle only ever answers one word.
const ORACLE_MAX_TOKENS: u32 = 10;

/// Yes/no judgement calls over product titles.
///
/// Implementations are non-deterministic and fail closed: callers treat a
/// returned error exactly like a "no".
#[async_trait]
pub trait MatchOracle: Send + Sync {
    /// Is `title` an actual product of `category` (not an accessory/part)?
    async fn category_match(&self, title: &str, category: &str) -> Result<bool, SourceError>;

    /// Does `candidate_title` describe the same subtype as `main_title`?
    async fn subtype_match(
        &self,
        main_title: &str,
        candidate_title: &str,
    ) -> Result<bool, SourceError>;
}

pub(crate) fn category_prompt(title: &str, category: &str) -> String {
    format!(
        "Given the product title:\n\"{title}\"\n\
         Does this product title refer to a product in the category '{category}'?\n\
         Important rules:\n\
         1. Exclude accessories, parts, covers, or any add-on items\n\
         2. Only include actual products in the category\n\
         3. For example:\n   \
         - For 'Washing Machine': exclude covers, lids, parts, or accessories\n   \
         - For 'Air Conditioner': exclude covers, stands, or installation parts\n   \
         - For 'Refrigerator': exclude covers, shelves, or replacement parts\n   \
         - For 'Television': exclude stands, mounts, or remote covers\n\
         4. If the product is an accessory or part, answer 'no'\n\
         5. If unsure, answer 'no'\n\n\
         Answer only 'yes' or 'no' without any explanation."
    )
}

pub(crate) fn subtype_prompt(main_title: &str, candidate_title: &str) -> String {
    format!(
        "Given two product titles:\n\
         1. Main product: \"{main_title}\"\n\
         2. Potential competitor: \"{candidate_title}\"\n\
         Are these products of the same type/subtype? Consider these rules:\n\
         - For washing machines:\n  \
         * Semi-automatic should ONLY match with semi-automatic\n  \
         * Fully automatic should ONLY match with fully automatic\n  \
         * Front load should ONLY match with front load\n  \
         * Top load should ONLY match with top load\n\
         - For ACs:\n  \
         * Window AC should ONLY match with window AC\n  \
         * Split AC should ONLY match with split AC\n\
         - For vacuum cleaners:\n  \
         * Cordless should ONLY match with cordless\n  \
         * Robotic should ONLY match with robotic\n  \
         * Bagged should ONLY match with bagged\n  \
         * Bagless should ONLY match with bagless\n\
         - For refrigerators:\n  \
         * Single door should ONLY match with single door\n  \
         * Double door should ONLY match with double door\n  \
         * Side by side should ONLY match with side by side\n\n\
         Important rules:\n\
         1. Different types should not match (e.g., semi-automatic should not match with fully automatic)\n\
         2. If the main product has multiple type indicators (e.g., 'semi-automatic top load'), both must match\n\
         3. If unsure, answer 'no'\n\n\
         Answer only 'yes' or 'no' without any explanation."
    )
}

/// An answer is affirmative iff it contains "yes"; anything hedged,
/// ambiguous, or empty counts as a "no".
pub(crate) fn is_affirmative(reply: &str) -> bool {
    reply.trim().to_lowercase().contains("yes")
}

pub struct LlmMatchOracle {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl LlmMatchOracle {
    pub fn new(client: reqwest::Client, config: &OracleLlmConfig) -> Self {
        Self {
            client,
            api_key: config.resolve_api_key(),
            base_url: config.resolve_base_url(),
            model: config.resolve_model(),
        }
    }

    async fn ask(&self, prompt: &str) -> Result<String, SourceError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(SourceError::Unavailable(
                "no oracle api key configured".to_string(),
            ));
        };
        chat_completion(
            &self.client,
            &self.base_url,
            api_key,
            &self.model,
            ORACLE_MAX_TOKENS,
            prompt,
        )
        .await
    }
}

#[async_trait]
impl MatchOracle for LlmMatchOracle {
    async fn category_match(&self, title: &str, category: &str) -> Result<bool, SourceError> {
        let reply = self.ask(&category_prompt(title, category)).await?;
        debug!(%category, %reply, "oracle category match");
        Ok(is_affirmative(&reply))
    }

    async fn subtype_match(
        &self,
        main_title: &str,
        candidate_title: &str,
    ) -> Result<bool, SourceError> {
        let reply = self.ask(&subtype_prompt(main_title, candidate_title)).await?;
        debug!(%reply, "oracle subtype match");
        Ok(is_affirmative(&reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn affirmative_means_contains_yes() {
        assert!(is_affirmative("yes"));
        assert!(is_affirmative("Yes."));
        assert!(is_affirmative("  YES  "));
        assert!(is_affirmative("Yes, these match"));
        assert!(!is_affirmative("no"));
        assert!(!is_affirmative("unsure"));
        assert!(!is_affirmative(""));
    }

    #[test]
    fn category_prompt_excludes_accessories() {
        let prompt = category_prompt("LG 7kg Top Load Washing Machine", "Washing Machine");
        assert!(prompt.contains("LG 7kg Top Load Washing Machine"));
        assert!(prompt.contains("category 'Washing Machine'"));
        assert!(prompt.contains("Exclude accessories, parts, covers"));
        assert!(prompt.contains("If unsure, answer 'no'"));
    }

    #[test]
    fn subtype_prompt_carries_both_titles_and_the_taxonomy() {
        let prompt = subtype_prompt(
            "Samsung 6.5kg Semi-Automatic Top Load",
            "Whirlpool 7kg Fully Automatic Front Load",
        );
        assert!(prompt.contains("Main product: \"Samsung 6.5kg Semi-Automatic Top Load\""));
        assert!(prompt.contains("Potential competitor: \"Whirlpool 7kg Fully Automatic Front Load\""));
        assert!(prompt.contains("Semi-automatic should ONLY match with semi-automatic"));
        assert!(prompt.contains("Window AC should ONLY match with window AC"));
        assert!(prompt.contains("both must match"));
    }
}
