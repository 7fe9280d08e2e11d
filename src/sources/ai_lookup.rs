//! LLM-backed web-search lookup over an OpenAI-compatible endpoint.

use async_trait::async_trait;
use tracing::debug;

use super::service::AiLookup;
use super::SourceError;
use crate::core::config::LookupLlmConfig;

pub struct OpenAiLookup {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl OpenAiLookup {
    pub fn new(client: reqwest::Client, config: &LookupLlmConfig) -> Self {
        Self {
            client,
            api_key: config.resolve_api_key(),
            base_url: config.resolve_base_url(),
            model: config.resolve_model(),
            max_tokens: config.resolve_max_tokens(),
        }
    }
}

/// One-shot `POST {base}/chat/completions`, returning the first choice's
/// message content. Shared by the lookup source and the match oracle.
pub(crate) async fn chat_completion(
    client: &reqwest::Client,
    base_url: &str,
    api_key: &str,
    model: &str,
    max_tokens: u32,
    prompt: &str,
) -> Result<String, SourceError> {
    let url = format!("{}/chat/completions", base_url.trim_end_matches('/'));
    let body = serde_json::json!({
        "model": model,
        "max_tokens": max_tokens,
        "messages": [
            {"role": "user", "content": prompt}
        ]
    });

    let builder = client.post(url).json(&body);
    // Only send Authorization when a key is provided. Key-less local
    // endpoints (Ollama / LM Studio) work without it.
    let builder = if api_key.is_empty() {
        builder
    } else {
        builder.bearer_auth(api_key.trim())
    };
    let response = builder.send().await?;

    let status = response.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(SourceError::RateLimited {
            reason: "http_429".to_string(),
        });
    }
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(SourceError::Http(format!(
            "chat.completions failed: status={} body={}",
            status, text
        )));
    }

    let value: serde_json::Value = response
        .json()
        .await
        .map_err(|e| SourceError::Malformed(e.to_string()))?;

    value
        .get("choices")
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| SourceError::Malformed("no message content in reply".to_string()))
}

#[async_trait]
impl AiLookup for OpenAiLookup {
    async fn ask(&self, prompt: &str) -> Result<String, SourceError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(SourceError::Unavailable(
                "no lookup api key configured".to_string(),
            ));
        };

        debug!(model = %self.model, "ai lookup");
        chat_completion(
            &self.client,
            &self.base_url,
            api_key,
            &self.model,
            self.max_tokens,
            prompt,
        )
        .await
    }
}
