use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::provider::{CompletionProvider, LlmError};

/// Summaries are short; cap the response accordingly.
const MAX_COMPLETION_TOKENS: u32 = 512;

pub struct ClaudeProvider {
    client: reqwest::Client,
    api_key: String,
}

impl ClaudeProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
        }
    }

    /// Build from the conventional `ANTHROPIC_API_KEY` environment variable.
    pub fn from_env() -> Result<Self, LlmError> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| LlmError::NotConfigured("ANTHROPIC_API_KEY is not set".to_string()))?;
        Ok(Self::new(api_key))
    }
}

#[async_trait]
impl CompletionProvider for ClaudeProvider {
    async fn complete(
        &self,
        model: &str,
        system_prompt: &str,
        user_message: &str,
    ) -> Result<String, LlmError> {
        let url = "https://api.anthropic.com/v1/messages";

        // The messages API takes the system prompt as a separate parameter.
        let body = json!({
            "model": model,
            "max_tokens": MAX_COMPLETION_TOKENS,
            "system": system_prompt,
            "messages": [{ "role": "user", "content": user_message }],
        });

        debug!(model, "Claude request to {}", url);

        let response = self
            .client
            .post(url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError { status, body });
        }

        let resp: serde_json::Value = response.json().await?;
        let content = resp["content"][0]["text"]
            .as_str()
            .ok_or_else(|| LlmError::ParseError("missing content[0].text".into()))?
            .to_string();

        Ok(content)
    }
}
