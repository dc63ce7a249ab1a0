use async_trait::async_trait;

/// Trait for text-completion backends; each provider implements this.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// One-shot completion: system prompt plus a single user message,
    /// returning the assistant's response text. The model is chosen per
    /// call (rule params, then document defaults).
    async fn complete(
        &self,
        model: &str,
        system_prompt: &str,
        user_message: &str,
    ) -> Result<String, LlmError>;
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("API error ({status}): {body}")]
    ApiError { status: u16, body: String },
    #[error("failed to parse response: {0}")]
    ParseError(String),
    #[error("provider not configured: {0}")]
    NotConfigured(String),
}
