//! Delivery channel trait and shared error types.

use crate::target::DeliveryTarget;

/// Errors that can occur during notification delivery.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Delivery API error: {0}")]
    Api(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
}

/// A message delivery backend. Implementations are set on the router once
/// at startup and shared across all in-flight events.
#[async_trait::async_trait]
pub trait DeliveryChannel: Send + Sync {
    /// Deliver `text` to `target`.
    async fn deliver(&self, target: &DeliveryTarget, text: &str) -> Result<(), NotifyError>;

    /// Human-readable name for this channel (e.g. "telegram").
    fn channel_name(&self) -> &str;
}
