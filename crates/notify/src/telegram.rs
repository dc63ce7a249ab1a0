//! Telegram Bot API delivery channel.
//!
//! Delivers through the `sendMessage` endpoint. Topic-scoped targets set
//! `message_thread_id` so messages land in the right forum thread.

use tracing::debug;

use crate::target::DeliveryTarget;
use crate::traits::{DeliveryChannel, NotifyError};

/// Sends notifications via the Telegram Bot API.
#[derive(Debug)]
pub struct TelegramChannel {
    bot_token: String,
    parse_mode: Option<String>,
    client: reqwest::Client,
}

impl TelegramChannel {
    /// Create a channel from configuration values.
    ///
    /// If `bot_token` starts with `${`, the value between `${` and `}` is
    /// resolved as an environment variable name. Returns
    /// [`NotifyError::Config`] if the token is empty or the env var is
    /// missing.
    pub fn from_config(
        bot_token: String,
        parse_mode: Option<String>,
    ) -> Result<Self, NotifyError> {
        let resolved_token = if bot_token.starts_with("${") {
            let var_name = bot_token
                .strip_prefix("${")
                .and_then(|s| s.strip_suffix('}'))
                .ok_or_else(|| {
                    NotifyError::Config(format!("malformed env var reference: {bot_token}"))
                })?;
            std::env::var(var_name).map_err(|_| {
                NotifyError::Config(format!("environment variable '{var_name}' is not set"))
            })?
        } else {
            bot_token
        };

        if resolved_token.is_empty() {
            return Err(NotifyError::Config(
                "Telegram bot token must not be empty".to_string(),
            ));
        }

        Ok(Self {
            bot_token: resolved_token,
            parse_mode,
            client: reqwest::Client::new(),
        })
    }

    fn request_body(&self, target: &DeliveryTarget, text: &str) -> serde_json::Value {
        let mut body = match target {
            DeliveryTarget::Group { chat_id, thread_id } => {
                let mut body = serde_json::json!({
                    "chat_id": chat_id,
                    "text": text,
                });
                if let Some(thread) = thread_id {
                    body["message_thread_id"] = serde_json::Value::from(*thread);
                }
                body
            }
            DeliveryTarget::Direct { user_id } => serde_json::json!({
                "chat_id": user_id,
                "text": text,
            }),
        };
        if let Some(mode) = &self.parse_mode {
            body["parse_mode"] = serde_json::Value::String(mode.clone());
        }
        body
    }
}

#[async_trait::async_trait]
impl DeliveryChannel for TelegramChannel {
    async fn deliver(&self, target: &DeliveryTarget, text: &str) -> Result<(), NotifyError> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let body = self.request_body(target, text);

        debug!(target = %target, "sending Telegram notification");

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        let resp_body: serde_json::Value = response.json().await?;

        if resp_body.get("ok") == Some(&serde_json::Value::Bool(true)) {
            debug!(target = %target, "Telegram notification sent");
            return Ok(());
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = resp_body
                .get("parameters")
                .and_then(|p| p.get("retry_after"))
                .and_then(|v| v.as_u64())
                .unwrap_or(30);
            return Err(NotifyError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        let description = resp_body
            .get("description")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown Telegram API error");
        Err(NotifyError::Api(description.to_string()))
    }

    fn channel_name(&self) -> &str {
        "telegram"
    }
}
