//! Built-in actions.

use std::path::Path;
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tollgate_core::EventContext;
use tollgate_llm::CompletionProvider;
use tollgate_notify::NotificationRouter;
use tollgate_rules::{Defaults, GateRule};

use crate::registry::{ActionRegistry, RegistryError};

mod block;
mod inject;
mod log;
mod notify_user;
mod script;
mod summarize;

pub use block::BlockAction;
pub use inject::InjectContextAction;
pub use log::LogAction;
pub use notify_user::NotifyAction;
pub use script::RunScriptAction;
pub use summarize::SummarizeAction;

/// Model used when neither the rule nor the document defaults name one.
pub(crate) const DEFAULT_MODEL: &str = "claude-3-5-haiku-latest";

pub(crate) const SUMMARY_SYSTEM_PROMPT: &str =
    "You summarize automated pipeline events for a human operator. \
     Reply with a single short sentence and nothing else.";

/// Register all six built-ins on `registry`.
pub fn register_builtins(
    registry: &mut ActionRegistry,
    router: Arc<NotificationRouter>,
    provider: Option<Arc<dyn CompletionProvider>>,
) -> Result<(), RegistryError> {
    registry.register(BlockAction)?;
    registry.register(LogAction)?;
    registry.register(RunScriptAction::new())?;
    registry.register(InjectContextAction)?;
    registry.register(SummarizeAction::new(provider.clone()))?;
    registry.register(NotifyAction::new(router, provider))?;
    Ok(())
}

/// Rule model, then document default, then [`DEFAULT_MODEL`].
pub(crate) fn resolve_model(rule: &GateRule, defaults: Option<&Defaults>) -> String {
    rule.params
        .model
        .clone()
        .or_else(|| defaults.and_then(|d| d.model.clone()))
        .unwrap_or_else(|| DEFAULT_MODEL.to_string())
}

/// One-paragraph description of the event, fed to summary prompts.
pub(crate) fn describe_event(ctx: &EventContext) -> String {
    let mut parts = vec![format!("Event: {}", ctx.point)];
    parts.push(format!("Session: {}", ctx.session_id));
    if let Some(tool) = &ctx.tool_name {
        parts.push(format!("Tool: {tool}"));
    }
    let subject = ctx.command_subject();
    if !subject.is_empty() {
        parts.push(format!("Subject: {}", truncate(subject, 400)));
    }
    if let Some(response) = &ctx.response {
        parts.push(format!("Response: {}", truncate(response, 400)));
    }
    parts.join("\n")
}

pub(crate) async fn model_summary(
    provider: &Arc<dyn CompletionProvider>,
    model: &str,
    ctx: &EventContext,
) -> Result<String, tollgate_llm::LlmError> {
    let completion = provider
        .complete(model, SUMMARY_SYSTEM_PROMPT, &describe_event(ctx))
        .await?;
    Ok(completion.trim().to_string())
}

/// Append `line` to `path`, creating parent directories on first write.
pub(crate) async fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    file.write_all(b"\n").await?;
    Ok(())
}

/// Char-safe truncation with an ellipsis marker.
pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let head: String = text.chars().take(max_chars).collect();
    format!("{head}...")
}
