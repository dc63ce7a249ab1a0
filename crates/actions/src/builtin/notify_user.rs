use std::sync::Arc;

use async_trait::async_trait;
use tollgate_core::{template, ActionResult, EventContext};
use tollgate_llm::CompletionProvider;
use tollgate_notify::NotificationRouter;
use tollgate_rules::{Defaults, GateRule};
use tracing::warn;

use crate::action::{ActionError, ActionExecutor};
use crate::builtin::{model_summary, resolve_model};

/// Sends an operator notification through the router.
///
/// Delivery is fire-and-forget; the result reports only that the
/// notification was handed off, so this action always passes.
pub struct NotifyAction {
    router: Arc<NotificationRouter>,
    provider: Option<Arc<dyn CompletionProvider>>,
}

impl NotifyAction {
    pub fn new(
        router: Arc<NotificationRouter>,
        provider: Option<Arc<dyn CompletionProvider>>,
    ) -> Self {
        Self { router, provider }
    }
}

#[async_trait]
impl ActionExecutor for NotifyAction {
    fn name(&self) -> &str {
        "notify"
    }

    async fn run(
        &self,
        rule: &GateRule,
        ctx: &EventContext,
        defaults: Option<&Defaults>,
    ) -> Result<ActionResult, ActionError> {
        let mut text = match &rule.params.message {
            Some(message) => template::expand(message, ctx),
            None => format!("{} in session {}", ctx.point, ctx.session_id),
        };

        if rule.params.summarize {
            if let Some(provider) = &self.provider {
                let model = resolve_model(rule, defaults);
                match model_summary(provider, &model, ctx).await {
                    Ok(summary) if !summary.is_empty() => text = summary,
                    Ok(_) => {}
                    Err(e) => {
                        warn!(model = %model, error = %e, "notify summary failed, sending literal text");
                    }
                }
            }
        }

        let fallback = defaults.and_then(|d| d.notify_fallback.as_deref());
        let target = self.router.resolve_target(ctx, fallback);
        self.router.send(&target, &text);

        Ok(ActionResult::pass(
            "notify",
            format!("notification dispatched to {target}"),
        ))
    }
}
