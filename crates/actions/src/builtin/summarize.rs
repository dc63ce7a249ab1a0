use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tollgate_core::{template, ActionResult, EventContext};
use tollgate_llm::CompletionProvider;
use tollgate_rules::{Defaults, GateRule};
use tracing::warn;

use crate::action::{ActionError, ActionExecutor};
use crate::builtin::{append_line, model_summary, resolve_model};

/// Produces a short model-written summary of the event.
///
/// Degrades to a deterministic template when no provider is configured or
/// the completion fails; summarization never fails the event.
pub struct SummarizeAction {
    provider: Option<Arc<dyn CompletionProvider>>,
}

impl SummarizeAction {
    pub fn new(provider: Option<Arc<dyn CompletionProvider>>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl ActionExecutor for SummarizeAction {
    fn name(&self) -> &str {
        "summarize"
    }

    async fn run(
        &self,
        rule: &GateRule,
        ctx: &EventContext,
        defaults: Option<&Defaults>,
    ) -> Result<ActionResult, ActionError> {
        let summary = match &self.provider {
            Some(provider) => {
                let model = resolve_model(rule, defaults);
                match model_summary(provider, &model, ctx).await {
                    Ok(summary) if !summary.is_empty() => summary,
                    Ok(_) => fallback_summary(ctx),
                    Err(e) => {
                        warn!(model = %model, error = %e, "summary completion failed");
                        fallback_summary(ctx)
                    }
                }
            }
            None => fallback_summary(ctx),
        };

        if let Some(target) = &rule.params.file {
            let path = PathBuf::from(template::expand(target, ctx));
            if let Err(e) = append_line(&path, &summary).await {
                warn!(path = %path.display(), error = %e, "summary write failed");
                eprintln!("{summary}");
            }
        }

        Ok(ActionResult::pass("summarize", summary))
    }
}

/// Used whenever the model cannot answer. Stable shape, safe to grep.
fn fallback_summary(ctx: &EventContext) -> String {
    let mut summary = format!("{} in session {}", ctx.point, ctx.session_id);
    if let Some(tool) = &ctx.tool_name {
        summary.push_str(&format!(" (tool: {tool})"));
    }
    if let Some(topic) = &ctx.topic {
        summary.push_str(&format!(" [{topic}]"));
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use tollgate_core::EventPoint;
    use tollgate_llm::LlmError;
    use tollgate_rules::ActionParams;

    struct ScriptedProvider {
        reply: Option<&'static str>,
    }

    #[async_trait]
    impl CompletionProvider for ScriptedProvider {
        async fn complete(
            &self,
            _model: &str,
            _system_prompt: &str,
            _user_message: &str,
        ) -> Result<String, LlmError> {
            match self.reply {
                Some(reply) => Ok(reply.to_string()),
                None => Err(LlmError::ApiError {
                    status: 500,
                    body: "backend down".to_string(),
                }),
            }
        }
    }

    fn rule(file: Option<String>) -> GateRule {
        GateRule {
            name: None,
            points: vec![EventPoint::Stop],
            criteria: None,
            action: "summarize".to_string(),
            params: ActionParams {
                file,
                ..Default::default()
            },
            on_failure: None,
            enabled: true,
            source: None,
        }
    }

    fn ctx() -> EventContext {
        EventContext::new(EventPoint::Stop, "s-1").with_tool("bash", serde_json::json!({}))
    }

    #[tokio::test]
    async fn uses_provider_reply() {
        let action = SummarizeAction::new(Some(Arc::new(ScriptedProvider {
            reply: Some("session wrapped up cleanly"),
        })));
        let result = action.run(&rule(None), &ctx(), None).await.unwrap();
        assert!(result.passed);
        assert_eq!(result.message, "session wrapped up cleanly");
    }

    #[tokio::test]
    async fn provider_failure_degrades_to_template() {
        let action = SummarizeAction::new(Some(Arc::new(ScriptedProvider { reply: None })));
        let result = action.run(&rule(None), &ctx(), None).await.unwrap();
        assert!(result.passed);
        assert_eq!(result.message, "stop in session s-1 (tool: bash)");
    }

    #[tokio::test]
    async fn no_provider_degrades_to_template() {
        let action = SummarizeAction::new(None);
        let result = action.run(&rule(None), &ctx(), None).await.unwrap();
        assert!(result.passed);
        assert!(result.message.starts_with("stop in session s-1"));
    }

    #[tokio::test]
    async fn writes_summary_to_file_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summaries/{session_id}.log");
        let action = SummarizeAction::new(Some(Arc::new(ScriptedProvider {
            reply: Some("all good"),
        })));

        let result = action
            .run(&rule(Some(path.to_str().unwrap().to_string())), &ctx(), None)
            .await
            .unwrap();
        assert_eq!(result.message, "all good");

        let written = std::fs::read_to_string(dir.path().join("summaries/s-1.log")).unwrap();
        assert_eq!(written, "all good\n");
    }
}
