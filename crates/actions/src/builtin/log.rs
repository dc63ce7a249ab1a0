use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tollgate_core::{template, ActionResult, EventContext};
use tollgate_rules::{Defaults, GateRule};
use tracing::warn;

use crate::action::{ActionError, ActionExecutor};
use crate::builtin::append_line;

/// Appends one JSON line per event to the configured file.
///
/// Logging never fails the event: write errors fall back to stderr and the
/// result stays `passed = true`.
pub struct LogAction;

#[async_trait]
impl ActionExecutor for LogAction {
    fn name(&self) -> &str {
        "log"
    }

    async fn run(
        &self,
        rule: &GateRule,
        ctx: &EventContext,
        _defaults: Option<&Defaults>,
    ) -> Result<ActionResult, ActionError> {
        let line = context_line(ctx).to_string();
        let message = match &rule.params.file {
            Some(target) => {
                let path = PathBuf::from(template::expand(target, ctx));
                match append_line(&path, &line).await {
                    Ok(()) => format!("logged to {}", path.display()),
                    Err(e) => {
                        warn!(
                            path = %path.display(),
                            error = %e,
                            "log write failed, falling back to stderr"
                        );
                        eprintln!("{line}");
                        "logged to stderr (write failed)".to_string()
                    }
                }
            }
            None => {
                eprintln!("{line}");
                "logged to stderr".to_string()
            }
        };
        Ok(ActionResult::pass("log", message))
    }
}

fn context_line(ctx: &EventContext) -> Value {
    let mut fields = Map::new();
    fields.insert("timestamp".to_string(), json!(ctx.timestamp.to_rfc3339()));
    fields.insert("point".to_string(), json!(ctx.point));
    fields.insert("session".to_string(), json!(ctx.session_id));
    if let Some(tool) = &ctx.tool_name {
        fields.insert("tool".to_string(), json!(tool));
    }
    if let Some(topic) = &ctx.topic {
        fields.insert("topic".to_string(), json!(topic));
    }
    let subject = ctx.command_subject();
    if !subject.is_empty() {
        fields.insert("subject".to_string(), json!(subject));
    }
    Value::Object(fields)
}
