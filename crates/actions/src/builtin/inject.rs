use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tollgate_core::{template, ActionResult, EventContext};
use tollgate_rules::{Defaults, GateRule};
use tracing::debug;

use crate::action::{ActionError, ActionExecutor};

const DEFAULT_TAIL_LIMIT: usize = 10;

/// Reads a file and hands its content to the host as injected context.
///
/// Line-delimited `.jsonl` sources are tailed to the last `params.limit`
/// entries (default 10); anything else is injected whole. A missing or
/// unreadable source degrades to a pass with no content, so a rule pointed
/// at a not-yet-written file never stalls the pipeline.
pub struct InjectContextAction;

#[async_trait]
impl ActionExecutor for InjectContextAction {
    fn name(&self) -> &str {
        "inject-context"
    }

    async fn run(
        &self,
        rule: &GateRule,
        ctx: &EventContext,
        _defaults: Option<&Defaults>,
    ) -> Result<ActionResult, ActionError> {
        let target = rule.params.file.as_deref().ok_or_else(|| {
            ActionError::InvalidParams("inject-context requires params.file".into())
        })?;
        let path = PathBuf::from(template::expand(target, ctx));

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "context source unavailable");
                return Ok(ActionResult::pass(
                    "inject-context",
                    format!("context source unavailable: {}", path.display()),
                ));
            }
        };

        let limit = rule.params.limit.unwrap_or(DEFAULT_TAIL_LIMIT);
        let (injected, count) = if is_jsonl(&path) {
            let tail = tail_lines(&content, limit);
            let count = tail.len();
            (tail.join("\n"), count)
        } else {
            (content, 1)
        };

        if injected.is_empty() {
            return Ok(ActionResult::pass(
                "inject-context",
                format!("no content in {}", path.display()),
            ));
        }

        Ok(
            ActionResult::pass("inject-context", format!("injected {count} entries"))
                .with_injected_context(injected),
        )
    }
}

fn is_jsonl(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "jsonl")
}

/// Last `limit` non-empty lines, in file order.
fn tail_lines(content: &str, limit: usize) -> Vec<String> {
    let lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(limit);
    lines[start..].iter().map(|l| l.to_string()).collect()
}
