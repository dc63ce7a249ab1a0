use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tollgate_core::{template, ActionResult, EventContext};
use tollgate_rules::{Defaults, GateRule};
use tracing::{debug, warn};

use crate::action::{ActionError, ActionExecutor};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Path prefixes scripts may never be run from. Checked against the
/// canonicalized path before spawn, so symlinks cannot dodge the list.
const DENIED_PATH_PREFIXES: [&str; 6] = ["/etc", "/boot", "/proc", "/sys", "/sbin", "/usr/sbin"];

/// Runs a script (file path or inline shell) with event context exported as
/// `TOLLGATE_*` environment values.
///
/// Exit 0 passes; a non-zero exit fails the event with captured stderr as
/// the message. The timeout is a hard kill.
pub struct RunScriptAction {
    timeout: Duration,
}

impl RunScriptAction {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for RunScriptAction {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActionExecutor for RunScriptAction {
    fn name(&self) -> &str {
        "run-script"
    }

    async fn run(
        &self,
        rule: &GateRule,
        ctx: &EventContext,
        _defaults: Option<&Defaults>,
    ) -> Result<ActionResult, ActionError> {
        let script = rule
            .params
            .script
            .as_deref()
            .ok_or_else(|| ActionError::InvalidParams("run-script requires params.script".into()))?;
        let script = template::expand(script, ctx);

        let mut command = build_command(&script)?;
        command
            .envs(context_env(ctx))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(script = %script, timeout = ?self.timeout, "spawning script");
        let child = command
            .spawn()
            .map_err(|e| ActionError::ExecutionFailed(format!("failed to spawn script: {e}")))?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(ActionError::ExecutionFailed(format!(
                    "failed to collect script output: {e}"
                )))
            }
            Err(_) => {
                warn!(script = %script, timeout = ?self.timeout, "script timed out, killing");
                return Err(ActionError::Timeout(self.timeout));
            }
        };

        if output.status.success() {
            let mut result = ActionResult::pass("run-script", "script succeeded");
            if rule.params.capture_output {
                let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !stdout.is_empty() {
                    result = result.with_injected_context(stdout);
                }
            }
            Ok(result)
        } else {
            let code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("script exited with status {code}")
            } else {
                stderr
            };
            Ok(ActionResult::fail("run-script", message))
        }
    }
}

/// File paths run directly (after the denylist check); anything else is
/// handed to `sh -c` as inline content.
fn build_command(script: &str) -> Result<Command, ActionError> {
    let as_path = Path::new(script);
    if std::fs::metadata(as_path).map(|m| m.is_file()).unwrap_or(false) {
        let resolved = check_script_path(as_path)?;
        return Ok(Command::new(resolved));
    }
    let mut command = Command::new("sh");
    command.arg("-c").arg(script);
    Ok(command)
}

fn check_script_path(path: &Path) -> Result<PathBuf, ActionError> {
    let resolved = path.canonicalize().map_err(|e| {
        ActionError::ExecutionFailed(format!("cannot resolve script path '{}': {e}", path.display()))
    })?;
    for prefix in DENIED_PATH_PREFIXES {
        if resolved.starts_with(prefix) {
            return Err(ActionError::PermissionDenied(format!(
                "script path '{}' is under denied prefix '{prefix}'",
                resolved.display()
            )));
        }
    }
    Ok(resolved)
}

fn context_env(ctx: &EventContext) -> Vec<(String, String)> {
    vec![
        ("TOLLGATE_POINT".to_string(), ctx.point.to_string()),
        ("TOLLGATE_SESSION_ID".to_string(), ctx.session_id.clone()),
        (
            "TOLLGATE_TOOL".to_string(),
            ctx.tool_name.clone().unwrap_or_default(),
        ),
        (
            "TOLLGATE_TOPIC".to_string(),
            ctx.topic.clone().unwrap_or_default(),
        ),
        (
            "TOLLGATE_SUBJECT".to_string(),
            ctx.command_subject().to_string(),
        ),
        (
            "TOLLGATE_TIMESTAMP".to_string(),
            ctx.timestamp.to_rfc3339(),
        ),
    ]
}
