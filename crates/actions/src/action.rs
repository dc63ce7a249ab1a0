use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tollgate_core::{ActionResult, EventContext};
use tollgate_rules::{Defaults, GateRule};

/// A unit of work the engine runs when a rule fires.
///
/// Implementations report what happened through [`ActionResult`] and reserve
/// `Err` for failures the rule's failure policy should handle (missing
/// params, spawn failures, timeouts). An action that merely *disapproves* of
/// the event returns `Ok` with `passed = false`.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    /// Identifier rules reference this action by.
    fn name(&self) -> &str;

    /// Execute against the event that fired the rule.
    async fn run(
        &self,
        rule: &GateRule,
        ctx: &EventContext,
        defaults: Option<&Defaults>,
    ) -> Result<ActionResult, ActionError>;
}

/// Errors surfaced by action execution and lookup.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("unknown action '{0}'")]
    Unknown(String),

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to load action: {0}")]
    LoadFailed(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Consulted when a rule names an action the registry does not know.
///
/// Hosts that support out-of-tree actions plug their loading scheme in here.
/// Load failures propagate to the caller so that a rule whose action cannot
/// be provided blocks instead of silently permitting. Criteria matching takes
/// the opposite, fail-open stance.
pub trait ActionLoader: Send + Sync {
    fn load(&self, name: &str) -> Result<Arc<dyn ActionExecutor>, ActionError>;
}

/// Default loader: refuses every name.
pub struct RefusingLoader;

impl ActionLoader for RefusingLoader {
    fn load(&self, name: &str) -> Result<Arc<dyn ActionExecutor>, ActionError> {
        Err(ActionError::LoadFailed(format!(
            "no loader configured for action '{name}'"
        )))
    }
}
