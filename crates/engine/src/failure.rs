//! Failure-policy resolution: what happens after an action errors or fails.

use std::time::Duration;

use tracing::debug;

use tollgate_core::{template, ActionResult, EventContext};
use tollgate_rules::{Defaults, FailureMode, GateRule};

use crate::engine::GateEngine;

/// Retry count when a retry policy names none.
pub const DEFAULT_RETRIES: u32 = 3;

const BASE_BACKOFF_MS: u64 = 100;

/// The policy that actually applies to one failed dispatch: the rule's own
/// `onFailure`, else the document default, else continue-with-no-frills.
#[derive(Debug, Clone)]
pub(crate) struct EffectivePolicy {
    pub mode: FailureMode,
    pub retries: u32,
    pub notify: bool,
    pub message: Option<String>,
}

pub(crate) fn effective_policy(rule: &GateRule, defaults: Option<&Defaults>) -> EffectivePolicy {
    let policy = rule
        .on_failure
        .as_ref()
        .or_else(|| defaults.and_then(|d| d.on_failure.as_ref()));
    match policy {
        Some(p) => EffectivePolicy {
            mode: p.mode,
            retries: p.retries.unwrap_or(DEFAULT_RETRIES),
            notify: p.notify,
            message: p.message.clone(),
        },
        // No policy anywhere resolves to continue, while the reroute check
        // in `execute` defaults to block. See the comment there.
        None => EffectivePolicy {
            mode: FailureMode::Continue,
            retries: DEFAULT_RETRIES,
            notify: false,
            message: None,
        },
    }
}

/// Sleep before retry `attempt` (1-based): 100ms, 200ms, 400ms, doubling.
/// The shift is capped so absurd retry counts cannot overflow the math.
pub fn backoff_delay(attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1).min(16);
    Duration::from_millis(BASE_BACKOFF_MS << exp)
}

impl GateEngine {
    /// Resolve a failed dispatch (`err` is the thrown or synthetic error
    /// text) into the result that takes its place. Never errors; every
    /// failure ends as a result the caller can read.
    pub(crate) async fn resolve_failure(
        &self,
        rule: &GateRule,
        ctx: &EventContext,
        defaults: Option<&Defaults>,
        err: &str,
    ) -> ActionResult {
        let policy = effective_policy(rule, defaults);
        let mut notified = false;

        let result = match policy.mode {
            FailureMode::Block => {
                let message = match &policy.message {
                    Some(custom) => template::expand(custom, ctx),
                    None => format!("action failed: {err}"),
                };
                ActionResult::fail(&rule.action, message)
            }
            FailureMode::Retry => self.retry_dispatch(rule, ctx, defaults, &policy, err).await,
            FailureMode::Notify => {
                self.send_failure_notice(rule, ctx, defaults, err);
                notified = true;
                ActionResult::pass(
                    &rule.action,
                    format!("action failed: {err} (user notified)"),
                )
            }
            FailureMode::Continue => ActionResult::pass(
                &rule.action,
                format!("action failed (continuing): {err}"),
            ),
        };

        if policy.notify && !notified {
            self.send_failure_notice(rule, ctx, defaults, &result.message);
        }
        result
    }

    /// Re-dispatch with backoff. A passing attempt wins; exhaustion
    /// soft-fails, so retries never ultimately block the pipeline.
    async fn retry_dispatch(
        &self,
        rule: &GateRule,
        ctx: &EventContext,
        defaults: Option<&Defaults>,
        policy: &EffectivePolicy,
        err: &str,
    ) -> ActionResult {
        for attempt in 1..=policy.retries {
            tokio::time::sleep(backoff_delay(attempt)).await;
            debug!(rule = rule.label(), attempt, "retrying action");
            match self.registry().dispatch(rule, ctx, defaults).await {
                Ok(mut result) if result.passed => {
                    result.message = format!("{} (succeeded on retry {attempt})", result.message);
                    return result;
                }
                Ok(result) => {
                    debug!(rule = rule.label(), attempt, message = %result.message, "retry failed");
                }
                Err(e) => {
                    debug!(rule = rule.label(), attempt, error = %e, "retry errored");
                }
            }
        }
        ActionResult::pass(
            &rule.action,
            format!("action failed after {} retries: {err}", policy.retries),
        )
    }

    /// Best-effort operator notice about a failure. Never blocks, never
    /// errors.
    pub(crate) fn send_failure_notice(
        &self,
        rule: &GateRule,
        ctx: &EventContext,
        defaults: Option<&Defaults>,
        text: &str,
    ) {
        let fallback = defaults.and_then(|d| d.notify_fallback.as_deref());
        let target = self.router().resolve_target(ctx, fallback);
        self.router()
            .send(&target, &format!("rule '{}': {text}", rule.label()));
    }
}
