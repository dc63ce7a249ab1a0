use async_trait::async_trait;
use tollgate_core::{template, ActionResult, EventContext};
use tollgate_rules::{Defaults, GateRule};

use crate::action::{ActionError, ActionExecutor};
use crate::builtin::truncate;

const SUBJECT_PREVIEW_CHARS: usize = 80;

/// Unconditionally fails the event it fires at.
///
/// The whole decision lives in the rule's criteria; pairing a narrow `match`
/// with `block` turns the engine into a deny-list.
pub struct BlockAction;

#[async_trait]
impl ActionExecutor for BlockAction {
    fn name(&self) -> &str {
        "block"
    }

    async fn run(
        &self,
        rule: &GateRule,
        ctx: &EventContext,
        _defaults: Option<&Defaults>,
    ) -> Result<ActionResult, ActionError> {
        let message = match rule.on_failure.as_ref().and_then(|p| p.message.as_deref()) {
            Some(custom) => template::expand(custom, ctx),
            None => describe_block(ctx),
        };
        Ok(ActionResult::fail("block", message))
    }
}

/// Default block message: what was stopped, where.
fn describe_block(ctx: &EventContext) -> String {
    let subject = truncate(ctx.command_subject(), SUBJECT_PREVIEW_CHARS);
    match (&ctx.tool_name, subject.is_empty()) {
        (Some(tool), false) => format!("blocked {tool} ({subject}) at {}", ctx.point),
        (Some(tool), true) => format!("blocked {tool} at {}", ctx.point),
        (None, false) => format!("blocked '{subject}' at {}", ctx.point),
        (None, true) => format!("blocked event at {}", ctx.point),
    }
}
