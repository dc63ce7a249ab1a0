//! Fire-and-forget notification routing.
//!
//! The router owns the (optional) delivery channel reference, set once at
//! startup. `send` never blocks and never surfaces a failure: a missing
//! channel, an unparsable target, or a delivery error is logged and
//! swallowed. Blocking or panicking here would let a courtesy notification
//! take down the pipeline it reports on.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use tollgate_core::EventContext;

use crate::session::SessionTracker;
use crate::target::DeliveryTarget;
use crate::traits::DeliveryChannel;

/// Extension-bag key carrying an explicit delivery target for sub-agent
/// events.
pub const NOTIFY_TARGET_KEY: &str = "notify_target";

pub struct NotificationRouter {
    channel: Option<Arc<dyn DeliveryChannel>>,
    tracker: Arc<SessionTracker>,
}

impl NotificationRouter {
    pub fn new(channel: Option<Arc<dyn DeliveryChannel>>, tracker: Arc<SessionTracker>) -> Self {
        Self { channel, tracker }
    }

    pub fn tracker(&self) -> &SessionTracker {
        &self.tracker
    }

    /// Deliver `text` to the target embedded in `session_id`, on a spawned
    /// task. Returns immediately; must be called within a Tokio runtime.
    pub fn send(&self, session_id: &str, text: &str) {
        let _ = self.dispatch(session_id, text);
    }

    fn dispatch(&self, session_id: &str, text: &str) -> Option<JoinHandle<()>> {
        let Some(channel) = self.channel.clone() else {
            debug!("no delivery channel configured, dropping notification");
            return None;
        };
        let Some(target) = DeliveryTarget::parse(session_id) else {
            debug!(session_id, "session id is not a deliverable target, dropping notification");
            return None;
        };
        let text = text.to_string();
        Some(tokio::spawn(async move {
            if let Err(e) = channel.deliver(&target, &text).await {
                warn!(target = %target, channel = channel.channel_name(), error = %e, "notification delivery failed");
            }
        }))
    }

    /// The session id notifications about `ctx` should route to.
    ///
    /// Primary events route to their own session. Sub-agent events carry no
    /// directly parsable target, so fall back in order: an explicit target
    /// in the extension bag, the most recent primary session, the configured
    /// fallback, and finally the sub-agent's own id (which typically parses
    /// to no delivery).
    pub fn resolve_target(&self, ctx: &EventContext, notify_fallback: Option<&str>) -> String {
        if !ctx.is_subagent() {
            return ctx.session_id.clone();
        }
        if let Some(target) = ctx
            .extra
            .get(NOTIFY_TARGET_KEY)
            .and_then(serde_json::Value::as_str)
        {
            return target.to_string();
        }
        if let Some(primary) = self.tracker.last_primary() {
            return primary;
        }
        if let Some(fallback) = notify_fallback {
            return fallback.to_string();
        }
        ctx.session_id.clone()
    }
}
