//! Per-rule applicability constraints.

use serde::{Deserialize, Serialize};

/// Constraints a rule places on the events it fires for.
///
/// Every present field must match (AND). An absent field is unconstrained;
/// an absent criteria block matches every event at the rule's points.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MatchCriteria {
    /// Exact tool name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    /// Regex tested against the event's command subject.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Exact topic, or `"*"` for "any event that has a topic".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// Require (true) or forbid (false) a sub-agent session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subagent: Option<bool>,
    /// Regex tested against the full session identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    /// Name of a host-registered predicate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicate: Option<String>,
}

impl MatchCriteria {
    /// Canonical form used by conflict detection: two criteria with the same
    /// signature constrain events identically.
    pub fn signature(&self) -> String {
        format!(
            "tool={:?} command={:?} topic={:?} subagent={:?} session={:?} predicate={:?}",
            self.tool, self.command, self.topic, self.subagent, self.session, self.predicate
        )
    }
}
