//! Failure policy: what the engine does when an action errors or fails.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a failed action dispatch is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureMode {
    /// Halt the event with `passed = false`.
    Block,
    /// Re-dispatch with exponential backoff; soft-fails after exhaustion.
    Retry,
    /// Tell the operator, then let the event proceed.
    Notify,
    /// Log and let the event proceed.
    Continue,
}

impl FailureMode {
    pub const ALL: [FailureMode; 4] = [
        FailureMode::Block,
        FailureMode::Retry,
        FailureMode::Notify,
        FailureMode::Continue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureMode::Block => "block",
            FailureMode::Retry => "retry",
            FailureMode::Notify => "notify",
            FailureMode::Continue => "continue",
        }
    }
}

impl fmt::Display for FailureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailureMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "block" => Ok(FailureMode::Block),
            "retry" => Ok(FailureMode::Retry),
            "notify" => Ok(FailureMode::Notify),
            "continue" => Ok(FailureMode::Continue),
            other => Err(format!(
                "unknown failure mode: '{}' (valid: block, retry, notify, continue)",
                other
            )),
        }
    }
}

/// Per-rule or document-default failure handling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FailurePolicy {
    pub mode: FailureMode,
    /// Attempt count for `retry`; resolution falls back to 3.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
    /// Additionally send the failure message to the operator, whatever the mode.
    #[serde(default)]
    pub notify: bool,
    /// Operator-facing message override; supports template placeholders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl FailurePolicy {
    pub fn new(mode: FailureMode) -> Self {
        Self {
            mode,
            retries: None,
            notify: false,
            message: None,
        }
    }
}
