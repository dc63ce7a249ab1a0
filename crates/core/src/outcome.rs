//! Result type returned from every action dispatch.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// Outcome of one action dispatch, as seen by the host pipeline.
///
/// `passed == false` halts the current event: the engine short-circuits and
/// later rules never run. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub passed: bool,
    /// Identifier of the action that produced this result.
    pub action: String,
    pub message: String,
    /// Wall-clock dispatch time, stamped by the registry.
    #[serde(default)]
    pub duration: Duration,
    /// Content the host should surface to the model as extra context.
    #[serde(default)]
    pub injected_context: Option<String>,
    /// Replacement tool arguments; the host applies them after the call
    /// returns (the engine never mutates the event context itself).
    #[serde(default)]
    pub modified_args: Option<Map<String, Value>>,
}

impl ActionResult {
    pub fn pass(action: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            passed: true,
            action: action.into(),
            message: message.into(),
            duration: Duration::ZERO,
            injected_context: None,
            modified_args: None,
        }
    }

    pub fn fail(action: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            passed: false,
            ..Self::pass(action, message)
        }
    }

    pub fn with_injected_context(mut self, content: impl Into<String>) -> Self {
        self.injected_context = Some(content.into());
        self
    }

    pub fn with_modified_args(mut self, args: Map<String, Value>) -> Self {
        self.modified_args = Some(args);
        self
    }
}
