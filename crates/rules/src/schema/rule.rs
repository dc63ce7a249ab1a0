//! A single gate rule: where it fires, what must match, what runs.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use tollgate_core::EventPoint;

use super::{FailurePolicy, MatchCriteria};

/// Free-form parameters interpreted by the dispatched action.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActionParams {
    /// Model identifier for LLM-backed actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// File target (log destination, injection source). Template-expanded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Script path or inline shell content. Template-expanded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    /// Return stdout as injected context on success (run-script).
    #[serde(default)]
    pub capture_output: bool,
    /// Entry-count limit for tailed sources (inject-context).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// Literal notification text. Template-expanded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Summarize via the model before sending (notify).
    #[serde(default)]
    pub summarize: bool,
}

impl ActionParams {
    pub fn is_empty(&self) -> bool {
        self.model.is_none()
            && self.file.is_none()
            && self.script.is_none()
            && !self.capture_output
            && self.limit.is_none()
            && self.message.is_none()
            && !self.summarize
    }
}

/// One gate rule. Document order is execution order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GateRule {
    /// Optional author-facing name; unnamed rules are skipped by
    /// duplicate-name conflict detection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Event points this rule fires at (non-empty).
    pub points: Vec<EventPoint>,
    /// Applicability constraints; absent means "always".
    #[serde(rename = "match", default, skip_serializing_if = "Option::is_none")]
    pub criteria: Option<MatchCriteria>,
    /// Built-in action name or external module reference.
    pub action: String,
    #[serde(default, skip_serializing_if = "ActionParams::is_empty")]
    pub params: ActionParams,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_failure: Option<FailurePolicy>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Source document path, stamped during load.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl GateRule {
    /// The name to log and report under: explicit name, else action id.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.action)
    }
}

pub(crate) fn default_true() -> bool {
    true
}
