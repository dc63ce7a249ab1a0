//! Top-level rule document: version, defaults, ordered rules.

use serde::{Deserialize, Serialize};

use tollgate_core::EventPoint;

use super::{FailurePolicy, GateRule};

/// Document-wide fallbacks applied when a rule leaves a knob unset.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Defaults {
    /// Default model for LLM-backed actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Failure policy for rules without their own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_failure: Option<FailurePolicy>,
    /// Target-shaped string used when notification routing has nowhere
    /// better to deliver.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify_fallback: Option<String>,
}

/// An immutable, ordered rule set. Replaced wholesale on (re)load, never
/// mutated in place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GateDocument {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaults: Option<Defaults>,
    pub rules: Vec<GateRule>,
}

impl GateDocument {
    /// Empty document, for hosts that configure everything programmatically.
    pub fn empty() -> Self {
        Self {
            version: "1".to_string(),
            defaults: None,
            rules: Vec::new(),
        }
    }

    /// Enabled rules whose point set contains `point`. Criteria are not
    /// consulted; this is a cheap pre-filter.
    pub fn rules_for_point(&self, point: EventPoint) -> Vec<&GateRule> {
        self.rules
            .iter()
            .filter(|r| r.enabled && r.points.contains(&point))
            .collect()
    }
}
