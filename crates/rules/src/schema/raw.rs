//! Permissive first-pass deserialization structs.
//!
//! Everything optional and loosely typed so a malformed document still
//! parses far enough for [`crate::validation`] to report every violation
//! with its field path, instead of stopping at the first serde error.

use serde::Deserialize;

/// A value written as either one scalar or a sequence.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(v) => vec![v],
            OneOrMany::Many(vs) => vs,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawDocument {
    /// Loose so `version: 1` and `version: "1"` both land here.
    pub version: Option<serde_yaml::Value>,
    pub defaults: Option<RawDefaults>,
    pub rules: Option<Vec<RawRule>>,
    /// Alias list key; exactly one of `rules`/`hooks` may be present.
    pub hooks: Option<Vec<RawRule>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawDefaults {
    pub model: Option<String>,
    pub on_failure: Option<RawFailure>,
    pub notify_fallback: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawRule {
    pub name: Option<String>,
    /// Single point, `point: tool-pre`.
    pub point: Option<OneOrMany<String>>,
    /// Or a list, `points: [tool-pre, tool-post]`. Writing both keys is a
    /// validation error.
    pub points: Option<OneOrMany<String>>,
    #[serde(rename = "match")]
    pub criteria: Option<RawCriteria>,
    pub action: Option<String>,
    pub params: Option<RawParams>,
    pub on_failure: Option<RawFailure>,
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawCriteria {
    pub tool: Option<String>,
    pub command: Option<String>,
    pub topic: Option<String>,
    pub subagent: Option<bool>,
    pub session: Option<String>,
    pub predicate: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawParams {
    pub model: Option<String>,
    pub file: Option<String>,
    pub script: Option<String>,
    pub capture_output: Option<bool>,
    pub limit: Option<i64>,
    pub message: Option<String>,
    pub summarize: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawFailure {
    pub mode: Option<String>,
    pub retries: Option<i64>,
    pub notify: Option<bool>,
    pub message: Option<String>,
}
