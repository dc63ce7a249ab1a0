//! Structural validation and typed conversion for rule documents.
//!
//! Converts the permissive raw pass into the typed schema, collecting every
//! violation in one sweep. Errors carry JSON-path-like locations
//! (`rules[2].onFailure.mode`) and, where a close candidate exists, a
//! "did you mean ...?" suggestion. Regex strings, file targets, script paths
//! and predicate references are deliberately not checked here; they resolve
//! lazily at match or dispatch time.

pub(crate) mod fuzzy;

use std::fmt;

use serde::{Deserialize, Serialize};

use tollgate_core::EventPoint;

use crate::schema::{
    ActionParams, Defaults, FailureMode, FailurePolicy, GateDocument, GateRule, MatchCriteria,
    OneOrMany, RawCriteria, RawDefaults, RawDocument, RawFailure, RawParams, RawRule,
};

/// Built-in action identifiers, for near-miss suggestions only. Anything
/// else is treated as an external module reference and loads lazily.
const KNOWN_ACTIONS: &[&str] = &[
    "block",
    "log",
    "run-script",
    "summarize",
    "inject-context",
    "notify",
];

// ── Result types ────────────────────────────────────────────────────

/// Overall validation outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

/// A blocking validation error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationError {
    /// JSON-path-like location, e.g. `"rules[2].onFailure.mode"`.
    pub path: String,
    pub message: String,
    /// Optional "did you mean ...?" suggestion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// A non-blocking advisory warning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationResult {
    pub(crate) fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub(crate) fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.valid = false;
        self.errors.push(ValidationError {
            path: path.into(),
            message: message.into(),
            suggestion: None,
        });
    }

    pub(crate) fn error_with_suggestion(
        &mut self,
        path: impl Into<String>,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) {
        self.valid = false;
        self.errors.push(ValidationError {
            path: path.into(),
            message: message.into(),
            suggestion: Some(suggestion.into()),
        });
    }

    pub(crate) fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ValidationWarning {
            path: path.into(),
            message: message.into(),
        });
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error(s)", self.errors.len())?;
        for e in &self.errors {
            write!(f, "; {}: {}", e.path, e.message)?;
            if let Some(s) = &e.suggestion {
                write!(f, " (did you mean '{}'?)", s)?;
            }
        }
        Ok(())
    }
}

// ── Conversion ──────────────────────────────────────────────────────

/// Convert a raw document into the typed schema, collecting every
/// structural violation in one pass.
///
/// The returned document omits rules that failed conversion; callers must
/// treat it as unusable unless `result.valid`.
pub fn convert_document(raw: RawDocument) -> (GateDocument, ValidationResult) {
    let mut result = ValidationResult::new();

    let version = match &raw.version {
        Some(v) => scalar_string(v).unwrap_or_else(|| {
            result.error("version", "must be a string or number");
            String::new()
        }),
        None => {
            result.error("version", "required field is missing");
            String::new()
        }
    };

    let defaults = raw
        .defaults
        .map(|d| convert_defaults(d, &mut result));

    let raw_rules = match (raw.rules, raw.hooks) {
        (Some(rules), None) => rules,
        (None, Some(hooks)) => hooks,
        (Some(rules), Some(_)) => {
            result.error("rules", "'rules' and 'hooks' are aliases; use exactly one");
            rules
        }
        (None, None) => {
            result.error("rules", "document must contain a 'rules' (or 'hooks') list");
            Vec::new()
        }
    };

    let mut rules = Vec::with_capacity(raw_rules.len());
    for (index, raw_rule) in raw_rules.into_iter().enumerate() {
        if let Some(rule) = convert_rule(raw_rule, index, &mut result) {
            rules.push(rule);
        }
    }

    (
        GateDocument {
            version,
            defaults,
            rules,
        },
        result,
    )
}

fn convert_defaults(raw: RawDefaults, result: &mut ValidationResult) -> Defaults {
    Defaults {
        model: raw.model,
        on_failure: raw
            .on_failure
            .and_then(|f| convert_failure(f, "defaults.onFailure", result)),
        notify_fallback: raw.notify_fallback,
    }
}

/// Returns None when this rule produced errors; the document is rejected
/// either way, this just keeps partially converted rules out of it.
fn convert_rule(raw: RawRule, index: usize, result: &mut ValidationResult) -> Option<GateRule> {
    let errors_before = result.errors.len();

    let points = convert_points(raw.point, raw.points, index, result);

    let action = match raw.action {
        Some(a) if !a.trim().is_empty() => a,
        Some(_) => {
            result.error(format!("rules[{}].action", index), "must not be empty");
            String::new()
        }
        None => {
            result.error(format!("rules[{}].action", index), "required field is missing");
            String::new()
        }
    };

    if !action.is_empty() && !KNOWN_ACTIONS.contains(&action.as_str()) {
        if let Some(suggestion) = fuzzy::fuzzy_match(&action, KNOWN_ACTIONS) {
            result.warn(
                format!("rules[{}].action", index),
                format!(
                    "'{}' is not a built-in; did you mean '{}'? (unknown actions load as external modules)",
                    action, suggestion
                ),
            );
        }
    }

    let params = raw
        .params
        .map(|p| convert_params(p, index, result))
        .unwrap_or_default();

    let on_failure = raw
        .on_failure
        .and_then(|f| convert_failure(f, &format!("rules[{}].onFailure", index), result));

    let rule = GateRule {
        name: raw.name,
        points,
        criteria: raw.criteria.map(convert_criteria),
        action,
        params,
        on_failure,
        enabled: raw.enabled.unwrap_or(true),
        source: None,
    };

    (result.errors.len() == errors_before).then_some(rule)
}

fn convert_points(
    point: Option<OneOrMany<String>>,
    points: Option<OneOrMany<String>>,
    index: usize,
    result: &mut ValidationResult,
) -> Vec<EventPoint> {
    let path = format!("rules[{}].points", index);

    let names = match (point, points) {
        (Some(single), None) => single.into_vec(),
        (None, Some(many)) => many.into_vec(),
        (Some(single), Some(_)) => {
            result.error(path.as_str(), "'point' and 'points' are aliases; use exactly one");
            single.into_vec()
        }
        (None, None) => {
            result.error(path.as_str(), "at least one event point is required");
            return Vec::new();
        }
    };

    if names.is_empty() {
        result.error(path.as_str(), "at least one event point is required");
        return Vec::new();
    }

    let candidates: Vec<&str> = EventPoint::ALL.iter().map(|p| p.as_str()).collect();
    let mut out = Vec::with_capacity(names.len());
    for name in &names {
        match name.parse::<EventPoint>() {
            Ok(p) => out.push(p),
            Err(_) => match fuzzy::fuzzy_match(name, &candidates) {
                Some(suggestion) => result.error_with_suggestion(
                    path.as_str(),
                    format!("unknown event point '{}'", name),
                    suggestion,
                ),
                None => result.error(path.as_str(), format!("unknown event point '{}'", name)),
            },
        }
    }
    out
}

fn convert_criteria(raw: RawCriteria) -> MatchCriteria {
    MatchCriteria {
        tool: raw.tool,
        command: raw.command,
        topic: raw.topic,
        subagent: raw.subagent,
        session: raw.session,
        predicate: raw.predicate,
    }
}

fn convert_params(raw: RawParams, index: usize, result: &mut ValidationResult) -> ActionParams {
    let limit = match raw.limit {
        Some(n) if n >= 1 => Some(n as usize),
        Some(n) => {
            result.error(
                format!("rules[{}].params.limit", index),
                format!("must be a positive integer, got {}", n),
            );
            None
        }
        None => None,
    };

    ActionParams {
        model: raw.model,
        file: raw.file,
        script: raw.script,
        capture_output: raw.capture_output.unwrap_or(false),
        limit,
        message: raw.message,
        summarize: raw.summarize.unwrap_or(false),
    }
}

fn convert_failure(
    raw: RawFailure,
    base: &str,
    result: &mut ValidationResult,
) -> Option<FailurePolicy> {
    let mode = match raw.mode {
        Some(m) => match m.parse::<FailureMode>() {
            Ok(mode) => Some(mode),
            Err(_) => {
                let candidates: Vec<&str> = FailureMode::ALL.iter().map(|m| m.as_str()).collect();
                let message = format!("unknown failure mode '{}'", m);
                match fuzzy::fuzzy_match(&m, &candidates) {
                    Some(suggestion) => {
                        result.error_with_suggestion(format!("{}.mode", base), message, suggestion)
                    }
                    None => result.error(format!("{}.mode", base), message),
                }
                None
            }
        },
        None => {
            result.error(
                format!("{}.mode", base),
                "required when onFailure is present",
            );
            None
        }
    };

    let retries = match raw.retries {
        Some(n) if (1..=i64::from(u32::MAX)).contains(&n) => Some(n as u32),
        Some(n) => {
            result.error(
                format!("{}.retries", base),
                format!("must be a positive integer, got {}", n),
            );
            None
        }
        None => None,
    };

    if retries.is_some() && mode.is_some() && mode != Some(FailureMode::Retry) {
        result.warn(
            format!("{}.retries", base),
            "only meaningful when mode is 'retry'",
        );
    }

    Some(FailurePolicy {
        mode: mode?,
        retries,
        notify: raw.notify.unwrap_or(false),
        message: raw.message,
    })
}

fn scalar_string(v: &serde_yaml::Value) -> Option<String> {
    match v {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
