//! Document loading: read, two-pass parse, all-or-nothing validation.

use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::schema::{GateDocument, RawDocument};
use crate::validation;

/// Errors surfaced while loading a rule document.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Filesystem I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse/deserialization error.
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Structural validation failure, carrying the full report.
    #[error("validation failed: {0}")]
    Validation(validation::ValidationResult),
}

/// Result alias for loader operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Parse one YAML document. All-or-nothing: any structural violation fails
/// the parse, carrying every error found in one pass.
pub fn parse_document(input: &str) -> Result<GateDocument> {
    let raw: RawDocument = serde_yaml::from_str(input)?;
    let (doc, report) = validation::convert_document(raw);
    if !report.valid {
        return Err(ConfigError::Validation(report));
    }
    for w in &report.warnings {
        warn!(path = %w.path, "{}", w.message);
    }
    Ok(doc)
}

/// Load one document from disk, stamping each rule with its source path.
pub fn load_document(path: &Path) -> Result<GateDocument> {
    let content = fs::read_to_string(path)?;
    let mut doc = parse_document(&content)?;
    for rule in &mut doc.rules {
        rule.source = Some(path.to_path_buf());
    }
    debug!(path = %path.display(), rules = doc.rules.len(), "loaded rule document");
    Ok(doc)
}
