//! Additional-document discovery: bounded scan, primary-wins merge,
//! advisory conflict detection.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

use tollgate_core::EventPoint;

use crate::schema::GateDocument;

/// File names recognized as rule documents.
pub const CONFIG_FILE_NAMES: [&str; 2] = ["tollgate.yml", "tollgate.yaml"];

/// Directory names skipped during scans.
pub const DEFAULT_IGNORE_DIRS: [&str; 6] = [
    ".git",
    "node_modules",
    "target",
    "dist",
    ".venv",
    "__pycache__",
];

/// Default depth bound for [`scan`].
pub const DEFAULT_MAX_DEPTH: usize = 8;

/// Walk `root` for rule documents, depth-bounded, skipping ignored directory
/// names. Order is deterministic (lexicographic within each directory).
pub fn scan(root: &Path, max_depth: usize, ignore_dirs: &[&str]) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let walker = WalkDir::new(root)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !(e.file_type().is_dir() && name_in(e.file_name(), ignore_dirs)));

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry during scan");
                continue;
            }
        };
        if entry.file_type().is_file() && name_in(entry.file_name(), &CONFIG_FILE_NAMES) {
            found.push(entry.into_path());
        }
    }
    found
}

fn name_in(name: &std::ffi::OsStr, set: &[&str]) -> bool {
    name.to_str().map_or(false, |n| set.contains(&n))
}

/// Merge secondaries into `primary`: the primary's version and defaults win;
/// rule lists concatenate primary-first. Rules keep their stamped sources.
pub fn merge(primary: GateDocument, secondaries: Vec<GateDocument>) -> GateDocument {
    let mut merged = primary;
    for doc in secondaries {
        merged.rules.extend(doc.rules);
    }
    merged
}

/// An advisory authoring conflict across documents. Never blocks a load.
#[derive(Debug, Clone, PartialEq)]
pub enum Conflict {
    /// The same rule name appears in more than one document.
    DuplicateName { name: String, sources: Vec<PathBuf> },
    /// Rules in different documents constrain the same events identically.
    OverlappingMatch {
        point: EventPoint,
        sources: Vec<PathBuf>,
    },
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conflict::DuplicateName { name, sources } => {
                write!(f, "rule name '{}' defined in {}", name, join_paths(sources))
            }
            Conflict::OverlappingMatch { point, sources } => write!(
                f,
                "rules in {} match the same events at {}",
                join_paths(sources),
                point
            ),
        }
    }
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Detect authoring conflicts across documents.
///
/// Flags (a) the same rule name in different documents and (b) rules from
/// different documents with an identical point + criteria signature.
/// Repetition inside one document is the author's business and is not
/// flagged.
pub fn detect_conflicts(documents: &[GateDocument]) -> Vec<Conflict> {
    let mut by_name: HashMap<&str, Vec<(usize, PathBuf)>> = HashMap::new();
    let mut by_match: HashMap<(EventPoint, String), Vec<(usize, PathBuf)>> = HashMap::new();

    for (idx, doc) in documents.iter().enumerate() {
        for rule in &doc.rules {
            let source = rule
                .source
                .clone()
                .unwrap_or_else(|| PathBuf::from("<in-memory>"));
            if let Some(name) = &rule.name {
                by_name
                    .entry(name.as_str())
                    .or_default()
                    .push((idx, source.clone()));
            }
            let signature = rule
                .criteria
                .as_ref()
                .map_or_else(|| "any".to_string(), |c| c.signature());
            for point in &rule.points {
                by_match
                    .entry((*point, signature.clone()))
                    .or_default()
                    .push((idx, source.clone()));
            }
        }
    }

    let mut conflicts = Vec::new();
    for (name, occurrences) in by_name {
        if spans_documents(&occurrences) {
            conflicts.push(Conflict::DuplicateName {
                name: name.to_string(),
                sources: occurrences.into_iter().map(|(_, s)| s).collect(),
            });
        }
    }
    for ((point, _), occurrences) in by_match {
        if spans_documents(&occurrences) {
            conflicts.push(Conflict::OverlappingMatch {
                point,
                sources: occurrences.into_iter().map(|(_, s)| s).collect(),
            });
        }
    }

    conflicts.sort_by_key(|c| c.to_string());
    conflicts
}

fn spans_documents(occurrences: &[(usize, PathBuf)]) -> bool {
    occurrences.iter().any(|(idx, _)| *idx != occurrences[0].0)
}
