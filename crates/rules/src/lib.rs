//! Declarative gate rule documents: schema, loading, matching, discovery.
//!
//! This crate provides:
//! - YAML rule documents with two-pass serde deserialization
//! - Structural validation with field-path errors and suggestions
//! - The match evaluator (AND criteria, fail-open predicates)
//! - Directory discovery with primary-wins merge and conflict advisories

pub mod discovery;
pub mod evaluator;
pub mod loader;
pub mod predicate;
pub mod schema;
pub mod validation;

pub use loader::{load_document, parse_document, ConfigError};
pub use predicate::{GatePredicate, PredicateRegistry};
pub use schema::*;
pub use validation::{ValidationError, ValidationResult, ValidationWarning};
