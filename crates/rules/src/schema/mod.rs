//! Gate rule document schema with two-pass deserialization.
//!
//! First pass: permissive [`RawDocument`] accepts loosely typed YAML.
//! Second pass: [`crate::validation`] converts into the typed document,
//! reporting every structural violation with its field path.

mod criteria;
mod document;
mod failure;
mod raw;
mod rule;

pub use criteria::*;
pub use document::*;
pub use failure::*;
pub use raw::*;
pub use rule::*;
