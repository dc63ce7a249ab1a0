//! The gate engine: runs rule documents against lifecycle events.
//!
//! - [`GateEngine`]: snapshot the rule set, match, dispatch, short-circuit
//! - [`failure`]: failure-policy resolution (block / retry / notify /
//!   continue) with exponential retry backoff
//! - Discovery-backed loading that merges additional rule documents and
//!   reports authoring conflicts

pub mod engine;
pub mod failure;

pub use engine::{DiscoveryReport, EngineError, GateEngine};
