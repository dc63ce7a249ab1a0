//! Action execution for the gate engine.
//!
//! - [`ActionExecutor`]: the trait every action implements
//! - [`ActionRegistry`]: name-based dispatch with duration stamping
//! - [`builtin`]: the built-in actions (block, log, run-script,
//!   summarize, inject-context, notify)

pub mod action;
pub mod builtin;
pub mod registry;

pub use action::{ActionError, ActionExecutor, ActionLoader, RefusingLoader};
pub use builtin::register_builtins;
pub use registry::{ActionRegistry, RegistryError};
