use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tollgate_core::{ActionResult, EventContext};
use tollgate_rules::{Defaults, GateRule};
use tracing::debug;

use crate::action::{ActionError, ActionExecutor, ActionLoader, RefusingLoader};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("action '{0}' is already registered")]
    DuplicateName(String),
}

/// Holds every known action and dispatches rules to them by name.
pub struct ActionRegistry {
    actions: HashMap<String, Arc<dyn ActionExecutor>>,
    loader: Box<dyn ActionLoader>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self {
            actions: HashMap::new(),
            loader: Box::new(RefusingLoader),
        }
    }

    /// Replace the loader consulted for names with no registered action.
    pub fn with_loader(mut self, loader: Box<dyn ActionLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn register(&mut self, action: impl ActionExecutor + 'static) -> Result<(), RegistryError> {
        let name = action.name().to_string();
        if self.actions.contains_key(&name) {
            return Err(RegistryError::DuplicateName(name));
        }
        debug!(action = %name, "registered action");
        self.actions.insert(name, Arc::new(action));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ActionExecutor>> {
        self.actions.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.actions.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Run `rule.action` against `ctx` and stamp wall-clock duration on the
    /// result. Names with no registered action go through the loader, whose
    /// failures propagate.
    pub async fn dispatch(
        &self,
        rule: &GateRule,
        ctx: &EventContext,
        defaults: Option<&Defaults>,
    ) -> Result<ActionResult, ActionError> {
        let executor = self.resolve(&rule.action)?;
        let started = Instant::now();
        let mut result = executor.run(rule, ctx, defaults).await?;
        result.duration = started.elapsed();
        Ok(result)
    }

    fn resolve(&self, name: &str) -> Result<Arc<dyn ActionExecutor>, ActionError> {
        if let Some(action) = self.actions.get(name) {
            return Ok(action.clone());
        }
        self.loader.load(name)
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
