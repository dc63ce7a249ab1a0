//! Named predicates consulted by `match.predicate` criteria.

use std::collections::HashMap;
use std::sync::Arc;

use tollgate_core::EventContext;

/// A host-registered predicate. The evaluator treats a returned `Err` as a
/// match (fail-open), so predicates should reserve errors for genuinely
/// broken state rather than "no".
pub trait GatePredicate: Send + Sync {
    fn test(&self, ctx: &EventContext) -> std::result::Result<bool, String>;
}

impl<F> GatePredicate for F
where
    F: Fn(&EventContext) -> std::result::Result<bool, String> + Send + Sync,
{
    fn test(&self, ctx: &EventContext) -> std::result::Result<bool, String> {
        self(ctx)
    }
}

/// Explicit registration table; the evaluator looks predicates up by name.
pub struct PredicateRegistry {
    entries: HashMap<String, Arc<dyn GatePredicate>>,
}

impl PredicateRegistry {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register under `name`. Last registration wins.
    pub fn register(&mut self, name: impl Into<String>, predicate: impl GatePredicate + 'static) {
        self.entries.insert(name.into(), Arc::new(predicate));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn GatePredicate>> {
        self.entries.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for PredicateRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tollgate_core::EventPoint;

    fn always(_: &EventContext) -> Result<bool, String> {
        Ok(true)
    }

    fn never(_: &EventContext) -> Result<bool, String> {
        Ok(false)
    }

    #[test]
    fn register_and_look_up() {
        let mut registry = PredicateRegistry::new();
        registry.register("always", always);

        assert_eq!(registry.len(), 1);
        assert!(registry.get("always").is_some());
        assert!(registry.get("missing").is_none());

        let ctx = EventContext::new(EventPoint::Stop, "s1");
        assert_eq!(registry.get("always").unwrap().test(&ctx), Ok(true));
    }

    #[test]
    fn last_registration_wins() {
        let mut registry = PredicateRegistry::new();
        registry.register("p", always);
        registry.register("p", never);

        let ctx = EventContext::new(EventPoint::Stop, "s1");
        assert_eq!(registry.get("p").unwrap().test(&ctx), Ok(false));
    }
}
