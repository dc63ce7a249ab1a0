//! Engine core: document snapshots, the execute loop, (re)loading.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use thiserror::Error;
use tracing::{debug, info, warn};

use tollgate_actions::ActionRegistry;
use tollgate_core::{ActionResult, EventContext, EventPoint};
use tollgate_notify::{NotificationRouter, SessionTracker};
use tollgate_rules::discovery::{self, Conflict};
use tollgate_rules::evaluator;
use tollgate_rules::{ConfigError, FailureMode, GateDocument, GateRule, PredicateRegistry};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("nothing to reload: no config has been loaded from a path yet")]
    NoConfigSource,
}

/// What a discovery-backed load found and installed.
#[derive(Debug)]
pub struct DiscoveryReport {
    /// Documents that contributed rules, primary first.
    pub documents: Vec<PathBuf>,
    /// Advisory authoring conflicts; never block the load.
    pub conflicts: Vec<Conflict>,
    pub total_rules: usize,
}

/// Intercepts lifecycle events and runs the configured rules against them.
///
/// One engine serves the whole process. `execute` takes an `Arc` snapshot of
/// the rule document at entry, so concurrent calls are safe and a reload
/// never tears a call in half; an in-flight call finishes on whichever
/// document it started with.
pub struct GateEngine {
    document: RwLock<Arc<GateDocument>>,
    config_path: RwLock<Option<PathBuf>>,
    registry: Arc<ActionRegistry>,
    router: Arc<NotificationRouter>,
    tracker: Arc<SessionTracker>,
    predicates: PredicateRegistry,
}

impl GateEngine {
    pub fn new(
        document: GateDocument,
        registry: Arc<ActionRegistry>,
        router: Arc<NotificationRouter>,
        tracker: Arc<SessionTracker>,
    ) -> Self {
        Self {
            document: RwLock::new(Arc::new(document)),
            config_path: RwLock::new(None),
            registry,
            router,
            tracker,
            predicates: PredicateRegistry::new(),
        }
    }

    /// Engine with no rules; every `execute` is a no-op until a load.
    pub fn empty(
        registry: Arc<ActionRegistry>,
        router: Arc<NotificationRouter>,
        tracker: Arc<SessionTracker>,
    ) -> Self {
        Self::new(GateDocument::empty(), registry, router, tracker)
    }

    /// Install match predicates. Call before the engine is shared; the
    /// registry is fixed afterwards.
    pub fn with_predicates(mut self, predicates: PredicateRegistry) -> Self {
        self.predicates = predicates;
        self
    }

    /// Current rule document snapshot.
    pub fn document(&self) -> Arc<GateDocument> {
        self.document.read().expect("document lock poisoned").clone()
    }

    /// Load and install a rule document, remembering `path` for reloads.
    pub fn load_config(&self, path: impl AsRef<Path>) -> Result<Arc<GateDocument>, EngineError> {
        let path = path.as_ref();
        let document = Arc::new(tollgate_rules::load_document(path)?);
        info!(
            path = %path.display(),
            rules = document.rules.len(),
            "rule document loaded"
        );
        *self.document.write().expect("document lock poisoned") = document.clone();
        *self.config_path.write().expect("config path lock poisoned") = Some(path.to_path_buf());
        Ok(document)
    }

    /// Re-read the last loaded path and swap the document in. In-flight
    /// `execute` calls keep whichever snapshot they started with.
    pub fn reload_config(&self) -> Result<Arc<GateDocument>, EngineError> {
        let path = self
            .config_path
            .read()
            .expect("config path lock poisoned")
            .clone()
            .ok_or(EngineError::NoConfigSource)?;
        self.load_config(path)
    }

    /// Load `primary`, scan `root` for additional rule documents, merge
    /// everything (primary wins on version and defaults) and install it.
    ///
    /// The primary must load; a discovered document that fails to load is
    /// skipped with a warning so one broken optional file cannot take the
    /// whole configuration down.
    pub fn load_with_discovery(
        &self,
        primary: impl AsRef<Path>,
        root: impl AsRef<Path>,
    ) -> Result<DiscoveryReport, EngineError> {
        let primary_path = primary.as_ref();
        let primary_doc = tollgate_rules::load_document(primary_path)?;

        let mut documents = vec![primary_path.to_path_buf()];
        let mut secondaries = Vec::new();
        for found in discovery::scan(
            root.as_ref(),
            discovery::DEFAULT_MAX_DEPTH,
            &discovery::DEFAULT_IGNORE_DIRS,
        ) {
            if is_same_file(&found, primary_path) {
                continue;
            }
            match tollgate_rules::load_document(&found) {
                Ok(doc) => {
                    documents.push(found);
                    secondaries.push(doc);
                }
                Err(e) => {
                    warn!(path = %found.display(), error = %e, "skipping broken discovered document");
                }
            }
        }

        let mut all = Vec::with_capacity(1 + secondaries.len());
        all.push(primary_doc.clone());
        all.extend(secondaries.iter().cloned());
        let conflicts = discovery::detect_conflicts(&all);
        for conflict in &conflicts {
            warn!(%conflict, "rule conflict across documents");
        }

        let merged = discovery::merge(primary_doc, secondaries);
        let total_rules = merged.rules.len();
        info!(
            documents = documents.len(),
            rules = total_rules,
            conflicts = conflicts.len(),
            "discovery load complete"
        );
        *self.document.write().expect("document lock poisoned") = Arc::new(merged);
        *self.config_path.write().expect("config path lock poisoned") =
            Some(primary_path.to_path_buf());

        Ok(DiscoveryReport {
            documents,
            conflicts,
            total_rules,
        })
    }

    /// Enabled rules whose point set contains `point`, in document order.
    /// Criteria are not consulted; this is the cheap pre-filter hosts use to
    /// decide whether an event is worth constructing context for.
    pub fn rules_for_point(&self, point: EventPoint) -> Vec<GateRule> {
        self.document()
            .rules_for_point(point)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Run every matching rule for one event, in document order.
    ///
    /// Results accumulate one per dispatched rule. The first final
    /// `passed = false` result short-circuits: later rules never dispatch,
    /// so a blocked pipeline does not keep auditing itself.
    pub async fn execute(&self, point: EventPoint, ctx: &EventContext) -> Vec<ActionResult> {
        let document = self.document();
        self.tracker.record(ctx);

        let mut results = Vec::new();
        for rule in &document.rules {
            if !rule.enabled || !rule.points.contains(&point) {
                continue;
            }
            if let Some(criteria) = &rule.criteria {
                if !evaluator::matches_criteria(criteria, ctx, &self.predicates) {
                    continue;
                }
            }

            debug!(rule = rule.label(), action = %rule.action, %point, "dispatching");
            let defaults = document.defaults.as_ref();
            let result = match self.registry.dispatch(rule, ctx, defaults).await {
                Ok(result) if result.passed => result,
                Ok(result) => {
                    // A passed=false result is rerouted through failure
                    // resolution only when the rule's own policy (never the
                    // document defaults) names a non-block mode. Inside the
                    // resolution the no-policy default is continue instead of
                    // block; the mismatched defaults are long-standing
                    // observed behavior that existing configs rely on.
                    let mode = rule
                        .on_failure
                        .as_ref()
                        .map(|p| p.mode)
                        .unwrap_or(FailureMode::Block);
                    if mode == FailureMode::Block {
                        if rule.on_failure.as_ref().is_some_and(|p| p.notify) {
                            self.send_failure_notice(rule, ctx, defaults, &result.message);
                        }
                        result
                    } else {
                        self.resolve_failure(rule, ctx, defaults, &result.message)
                            .await
                    }
                }
                Err(e) => {
                    warn!(rule = rule.label(), error = %e, "action dispatch failed");
                    self.resolve_failure(rule, ctx, defaults, &e.to_string())
                        .await
                }
            };

            let blocked = !result.passed;
            results.push(result);
            if blocked {
                debug!(rule = rule.label(), "blocked, short-circuiting");
                break;
            }
        }
        results
    }

    pub(crate) fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    pub(crate) fn router(&self) -> &NotificationRouter {
        &self.router
    }
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
