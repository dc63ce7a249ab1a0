//! End-to-end engine tests: YAML documents in, lifecycle events through
//! `execute`, results and side effects out.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::json;

use tollgate_actions::{register_builtins, ActionError, ActionExecutor, ActionRegistry};
use tollgate_core::{ActionResult, EventContext, EventPoint};
use tollgate_engine::{EngineError, GateEngine};
use tollgate_notify::{
    DeliveryChannel, DeliveryTarget, MemoryStateStore, NotificationRouter, NotifyError,
    SessionTracker,
};
use tollgate_rules::{parse_document, Defaults, GateRule};

// ── fixtures ────────────────────────────────────────────────

#[derive(Default)]
struct MockChannel {
    calls: AtomicUsize,
    delivered: Mutex<Vec<(DeliveryTarget, String)>>,
}

#[async_trait]
impl DeliveryChannel for MockChannel {
    async fn deliver(&self, target: &DeliveryTarget, text: &str) -> Result<(), NotifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.delivered
            .lock()
            .unwrap()
            .push((target.clone(), text.to_string()));
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "mock"
    }
}

/// Errors until `succeed_on` total dispatches have happened, then passes.
struct FlakyAction {
    calls: AtomicUsize,
    succeed_on: usize,
}

#[async_trait]
impl ActionExecutor for FlakyAction {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn run(
        &self,
        _rule: &GateRule,
        _ctx: &EventContext,
        _defaults: Option<&Defaults>,
    ) -> Result<ActionResult, ActionError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call >= self.succeed_on {
            Ok(ActionResult::pass("flaky", "recovered"))
        } else {
            Err(ActionError::ExecutionFailed(format!("attempt {call} failed")))
        }
    }
}

fn engine_with(
    yaml: &str,
    configure: impl FnOnce(&mut ActionRegistry),
) -> (GateEngine, Arc<MockChannel>) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let channel = Arc::new(MockChannel::default());
    let tracker = Arc::new(SessionTracker::new(MemoryStateStore::new()));
    let router = Arc::new(NotificationRouter::new(Some(channel.clone()), tracker.clone()));

    let mut registry = ActionRegistry::new();
    register_builtins(&mut registry, router.clone(), None).unwrap();
    configure(&mut registry);

    let document = parse_document(yaml).unwrap();
    let engine = GateEngine::new(document, Arc::new(registry), router, tracker);
    (engine, channel)
}

fn engine_for(yaml: &str) -> (GateEngine, Arc<MockChannel>) {
    engine_with(yaml, |_| {})
}

async fn wait_for_delivery(channel: &MockChannel) {
    for _ in 0..100 {
        if channel.calls.load(Ordering::SeqCst) > 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("notification was never delivered");
}

// ── matching and blocking ───────────────────────────────────

#[tokio::test]
async fn matching_rule_blocks_with_custom_message() {
    let (engine, _) = engine_for(
        r#"
version: "1"
rules:
  - name: guard-rm
    point: tool-pre
    match:
      tool: exec
      command: "^rm\\s"
    action: block
    onFailure:
      mode: block
      message: nope
"#,
    );

    let ctx = EventContext::new(EventPoint::ToolPre, "s-1")
        .with_tool("exec", json!({ "command": "rm -rf /" }));
    let results = engine.execute(EventPoint::ToolPre, &ctx).await;

    assert_eq!(results.len(), 1);
    assert!(!results[0].passed);
    assert_eq!(results[0].action, "block");
    assert_eq!(results[0].message, "nope");
}

#[tokio::test]
async fn non_matching_command_yields_no_results() {
    let (engine, _) = engine_for(
        r#"
version: "1"
rules:
  - name: guard-rm
    point: tool-pre
    match:
      tool: exec
      command: "^rm\\s"
    action: block
    onFailure:
      mode: block
      message: nope
"#,
    );

    let ctx = EventContext::new(EventPoint::ToolPre, "s-1")
        .with_tool("exec", json!({ "command": "ls /tmp" }));
    let results = engine.execute(EventPoint::ToolPre, &ctx).await;
    assert!(results.is_empty());
}

#[tokio::test]
async fn disabled_rule_never_fires() {
    let (engine, _) = engine_for(
        r#"
version: "1"
rules:
  - point: tool-pre
    action: block
    enabled: false
"#,
    );

    let ctx = EventContext::new(EventPoint::ToolPre, "s-1");
    assert!(engine.execute(EventPoint::ToolPre, &ctx).await.is_empty());
    assert!(engine.rules_for_point(EventPoint::ToolPre).is_empty());
}

#[tokio::test]
async fn criterialess_rule_fires_only_at_its_points() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("events.jsonl");
    let yaml = format!(
        r#"
version: "1"
rules:
  - points: [tool-post, stop]
    action: log
    params:
      file: {}
"#,
        log.display()
    );
    let (engine, _) = engine_for(&yaml);

    let stop = EventContext::new(EventPoint::Stop, "s-1");
    assert_eq!(engine.execute(EventPoint::Stop, &stop).await.len(), 1);

    let prompt = EventContext::new(EventPoint::UserPrompt, "s-1");
    assert!(engine.execute(EventPoint::UserPrompt, &prompt).await.is_empty());
}

#[tokio::test]
async fn short_circuit_skips_later_rules_and_their_side_effects() {
    let dir = tempfile::tempdir().unwrap();
    let before = dir.path().join("before.jsonl");
    let after = dir.path().join("after.jsonl");
    let yaml = format!(
        r#"
version: "1"
rules:
  - name: audit-before
    point: tool-pre
    action: log
    params:
      file: {before}
  - name: wall
    point: tool-pre
    action: block
  - name: audit-after
    point: tool-pre
    action: log
    params:
      file: {after}
"#,
        before = before.display(),
        after = after.display()
    );
    let (engine, _) = engine_for(&yaml);

    let ctx = EventContext::new(EventPoint::ToolPre, "s-1");
    let results = engine.execute(EventPoint::ToolPre, &ctx).await;

    assert_eq!(results.len(), 2);
    assert!(results[0].passed);
    assert!(!results[1].passed);
    assert!(before.exists());
    assert!(!after.exists(), "rule after the block must never dispatch");
}

// ── failure resolution ──────────────────────────────────────

#[tokio::test]
async fn unresolvable_action_retries_with_backoff_then_soft_fails() {
    let (engine, _) = engine_for(
        r#"
version: "1"
rules:
  - point: tool-pre
    action: some.external.module
    onFailure:
      mode: retry
      retries: 2
"#,
    );

    let ctx = EventContext::new(EventPoint::ToolPre, "s-1");
    let started = Instant::now();
    let results = engine.execute(EventPoint::ToolPre, &ctx).await;

    // Backoff sleeps 100ms then 200ms before the two attempts.
    assert!(started.elapsed() >= Duration::from_millis(300));
    assert_eq!(results.len(), 1);
    assert!(results[0].passed);
    assert!(results[0].message.contains("after 2 retries"));
}

#[tokio::test]
async fn retry_annotates_the_succeeding_attempt() {
    let (engine, _) = engine_with(
        r#"
version: "1"
rules:
  - point: tool-pre
    action: flaky
    onFailure:
      mode: retry
      retries: 3
"#,
        |registry| {
            registry
                .register(FlakyAction {
                    calls: AtomicUsize::new(0),
                    succeed_on: 3,
                })
                .unwrap();
        },
    );

    let ctx = EventContext::new(EventPoint::ToolPre, "s-1");
    let results = engine.execute(EventPoint::ToolPre, &ctx).await;

    assert_eq!(results.len(), 1);
    assert!(results[0].passed);
    assert!(results[0].message.contains("succeeded on retry 2"));
}

#[tokio::test]
async fn notify_mode_soft_passes_and_tells_the_operator() {
    let (engine, channel) = engine_for(
        r#"
version: "1"
rules:
  - point: tool-pre
    action: missing.module
    onFailure:
      mode: notify
"#,
    );

    let ctx = EventContext::new(EventPoint::ToolPre, "tg:77");
    let results = engine.execute(EventPoint::ToolPre, &ctx).await;

    assert_eq!(results.len(), 1);
    assert!(results[0].passed);
    assert!(results[0].message.contains("(user notified)"));

    wait_for_delivery(&channel).await;
    let delivered = channel.delivered.lock().unwrap();
    assert_eq!(delivered[0].0, DeliveryTarget::Direct { user_id: 77 });
}

#[tokio::test]
async fn dispatch_error_without_any_policy_continues() {
    let (engine, _) = engine_for(
        r#"
version: "1"
rules:
  - point: tool-pre
    action: missing.module
"#,
    );

    let ctx = EventContext::new(EventPoint::ToolPre, "s-1");
    let results = engine.execute(EventPoint::ToolPre, &ctx).await;

    assert_eq!(results.len(), 1);
    assert!(results[0].passed);
    assert!(results[0].message.contains("continuing"));
}

#[tokio::test]
async fn rule_policy_can_soften_a_block() {
    let (engine, _) = engine_for(
        r#"
version: "1"
rules:
  - point: tool-pre
    action: block
    onFailure:
      mode: continue
"#,
    );

    let ctx = EventContext::new(EventPoint::ToolPre, "s-1");
    let results = engine.execute(EventPoint::ToolPre, &ctx).await;

    assert_eq!(results.len(), 1);
    assert!(results[0].passed);
    assert!(results[0].message.contains("continuing"));
}

#[tokio::test]
async fn document_defaults_do_not_reroute_semantic_failures() {
    // The reroute decision consults only the rule's own policy and defaults
    // to block; the document-level onFailure applies to thrown errors, not
    // to a passed=false result.
    let (engine, _) = engine_for(
        r#"
version: "1"
defaults:
  onFailure:
    mode: continue
rules:
  - point: tool-pre
    action: block
"#,
    );

    let ctx = EventContext::new(EventPoint::ToolPre, "s-1");
    let results = engine.execute(EventPoint::ToolPre, &ctx).await;

    assert_eq!(results.len(), 1);
    assert!(!results[0].passed, "the block must stand");
}

#[tokio::test]
async fn document_defaults_apply_to_thrown_errors() {
    let (engine, _) = engine_for(
        r#"
version: "1"
defaults:
  onFailure:
    mode: block
    message: "default wall"
rules:
  - point: tool-pre
    action: missing.module
"#,
    );

    let ctx = EventContext::new(EventPoint::ToolPre, "s-1");
    let results = engine.execute(EventPoint::ToolPre, &ctx).await;

    assert_eq!(results.len(), 1);
    assert!(!results[0].passed);
    assert_eq!(results[0].message, "default wall");
}

#[tokio::test]
async fn notify_flag_reports_blocking_results_best_effort() {
    let (engine, channel) = engine_for(
        r#"
version: "1"
rules:
  - name: wall
    point: tool-pre
    action: block
    onFailure:
      mode: block
      message: stopped
      notify: true
"#,
    );

    let ctx = EventContext::new(EventPoint::ToolPre, "tg:42");
    let results = engine.execute(EventPoint::ToolPre, &ctx).await;

    assert_eq!(results.len(), 1);
    assert!(!results[0].passed);
    assert_eq!(results[0].message, "stopped");

    wait_for_delivery(&channel).await;
    let delivered = channel.delivered.lock().unwrap();
    assert!(delivered[0].1.contains("stopped"));
}

// ── context injection ───────────────────────────────────────

#[tokio::test]
async fn injected_context_flows_out_of_execute() {
    let dir = tempfile::tempdir().unwrap();
    let notes = dir.path().join("notes.txt");
    std::fs::write(&notes, "carry this forward").unwrap();

    let yaml = format!(
        r#"
version: "1"
rules:
  - point: session-start
    action: inject-context
    params:
      file: {}
"#,
        notes.display()
    );
    let (engine, _) = engine_for(&yaml);

    let ctx = EventContext::new(EventPoint::SessionStart, "s-1");
    let results = engine.execute(EventPoint::SessionStart, &ctx).await;

    assert_eq!(results.len(), 1);
    assert!(results[0].passed);
    assert_eq!(
        results[0].injected_context.as_deref(),
        Some("carry this forward")
    );
}

// ── loading, reloading, discovery ───────────────────────────

#[tokio::test]
async fn reload_picks_up_document_changes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tollgate.yml");
    std::fs::write(
        &path,
        "version: \"1\"\nrules:\n  - point: stop\n    action: log\n",
    )
    .unwrap();

    let (engine, _) = engine_for("version: \"1\"\nrules: []\n");
    let doc = engine.load_config(&path).unwrap();
    assert_eq!(doc.rules.len(), 1);

    std::fs::write(
        &path,
        "version: \"2\"\nrules:\n  - point: stop\n    action: log\n  - point: compact\n    action: log\n",
    )
    .unwrap();
    let doc = engine.reload_config().unwrap();
    assert_eq!(doc.version, "2");
    assert_eq!(doc.rules.len(), 2);
    assert_eq!(engine.document().rules.len(), 2);
}

#[tokio::test]
async fn reload_before_any_load_is_an_error() {
    let (engine, _) = engine_for("version: \"1\"\nrules: []\n");
    let err = engine.reload_config().unwrap_err();
    assert!(matches!(err, EngineError::NoConfigSource));
}

#[tokio::test]
async fn invalid_document_load_keeps_the_old_rules() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tollgate.yml");
    std::fs::write(&path, "version: \"1\"\nrules:\n  - point: no-such-point\n    action: log\n")
        .unwrap();

    let (engine, _) = engine_for(
        "version: \"1\"\nrules:\n  - point: stop\n    action: log\n",
    );
    assert!(engine.load_config(&path).is_err());
    assert_eq!(engine.document().rules.len(), 1, "old document must survive");
}

#[tokio::test]
async fn discovery_merges_documents_and_reports_conflicts() {
    let dir = tempfile::tempdir().unwrap();
    let primary = dir.path().join("tollgate.yml");
    std::fs::write(
        &primary,
        r#"
version: "1"
defaults:
  notifyFallback: "tg:1"
rules:
  - name: guard
    point: tool-pre
    action: block
"#,
    )
    .unwrap();

    let sub = dir.path().join("team");
    std::fs::create_dir(&sub).unwrap();
    std::fs::write(
        sub.join("tollgate.yml"),
        r#"
version: "9"
defaults:
  notifyFallback: "tg:2"
rules:
  - name: guard
    point: stop
    action: log
"#,
    )
    .unwrap();

    let (engine, _) = engine_for("version: \"1\"\nrules: []\n");
    let report = engine.load_with_discovery(&primary, dir.path()).unwrap();

    assert_eq!(report.documents.len(), 2);
    assert_eq!(report.total_rules, 2);
    assert_eq!(report.conflicts.len(), 1, "duplicate 'guard' across documents");

    let doc = engine.document();
    assert_eq!(doc.version, "1", "primary version wins");
    assert_eq!(
        doc.defaults.as_ref().unwrap().notify_fallback.as_deref(),
        Some("tg:1"),
        "primary defaults win"
    );
    assert_eq!(doc.rules.len(), 2);
    assert_eq!(doc.rules[0].name.as_deref(), Some("guard"));
}

#[tokio::test]
async fn rules_for_point_ignores_criteria() {
    let (engine, _) = engine_for(
        r#"
version: "1"
rules:
  - point: tool-pre
    match:
      tool: never-used-tool
    action: block
"#,
    );
    assert_eq!(engine.rules_for_point(EventPoint::ToolPre).len(), 1);
    assert!(engine.rules_for_point(EventPoint::Stop).is_empty());
}
