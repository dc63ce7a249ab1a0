//! Applicability matching: decides whether one rule fires for one event.

use regex::Regex;
use tracing::warn;

use tollgate_core::EventContext;

use crate::predicate::PredicateRegistry;
use crate::schema::{GateRule, MatchCriteria};

/// True when `rule` should dispatch for `ctx`.
pub fn should_fire(rule: &GateRule, ctx: &EventContext, predicates: &PredicateRegistry) -> bool {
    if !rule.enabled {
        return false;
    }
    if !rule.points.contains(&ctx.point) {
        return false;
    }
    match &rule.criteria {
        None => true,
        Some(criteria) => matches_criteria(criteria, ctx, predicates),
    }
}

/// AND over every present criteria field.
pub fn matches_criteria(
    criteria: &MatchCriteria,
    ctx: &EventContext,
    predicates: &PredicateRegistry,
) -> bool {
    if let Some(tool) = &criteria.tool {
        if ctx.tool_name.as_deref() != Some(tool.as_str()) {
            return false;
        }
    }

    if let Some(pattern) = &criteria.command {
        if !regex_test(pattern, ctx.command_subject(), "command") {
            return false;
        }
    }

    if let Some(topic) = &criteria.topic {
        let matched = match (&ctx.topic, topic.as_str()) {
            (Some(_), "*") => true,
            (Some(have), want) => have == want,
            (None, _) => false,
        };
        if !matched {
            return false;
        }
    }

    if let Some(subagent) = criteria.subagent {
        if ctx.is_subagent() != subagent {
            return false;
        }
    }

    if let Some(pattern) = &criteria.session {
        if !regex_test(pattern, &ctx.session_id, "session") {
            return false;
        }
    }

    if let Some(name) = &criteria.predicate {
        // Fail-open: a broken or unregistered predicate must not silently
        // disable the rule it guards. Action loading takes the opposite,
        // fail-closed stance.
        match predicates.get(name) {
            Some(predicate) => match predicate.test(ctx) {
                Ok(false) => return false,
                Ok(true) => {}
                Err(e) => {
                    warn!(predicate = %name, error = %e, "predicate failed, treating as match");
                }
            },
            None => {
                warn!(predicate = %name, "predicate not registered, treating as match");
            }
        }
    }

    true
}

/// Patterns compile lazily at match time; an unparsable pattern is a
/// non-match, never a load error.
fn regex_test(pattern: &str, subject: &str, field: &'static str) -> bool {
    match Regex::new(pattern) {
        Ok(re) => re.is_match(subject),
        Err(e) => {
            warn!(field, pattern, error = %e, "invalid criteria regex, treating as non-match");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tollgate_core::EventPoint;

    fn rule_at(point: EventPoint, criteria: Option<MatchCriteria>) -> GateRule {
        GateRule {
            name: None,
            points: vec![point],
            criteria,
            action: "block".to_string(),
            params: Default::default(),
            on_failure: None,
            enabled: true,
            source: None,
        }
    }

    fn registry() -> PredicateRegistry {
        PredicateRegistry::new()
    }

    #[test]
    fn disabled_rule_never_fires() {
        let mut rule = rule_at(EventPoint::ToolPre, None);
        rule.enabled = false;
        let ctx = EventContext::new(EventPoint::ToolPre, "s1");
        assert!(!should_fire(&rule, &ctx, &registry()));
    }

    #[test]
    fn point_mismatch_never_fires() {
        let rule = rule_at(EventPoint::ToolPre, None);
        let ctx = EventContext::new(EventPoint::Stop, "s1");
        assert!(!should_fire(&rule, &ctx, &registry()));
    }

    #[test]
    fn absent_criteria_always_fires() {
        let rule = rule_at(EventPoint::ToolPre, None);
        let ctx = EventContext::new(EventPoint::ToolPre, "s1");
        assert!(should_fire(&rule, &ctx, &registry()));
    }

    #[test]
    fn tool_requires_exact_match() {
        let criteria = MatchCriteria {
            tool: Some("exec".to_string()),
            ..Default::default()
        };
        let rule = rule_at(EventPoint::ToolPre, Some(criteria));

        let hit = EventContext::new(EventPoint::ToolPre, "s1").with_tool("exec", json!({}));
        assert!(should_fire(&rule, &hit, &registry()));

        let miss = EventContext::new(EventPoint::ToolPre, "s1").with_tool("edit", json!({}));
        assert!(!should_fire(&rule, &miss, &registry()));

        let no_tool = EventContext::new(EventPoint::ToolPre, "s1");
        assert!(!should_fire(&rule, &no_tool, &registry()));
    }

    #[test]
    fn command_regex_uses_subject_priority() {
        let criteria = MatchCriteria {
            command: Some(r"^rm\s".to_string()),
            ..Default::default()
        };
        let rule = rule_at(EventPoint::ToolPre, Some(criteria));

        let hit = EventContext::new(EventPoint::ToolPre, "s1")
            .with_tool("exec", json!({"command": "rm -rf /tmp/scratch"}));
        assert!(should_fire(&rule, &hit, &registry()));

        // No command key: falls through to file_path, which does not match.
        let miss = EventContext::new(EventPoint::ToolPre, "s1")
            .with_tool("edit", json!({"file_path": "/src/main.rs"}));
        assert!(!should_fire(&rule, &miss, &registry()));
    }

    #[test]
    fn invalid_regex_fails_closed() {
        let criteria = MatchCriteria {
            command: Some("[unclosed".to_string()),
            ..Default::default()
        };
        let rule = rule_at(EventPoint::ToolPre, Some(criteria));
        let ctx = EventContext::new(EventPoint::ToolPre, "s1")
            .with_tool("exec", json!({"command": "[unclosed"}));
        assert!(!should_fire(&rule, &ctx, &registry()));
    }

    #[test]
    fn topic_wildcard_requires_some_topic() {
        let criteria = MatchCriteria {
            topic: Some("*".to_string()),
            ..Default::default()
        };
        let rule = rule_at(EventPoint::Stop, Some(criteria));

        let with_topic = EventContext::new(EventPoint::Stop, "s1").with_topic("release");
        assert!(should_fire(&rule, &with_topic, &registry()));

        let without = EventContext::new(EventPoint::Stop, "s1");
        assert!(!should_fire(&rule, &without, &registry()));
    }

    #[test]
    fn topic_exact_comparison() {
        let criteria = MatchCriteria {
            topic: Some("release".to_string()),
            ..Default::default()
        };
        let rule = rule_at(EventPoint::Stop, Some(criteria));

        let hit = EventContext::new(EventPoint::Stop, "s1").with_topic("release");
        assert!(should_fire(&rule, &hit, &registry()));

        let miss = EventContext::new(EventPoint::Stop, "s1").with_topic("hotfix");
        assert!(!should_fire(&rule, &miss, &registry()));
    }

    #[test]
    fn subagent_flag_both_polarities() {
        let want_sub = MatchCriteria {
            subagent: Some(true),
            ..Default::default()
        };
        let rule = rule_at(EventPoint::SubagentStop, Some(want_sub));

        let sub = EventContext::new(EventPoint::SubagentStop, "s1:subagent:researcher");
        assert!(should_fire(&rule, &sub, &registry()));

        let primary = EventContext::new(EventPoint::SubagentStop, "tg:12345");
        assert!(!should_fire(&rule, &primary, &registry()));

        let want_primary = MatchCriteria {
            subagent: Some(false),
            ..Default::default()
        };
        let rule = rule_at(EventPoint::SubagentStop, Some(want_primary));
        assert!(should_fire(&rule, &primary, &registry()));
        assert!(!should_fire(&rule, &sub, &registry()));
    }

    #[test]
    fn session_regex_on_full_id() {
        let criteria = MatchCriteria {
            session: Some(r"^tg:group:".to_string()),
            ..Default::default()
        };
        let rule = rule_at(EventPoint::Stop, Some(criteria));

        let hit = EventContext::new(EventPoint::Stop, "tg:group:-555:topic:7");
        assert!(should_fire(&rule, &hit, &registry()));

        let miss = EventContext::new(EventPoint::Stop, "tg:12345");
        assert!(!should_fire(&rule, &miss, &registry()));
    }

    fn topic_set(ctx: &EventContext) -> Result<bool, String> {
        Ok(ctx.topic.is_some())
    }

    fn broken(_: &EventContext) -> Result<bool, String> {
        Err("backing store unavailable".to_string())
    }

    #[test]
    fn predicate_gating() {
        let mut predicates = PredicateRegistry::new();
        predicates.register("topic-set", topic_set);

        let criteria = MatchCriteria {
            predicate: Some("topic-set".to_string()),
            ..Default::default()
        };
        let rule = rule_at(EventPoint::Stop, Some(criteria));

        let hit = EventContext::new(EventPoint::Stop, "s1").with_topic("x");
        assert!(should_fire(&rule, &hit, &predicates));

        let miss = EventContext::new(EventPoint::Stop, "s1");
        assert!(!should_fire(&rule, &miss, &predicates));
    }

    #[test]
    fn unregistered_predicate_fails_open() {
        let criteria = MatchCriteria {
            predicate: Some("never-registered".to_string()),
            ..Default::default()
        };
        let rule = rule_at(EventPoint::Stop, Some(criteria));
        let ctx = EventContext::new(EventPoint::Stop, "s1");
        assert!(should_fire(&rule, &ctx, &registry()));
    }

    #[test]
    fn erroring_predicate_fails_open() {
        let mut predicates = PredicateRegistry::new();
        predicates.register("broken", broken);

        let criteria = MatchCriteria {
            predicate: Some("broken".to_string()),
            ..Default::default()
        };
        let rule = rule_at(EventPoint::Stop, Some(criteria));
        let ctx = EventContext::new(EventPoint::Stop, "s1");
        assert!(should_fire(&rule, &ctx, &predicates));
    }

    #[test]
    fn criteria_are_anded() {
        let criteria = MatchCriteria {
            tool: Some("exec".to_string()),
            command: Some(r"^git\s".to_string()),
            topic: Some("deploys".to_string()),
            subagent: Some(false),
            ..Default::default()
        };
        let rule = rule_at(EventPoint::ToolPre, Some(criteria));
        let matching = || {
            EventContext::new(EventPoint::ToolPre, "s1")
                .with_tool("exec", json!({"command": "git push origin main"}))
                .with_topic("deploys")
        };
        assert!(should_fire(&rule, &matching(), &registry()));

        // Flipping any single field to non-matching flips the overall result.
        let wrong_tool = EventContext::new(EventPoint::ToolPre, "s1")
            .with_tool("edit", json!({"command": "git push origin main"}))
            .with_topic("deploys");
        assert!(!should_fire(&rule, &wrong_tool, &registry()));

        let wrong_command = EventContext::new(EventPoint::ToolPre, "s1")
            .with_tool("exec", json!({"command": "ls -la"}))
            .with_topic("deploys");
        assert!(!should_fire(&rule, &wrong_command, &registry()));

        let wrong_topic = EventContext::new(EventPoint::ToolPre, "s1")
            .with_tool("exec", json!({"command": "git push origin main"}))
            .with_topic("reviews");
        assert!(!should_fire(&rule, &wrong_topic, &registry()));

        let subagent_ctx = EventContext::new(EventPoint::ToolPre, "s1:subagent:7")
            .with_tool("exec", json!({"command": "git push origin main"}))
            .with_topic("deploys");
        assert!(!should_fire(&rule, &subagent_ctx, &registry()));
    }
}
