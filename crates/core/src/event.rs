//! Event points and the per-event context handed to the gate engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Marker substring embedded in sub-agent session identifiers.
pub const SUBAGENT_MARKER: &str = ":subagent:";

/// Lifecycle points at which the host pipeline consults the gate engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventPoint {
    SessionStart,
    UserPrompt,
    ToolPre,
    ToolPost,
    Stop,
    SubagentStop,
    Compact,
}

impl EventPoint {
    /// Every point, in pipeline order.
    pub const ALL: [EventPoint; 7] = [
        EventPoint::SessionStart,
        EventPoint::UserPrompt,
        EventPoint::ToolPre,
        EventPoint::ToolPost,
        EventPoint::Stop,
        EventPoint::SubagentStop,
        EventPoint::Compact,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventPoint::SessionStart => "session-start",
            EventPoint::UserPrompt => "user-prompt",
            EventPoint::ToolPre => "tool-pre",
            EventPoint::ToolPost => "tool-post",
            EventPoint::Stop => "stop",
            EventPoint::SubagentStop => "subagent-stop",
            EventPoint::Compact => "compact",
        }
    }
}

impl fmt::Display for EventPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventPoint {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "session-start" => Ok(EventPoint::SessionStart),
            "user-prompt" => Ok(EventPoint::UserPrompt),
            "tool-pre" => Ok(EventPoint::ToolPre),
            "tool-post" => Ok(EventPoint::ToolPost),
            "stop" => Ok(EventPoint::Stop),
            "subagent-stop" => Ok(EventPoint::SubagentStop),
            "compact" => Ok(EventPoint::Compact),
            other => Err(format!(
                "unknown event point: '{}' (valid: session-start, user-prompt, tool-pre, tool-post, stop, subagent-stop, compact)",
                other
            )),
        }
    }
}

/// One intercepted lifecycle event.
///
/// Constructed fresh per event by the host; the engine treats it as
/// read-only. Actions that want the host to change tool arguments return
/// `modified_args` on their result instead of mutating the context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventContext {
    pub point: EventPoint,
    pub session_id: String,
    #[serde(default)]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub tool_args: Option<Value>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// Free-form extension bag for host-specific fields.
    #[serde(default)]
    pub extra: HashMap<String, Value>,
}

impl EventContext {
    pub fn new(point: EventPoint, session_id: impl Into<String>) -> Self {
        Self {
            point,
            session_id: session_id.into(),
            tool_name: None,
            tool_args: None,
            prompt: None,
            response: None,
            topic: None,
            timestamp: Utc::now(),
            extra: HashMap::new(),
        }
    }

    pub fn with_tool(mut self, name: impl Into<String>, args: Value) -> Self {
        self.tool_name = Some(name.into());
        self.tool_args = Some(args);
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.response = Some(response.into());
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// True when the session identifier carries the sub-agent marker.
    pub fn is_subagent(&self) -> bool {
        self.session_id.contains(SUBAGENT_MARKER)
    }

    /// The string a command-pattern criterion is tested against.
    ///
    /// Picks the most specific textual argument available: an explicit
    /// command, then file-ish targets, then message text, then the prompt.
    pub fn command_subject(&self) -> &str {
        const ARG_KEYS: [&str; 5] = ["command", "file_path", "path", "url", "message"];
        if let Some(args) = self.tool_args.as_ref().and_then(Value::as_object) {
            for key in ARG_KEYS {
                if let Some(s) = args.get(key).and_then(Value::as_str) {
                    return s;
                }
            }
        }
        self.prompt.as_deref().unwrap_or("")
    }
}
