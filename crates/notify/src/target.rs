//! Delivery targets embedded in session identifiers.
//!
//! The host encodes where a session's operator lives directly in the session
//! id, e.g. `tg:group:-100555:topic:7`. Parsing tries the most specific
//! shape first; anything that fits none of them is simply not deliverable.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

/// A parsed delivery destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryTarget {
    /// Group chat, optionally scoped to a topic thread.
    Group {
        chat_id: i64,
        thread_id: Option<i64>,
    },
    /// Direct chat with one user.
    Direct { user_id: i64 },
}

fn group_topic_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*:group:(-?\d+):topic:(\d+)$")
            .expect("group-topic target pattern is valid")
    })
}

fn group_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*:group:(-?\d+)$")
            .expect("group target pattern is valid")
    })
}

fn direct_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*:(\d+)$").expect("direct target pattern is valid")
    })
}

impl DeliveryTarget {
    /// Parse a session identifier into a target, most specific shape first:
    /// `prefix:group:<id>:topic:<n>`, then `prefix:group:<id>`, then
    /// `prefix:<id>`. Group ids may be negative. Returns None for anything
    /// else.
    pub fn parse(session_id: &str) -> Option<Self> {
        if let Some(caps) = group_topic_re().captures(session_id) {
            return Some(DeliveryTarget::Group {
                chat_id: caps[1].parse().ok()?,
                thread_id: Some(caps[2].parse().ok()?),
            });
        }
        if let Some(caps) = group_re().captures(session_id) {
            return Some(DeliveryTarget::Group {
                chat_id: caps[1].parse().ok()?,
                thread_id: None,
            });
        }
        if let Some(caps) = direct_re().captures(session_id) {
            return Some(DeliveryTarget::Direct {
                user_id: caps[1].parse().ok()?,
            });
        }
        None
    }
}

impl fmt::Display for DeliveryTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryTarget::Group {
                chat_id,
                thread_id: Some(thread),
            } => write!(f, "group {} topic {}", chat_id, thread),
            DeliveryTarget::Group {
                chat_id,
                thread_id: None,
            } => write!(f, "group {}", chat_id),
            DeliveryTarget::Direct { user_id } => write!(f, "user {}", user_id),
        }
    }
}
