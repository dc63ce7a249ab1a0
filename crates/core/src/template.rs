//! Minimal placeholder substitution for config-authored strings.
//!
//! File targets, script content, and failure messages may embed `{topic}`,
//! `{session_id}`, and `{timestamp}`. Unknown placeholders are left verbatim
//! so a typo produces visible output instead of a load error.

use crate::event::EventContext;

/// Expand the known placeholders from `ctx`.
///
/// `{timestamp}` renders RFC 3339; `{topic}` expands to the empty string
/// when the event carries no topic.
pub fn expand(input: &str, ctx: &EventContext) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        match tail.find('}') {
            Some(end) => {
                match &tail[1..end] {
                    "topic" => out.push_str(ctx.topic.as_deref().unwrap_or("")),
                    "session_id" => out.push_str(&ctx.session_id),
                    "timestamp" => out.push_str(&ctx.timestamp.to_rfc3339()),
                    _ => out.push_str(&tail[..=end]),
                }
                rest = &tail[end + 1..];
            }
            // Unclosed brace: keep the rest as-is.
            None => {
                out.push_str(tail);
                return out;
            }
        }
    }
    out.push_str(rest);
    out
}
