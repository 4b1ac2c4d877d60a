//! Context assembly limits.

use serde::{Deserialize, Serialize};

/// How much of each source the context builders include.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContextSettings {
    /// Trailing session events in `recent-events`.
    pub event_limit: usize,
    /// Trailing chat messages in `chat-history`.
    pub history_limit: usize,
    /// Leading rules in `agent-rules`.
    pub rules_limit: usize,
    /// Character cap for message/reasoning text in one event line.
    pub event_line_max_chars: usize,
    /// Maximum `#N` timeline references resolved per prompt.
    pub resolved_events_limit: usize,
    /// Character cap for each detail block of a resolved event.
    pub resolved_snippet_max_chars: usize,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            event_limit: 25,
            history_limit: 20,
            rules_limit: 15,
            event_line_max_chars: 320,
            resolved_events_limit: 8,
            resolved_snippet_max_chars: 1200,
        }
    }
}
