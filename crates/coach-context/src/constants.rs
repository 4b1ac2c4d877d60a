//! Context assembly constants.

// =============================================================================
// Token Estimation
// =============================================================================

/// Approximate characters per token.
pub const CHARS_PER_TOKEN: usize = 4;

// =============================================================================
// Budget
// =============================================================================

/// Output tokens always held back from the prompt, even if the provider asks for less.
pub const MIN_RESERVED_OUTPUT_TOKENS: u32 = 1024;

/// Floor of the prompt budget, applied even when the window minus the reserve is smaller.
pub const MIN_PROMPT_BUDGET_TOKENS: u32 = 2048;

// =============================================================================
// Section IDs
// =============================================================================

/// Session header section.
pub const SESSION_META_ID: &str = "session-meta";

/// Active misalignments section.
pub const MISALIGNMENTS_ID: &str = "misalignments";

/// Trailing session events section.
pub const RECENT_EVENTS_ID: &str = "recent-events";

/// Events referenced by `#N` in the prompt.
pub const RESOLVED_EVENTS_ID: &str = "resolved-events";

/// Coaching chat history section.
pub const CHAT_HISTORY_ID: &str = "chat-history";

/// Agent rules section.
pub const AGENT_RULES_ID: &str = "agent-rules";

// =============================================================================
// Eviction Priority
// =============================================================================

/// Priority of sections not listed in [`section_priority`]; evicted first.
pub const DEFAULT_SECTION_PRIORITY: u8 = 10;

/// Eviction priority of a section ID. Higher numbers are evicted first.
pub fn section_priority(id: &str) -> u8 {
    match id {
        SESSION_META_ID => 1,
        MISALIGNMENTS_ID => 2,
        RECENT_EVENTS_ID | RESOLVED_EVENTS_ID => 3,
        CHAT_HISTORY_ID => 4,
        AGENT_RULES_ID => 5,
        _ => DEFAULT_SECTION_PRIORITY,
    }
}
