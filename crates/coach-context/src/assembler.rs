//! Context assembler.
//!
//! Builds every section from the request, measures them, evicts under the
//! provider budget and renders the survivors into one prompt. Pure: the same
//! request always yields the same result, and nothing here returns an error.

use coach_core::{AgentRule, ChatMessage, MisalignmentRecord, PromptSection, SessionSnapshot};
use coach_settings::{ContextSettings, ProviderSettings};
use serde::Serialize;
use tracing::debug;

use crate::budget::{MeasuredSection, enforce_budget, prompt_budget};
use crate::sections::{
    agent_rules_section, chat_history_section, misalignments_section, recent_events_section,
    session_meta_section,
};
use crate::timeline::TimelineLimits;

// =============================================================================
// Configuration
// =============================================================================

/// Model window the prompt must fit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// Model identifier.
    pub model: String,
    /// Context window in tokens.
    pub max_context_tokens: u32,
    /// Tokens requested for the answer.
    pub max_output_tokens: u32,
}

impl From<&ProviderSettings> for ProviderConfig {
    fn from(settings: &ProviderSettings) -> Self {
        Self {
            model: settings.model.clone(),
            max_context_tokens: settings.max_context_tokens,
            max_output_tokens: settings.max_output_tokens,
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::from(&ProviderSettings::default())
    }
}

/// Per-section item caps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContextLimits {
    /// Trailing events listed.
    pub event_limit: usize,
    /// Trailing chat messages listed.
    pub history_limit: usize,
    /// Leading rules listed.
    pub rules_limit: usize,
    /// Character cap of one event line.
    pub event_line_max_chars: usize,
    /// Events resolved from `#N` references.
    pub resolved_events_limit: usize,
    /// Character cap of a resolved event detail block.
    pub resolved_snippet_max_chars: usize,
}

impl ContextLimits {
    /// Limits for the timeline resolver.
    pub fn timeline(&self) -> TimelineLimits {
        TimelineLimits {
            max_events: self.resolved_events_limit,
            snippet_max_chars: self.resolved_snippet_max_chars,
        }
    }
}

impl From<&ContextSettings> for ContextLimits {
    fn from(settings: &ContextSettings) -> Self {
        Self {
            event_limit: settings.event_limit,
            history_limit: settings.history_limit,
            rules_limit: settings.rules_limit,
            event_line_max_chars: settings.event_line_max_chars,
            resolved_events_limit: settings.resolved_events_limit,
            resolved_snippet_max_chars: settings.resolved_snippet_max_chars,
        }
    }
}

impl Default for ContextLimits {
    fn default() -> Self {
        Self::from(&ContextSettings::default())
    }
}

// =============================================================================
// Request / Result
// =============================================================================

/// Everything one assembly needs.
#[derive(Clone, Debug)]
pub struct ContextRequest<'a> {
    /// Session ID, metadata and events.
    pub snapshot: &'a SessionSnapshot,
    /// Known misalignments; dismissed ones are skipped.
    pub misalignments: &'a [MisalignmentRecord],
    /// Coaching chat history, oldest first.
    pub history: &'a [ChatMessage],
    /// Rules in extraction order.
    pub rules: &'a [AgentRule],
    /// Provider window.
    pub provider: ProviderConfig,
    /// Overrides [`ContextLimits::event_limit`].
    pub max_events: Option<usize>,
    /// Caller sections appended after the built-in ones.
    pub extra_sections: Vec<PromptSection>,
    /// Item caps.
    pub limits: ContextLimits,
}

impl<'a> ContextRequest<'a> {
    /// Request over a snapshot with no records, history or rules.
    pub fn new(snapshot: &'a SessionSnapshot) -> Self {
        Self {
            snapshot,
            misalignments: &[],
            history: &[],
            rules: &[],
            provider: ProviderConfig::default(),
            max_events: None,
            extra_sections: Vec::new(),
            limits: ContextLimits::default(),
        }
    }

    /// Set the misalignment records.
    #[must_use]
    pub fn with_misalignments(mut self, misalignments: &'a [MisalignmentRecord]) -> Self {
        self.misalignments = misalignments;
        self
    }

    /// Set the chat history.
    #[must_use]
    pub fn with_history(mut self, history: &'a [ChatMessage]) -> Self {
        self.history = history;
        self
    }

    /// Set the rules.
    #[must_use]
    pub fn with_rules(mut self, rules: &'a [AgentRule]) -> Self {
        self.rules = rules;
        self
    }

    /// Set the provider window.
    #[must_use]
    pub fn with_provider(mut self, provider: ProviderConfig) -> Self {
        self.provider = provider;
        self
    }

    /// Append an extra section. Blank sections are dropped at assembly.
    #[must_use]
    pub fn with_section(mut self, section: PromptSection) -> Self {
        self.extra_sections.push(section);
        self
    }
}

/// Assembled prompt plus bookkeeping.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextAssemblyResult {
    /// Rendered prompt; may be empty.
    pub prompt: String,
    /// Sections that made it into the prompt, in order.
    pub sections: Vec<PromptSection>,
    /// Estimated tokens of `sections`.
    pub used_tokens: usize,
    /// Evicted section IDs in eviction order.
    pub trimmed_section_ids: Vec<String>,
}

// =============================================================================
// Assembly
// =============================================================================

/// Build, budget and render the coaching context.
pub fn assemble_context(request: &ContextRequest<'_>) -> ContextAssemblyResult {
    let limits = &request.limits;
    let event_limit = request.max_events.unwrap_or(limits.event_limit);

    let sections: Vec<MeasuredSection> = [
        session_meta_section(request.snapshot),
        misalignments_section(request.misalignments),
        recent_events_section(
            &request.snapshot.events,
            event_limit,
            limits.event_line_max_chars,
        ),
        chat_history_section(request.history, limits.history_limit),
        agent_rules_section(request.rules, limits.rules_limit),
    ]
    .into_iter()
    .flatten()
    .chain(
        request
            .extra_sections
            .iter()
            .filter(|s| !s.content.trim().is_empty())
            .cloned(),
    )
    .map(MeasuredSection::new)
    .collect();

    let limit = prompt_budget(
        request.provider.max_context_tokens,
        request.provider.max_output_tokens,
    );
    let outcome = enforce_budget(sections, limit);
    debug!(
        session_id = %request.snapshot.session_id,
        model = %request.provider.model,
        used_tokens = outcome.used_tokens,
        limit,
        trimmed = ?outcome.trimmed_section_ids,
        "context assembled"
    );

    ContextAssemblyResult {
        prompt: build_prompt(&outcome.sections),
        sections: outcome.sections,
        used_tokens: outcome.used_tokens,
        trimmed_section_ids: outcome.trimmed_section_ids,
    }
}

/// Render sections as `# heading` blocks joined by newlines.
pub fn build_prompt(sections: &[PromptSection]) -> String {
    sections
        .iter()
        .map(PromptSection::render)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_owned()
}

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use coach_core::logging::capture_logs;
    use coach_core::{ChatRole, SessionEvent, SessionMeta};
    use tracing::Level;

    fn snapshot() -> SessionSnapshot {
        let mut snapshot = SessionSnapshot::new(
            "sess-1",
            vec![
                SessionEvent::message("user", "add a migration"),
                SessionEvent::shell("cargo test"),
            ],
        );
        snapshot.meta = Some(SessionMeta {
            timestamp: Some("2024-05-01T10:00:00Z".into()),
            git: None,
            instructions: None,
        });
        snapshot
    }

    fn section_ids(result: &ContextAssemblyResult) -> Vec<&str> {
        result.sections.iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn empty_inputs_yield_only_derivable_sections() {
        let snap = snapshot();
        let result = assemble_context(&ContextRequest::new(&snap));
        assert_eq!(section_ids(&result), vec!["session-meta", "recent-events"]);
        assert!(result.trimmed_section_ids.is_empty());
        assert_eq!(
            result.prompt,
            "# Session metadata\n\n\
             Session ID: sess-1\nTimestamp: 2024-05-01T10:00:00Z\n\
             \n\
             # Recent events (latest 2)\n\n\
             - [user] add a migration\n- [shell] cargo test"
        );
    }

    #[test]
    fn nothing_derivable_means_empty_prompt() {
        let snap = SessionSnapshot::new("s", Vec::new());
        let result = assemble_context(&ContextRequest::new(&snap));
        assert!(result.sections.is_empty());
        assert_eq!(result.prompt, "");
        assert_eq!(result.used_tokens, 0);
    }

    #[test]
    fn extras_follow_builtins_and_blank_extras_drop() {
        let snap = snapshot();
        let history = [ChatMessage::new(ChatRole::User, "what next?")];
        let request = ContextRequest::new(&snap)
            .with_history(&history)
            .with_section(PromptSection {
                id: "repo-notes".into(),
                heading: "Repo notes".into(),
                content: "monorepo".into(),
            })
            .with_section(PromptSection {
                id: "blank".into(),
                heading: "Blank".into(),
                content: "   ".into(),
            });
        let result = assemble_context(&request);
        assert_eq!(
            section_ids(&result),
            vec!["session-meta", "recent-events", "chat-history", "repo-notes"]
        );
        assert!(result.prompt.ends_with("# Repo notes\n\nmonorepo"));
    }

    #[test]
    fn max_events_overrides_limit() {
        let snap = snapshot();
        let request = ContextRequest {
            max_events: Some(1),
            ..ContextRequest::new(&snap)
        };
        let result = assemble_context(&request);
        let events = &result.sections[1];
        assert_eq!(events.heading, "Recent events (latest 1)");
        assert_eq!(events.content, "- [shell] cargo test");
    }

    #[test]
    fn used_tokens_sum_survivors() {
        let snap = snapshot();
        let result = assemble_context(&ContextRequest::new(&snap));
        let expected: usize = result
            .sections
            .iter()
            .map(|s| crate::tokens::estimate_tokens(&s.content))
            .sum();
        assert_eq!(result.used_tokens, expected);
    }

    #[test]
    fn tight_window_evicts_extras_first() {
        let snap = snapshot();
        let request = ContextRequest::new(&snap)
            .with_provider(ProviderConfig {
                model: "test".into(),
                max_context_tokens: 0,
                max_output_tokens: 0,
            })
            .with_section(PromptSection {
                id: "bulk".into(),
                heading: "Bulk".into(),
                content: "z".repeat(4 * 3000),
            });
        let result = assemble_context(&request);
        assert_eq!(result.trimmed_section_ids, vec!["bulk"]);
        assert_eq!(section_ids(&result), vec!["session-meta", "recent-events"]);
    }

    #[test]
    fn assembly_is_logged() {
        let (logs, _guard) = capture_logs();
        let snap = snapshot();
        let _ = assemble_context(&ContextRequest::new(&snap));
        assert!(logs.has_event(Level::DEBUG, "context assembled"));
    }

    #[test]
    fn limits_from_settings() {
        let limits = ContextLimits::default();
        assert_eq!(limits.event_limit, 25);
        assert_eq!(limits.history_limit, 20);
        assert_eq!(limits.rules_limit, 15);
        assert_eq!(limits.event_line_max_chars, 320);
        assert_eq!(limits.timeline(), TimelineLimits::default());
        assert_eq!(ProviderConfig::default().max_context_tokens, 32_768);
    }
}
