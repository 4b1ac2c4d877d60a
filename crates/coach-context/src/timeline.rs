//! `#N` timeline references.
//!
//! A coaching prompt can point at session events by their one-based display
//! number (`what went wrong at #12?`). The resolver looks those events up,
//! together with the window of a misalignment being remediated, and renders
//! them in detail as the `resolved-events` section.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use coach_core::text::truncate;
use coach_core::{EventKind, PromptSection, SessionEvent, SessionSnapshot};
use coach_detect::Remediation;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::constants::RESOLVED_EVENTS_ID;
use crate::sections::format_timestamp;

static EVENT_REFERENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#(\d{1,6})\b").unwrap());

/// Default cap on resolved events per prompt.
pub const DEFAULT_MAX_RESOLVED_EVENTS: usize = 8;

/// Default cap on each detail block of a resolved event.
pub const DEFAULT_SNIPPET_MAX_CHARS: usize = 1200;

/// Resolution limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimelineLimits {
    /// Maximum events resolved.
    pub max_events: usize,
    /// Character cap for each detail block.
    pub snippet_max_chars: usize,
}

impl Default for TimelineLimits {
    fn default() -> Self {
        Self {
            max_events: DEFAULT_MAX_RESOLVED_EVENTS,
            snippet_max_chars: DEFAULT_SNIPPET_MAX_CHARS,
        }
    }
}

/// One resolved event.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedEvent<'a> {
    /// The event.
    pub event: &'a SessionEvent,
    /// Zero-based event index.
    pub event_index: usize,
    /// One-based number as referenced.
    pub display_index: usize,
    /// Multi-line detail rendering.
    pub summary: String,
}

/// Compact pointer to a resolved event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventReference {
    /// Zero-based event index.
    pub event_index: usize,
    /// One-based number as referenced.
    pub display_index: usize,
    /// Recorder ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    /// Event variant name.
    pub event_type: String,
    /// Heading line, e.g. `Event #3 Message (user)`.
    pub summary: String,
}

/// Resolution outcome.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TimelineContext<'a> {
    /// Resolved events in display order.
    pub resolved: Vec<ResolvedEvent<'a>>,
    /// `resolved-events` section, when anything resolved.
    pub section: Option<PromptSection>,
    /// Pointers to the resolved events.
    pub references: Vec<EventReference>,
}

/// Display numbers referenced by `prompt` and covered by `remediation`,
/// sorted and deduplicated. Numbers past `event_count` are dropped and the
/// remediation window is clamped to the log.
pub fn requested_indexes(
    prompt: &str,
    remediation: Option<&Remediation>,
    event_count: usize,
) -> Vec<usize> {
    let mut indexes: BTreeSet<usize> = EVENT_REFERENCE
        .captures_iter(prompt)
        .filter_map(|caps| caps[1].parse::<usize>().ok())
        .filter(|&n| (1..=event_count).contains(&n))
        .collect();
    if let Some((start, end)) = remediation.and_then(|r| r.start_index.zip(r.end_index))
        && start < event_count
    {
        let last = end.max(start).min(event_count - 1);
        indexes.extend(start.saturating_add(1)..=last.saturating_add(1));
    }
    indexes.into_iter().collect()
}

/// Resolve `#N` references in `prompt` plus the remediation window.
pub fn resolve_timeline_context<'a>(
    snapshot: &'a SessionSnapshot,
    prompt: &str,
    remediation: Option<&Remediation>,
    limits: TimelineLimits,
) -> TimelineContext<'a> {
    let resolved: Vec<ResolvedEvent<'a>> = requested_indexes(prompt, remediation, snapshot.events.len())
        .into_iter()
        .filter_map(|display| lookup(snapshot, display, limits.snippet_max_chars))
        .take(limits.max_events)
        .collect();
    if resolved.is_empty() {
        return TimelineContext::default();
    }

    let content = resolved
        .iter()
        .map(|entry| entry.summary.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    let section = PromptSection::non_empty(
        RESOLVED_EVENTS_ID,
        format!("Resolved timeline references ({})", resolved.len()),
        content,
    );
    let references = resolved
        .iter()
        .map(|entry| EventReference {
            event_index: entry.event_index,
            display_index: entry.display_index,
            event_id: entry.event.id.clone(),
            event_type: entry.event.kind.type_name().to_owned(),
            summary: event_heading(&entry.event.kind, entry.display_index),
        })
        .collect();

    TimelineContext {
        resolved,
        section,
        references,
    }
}

fn lookup(snapshot: &SessionSnapshot, display: usize, snippet_max: usize) -> Option<ResolvedEvent<'_>> {
    let event_index = display.checked_sub(1)?;
    let event = snapshot.events.get(event_index)?;
    Some(ResolvedEvent {
        event,
        event_index,
        display_index: display,
        summary: event_details(event, display, snippet_max),
    })
}

/// `Event #N Type (role|name)`.
pub fn event_heading(kind: &EventKind, display: usize) -> String {
    let mut heading = format!("Event #{display} {}", kind.type_name());
    if let Some(actor) = kind.actor().filter(|a| !a.is_empty()) {
        heading.push_str(&format!(" ({actor})"));
    }
    heading
}

fn event_details(event: &SessionEvent, display: usize, max: usize) -> String {
    let mut lines = vec![event_heading(&event.kind, display)];
    if let Some(at) = &event.at {
        lines.push(format!("Timestamp: {}", format_timestamp(at)));
    }
    match &event.kind {
        EventKind::Message { role, content } => {
            if let Some(role) = role {
                lines.push(format!("Role: {role}"));
            }
            lines.push(format!("Content:\n{}", truncate(&content.to_text(), max)));
        }
        EventKind::LocalShellCall {
            command,
            stdout,
            stderr,
            exit_code,
            cwd,
        } => {
            lines.push(format!("Command: {command}"));
            if let Some(code) = exit_code {
                lines.push(format!("Exit code: {code}"));
            }
            if let Some(cwd) = cwd {
                lines.push(format!("cwd: {cwd}"));
            }
            if let Some(stdout) = stdout.as_deref().filter(|s| !s.is_empty()) {
                lines.push(format!("stdout:\n{}", truncate(stdout, max)));
            }
            if let Some(stderr) = stderr.as_deref().filter(|s| !s.is_empty()) {
                lines.push(format!("stderr:\n{}", truncate(stderr, max)));
            }
        }
        EventKind::FunctionCall {
            name, args, output, ..
        } => {
            lines.push(format!("Function: {name}"));
            push_call_payload(&mut lines, args, output.as_ref(), max);
        }
        EventKind::CustomToolCall { name, args, output } => {
            lines.push(format!("Tool: {name}"));
            push_call_payload(&mut lines, args, output.as_ref(), max);
        }
        EventKind::WebSearchCall { name, args, output } => {
            lines.push(format!("Tool: {}", name.as_deref().unwrap_or("web_search")));
            push_call_payload(&mut lines, args, output.as_ref(), max);
        }
        EventKind::Reasoning { content } => {
            lines.push(format!("Content:\n{}", truncate(&content.to_text(), max)));
        }
        EventKind::FileChange { path, diff } => {
            lines.push(format!("Path: {path}"));
            if let Some(diff) = diff.as_deref().filter(|d| !d.is_empty()) {
                lines.push(format!("Diff:\n{}", truncate(diff, max)));
            }
        }
        EventKind::Other { data } => {
            lines.push(format!("Payload:\n{}", truncate(&pretty(data), max)));
        }
    }
    lines.join("\n")
}

fn push_call_payload(lines: &mut Vec<String>, args: &Value, output: Option<&Value>, max: usize) {
    lines.push(format!("Arguments:\n{}", truncate(&pretty(args), max)));
    if let Some(output) = output.filter(|o| !o.is_null()) {
        lines.push(format!("Output:\n{}", truncate(&pretty(output), max)));
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
