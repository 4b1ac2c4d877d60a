//! Section builders.
//!
//! Each builder renders one kind of source data and returns `None` when there
//! is nothing to say, so empty sections never reach the prompt.

use chrono::{DateTime, SecondsFormat, Utc};
use coach_core::{AgentRule, ChatMessage, MisalignmentRecord, PromptSection, SessionEvent, SessionSnapshot};

use crate::constants::{
    AGENT_RULES_ID, CHAT_HISTORY_ID, MISALIGNMENTS_ID, RECENT_EVENTS_ID, SESSION_META_ID,
};

/// Render a timestamp the way every section shows it.
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Session ID, start time, repository and launch instructions.
pub fn session_meta_section(snapshot: &SessionSnapshot) -> Option<PromptSection> {
    let meta = snapshot.meta.as_ref()?;
    let mut lines = vec![
        format!("Session ID: {}", snapshot.session_id),
        format!("Timestamp: {}", meta.timestamp.as_deref().unwrap_or("unknown")),
    ];
    if let Some(git) = &meta.git
        && let Some(repo) = git.repo.as_deref().filter(|r| !r.is_empty())
    {
        let branch = git.branch.as_deref().unwrap_or("unknown branch");
        lines.push(format!("Repo: {repo} ({branch})"));
    }
    if let Some(instructions) = meta.instructions.as_deref().filter(|i| !i.is_empty()) {
        lines.push(format!("Instructions: {instructions}"));
    }
    PromptSection::non_empty(SESSION_META_ID, "Session metadata", lines.join("\n"))
}

/// Every misalignment that has not been dismissed.
pub fn misalignments_section(records: &[MisalignmentRecord]) -> Option<PromptSection> {
    let blocks: Vec<String> = records
        .iter()
        .filter(|record| record.is_active())
        .enumerate()
        .map(|(i, record)| {
            let mut lines = vec![
                format!(
                    "{}. [{} | {}] {}",
                    i + 1,
                    record.severity.label(),
                    record.status,
                    record.title
                ),
                format!("Summary: {}", record.summary),
            ];
            if !record.evidence.is_empty() {
                let messages: Vec<&str> =
                    record.evidence.iter().map(|e| e.message.as_str()).collect();
                lines.push(format!("Evidence: {}", messages.join(" | ")));
            }
            if let Some(range) = &record.event_range {
                lines.push(format!(
                    "Events: {} - {} ({} → {})",
                    range.start_index,
                    range.end_index,
                    format_timestamp(&range.start_at),
                    format_timestamp(&range.end_at)
                ));
            }
            lines.join("\n")
        })
        .collect();
    PromptSection::non_empty(MISALIGNMENTS_ID, "Detected misalignments", blocks.join("\n\n"))
}

/// One summary line for each of the last `limit` events.
pub fn recent_events_section(
    events: &[SessionEvent],
    limit: usize,
    line_max_chars: usize,
) -> Option<PromptSection> {
    let selected = &events[events.len().saturating_sub(limit)..];
    let lines: Vec<String> = selected
        .iter()
        .map(|event| event.kind.summary_line(line_max_chars))
        .collect();
    PromptSection::non_empty(
        RECENT_EVENTS_ID,
        format!("Recent events (latest {})", selected.len()),
        lines.join("\n"),
    )
}

/// The last `limit` coaching chat messages.
pub fn chat_history_section(history: &[ChatMessage], limit: usize) -> Option<PromptSection> {
    let selected = &history[history.len().saturating_sub(limit)..];
    let lines: Vec<String> = selected
        .iter()
        .map(|message| format!("- [{}] {}", message.role, message.content))
        .collect();
    PromptSection::non_empty(CHAT_HISTORY_ID, "Chat history", lines.join("\n"))
}

/// The first `limit` rules with severity, summary and bullets.
pub fn agent_rules_section(rules: &[AgentRule], limit: usize) -> Option<PromptSection> {
    let blocks: Vec<String> = rules
        .iter()
        .take(limit)
        .enumerate()
        .map(|(i, rule)| {
            let mut block = format!(
                "{}. {} [{}]\n{}",
                i + 1,
                rule.heading,
                rule.severity.label(),
                rule.summary
            );
            for bullet in &rule.bullets {
                block.push_str("\n  - ");
                block.push_str(bullet);
            }
            block.trim().to_owned()
        })
        .collect();
    PromptSection::non_empty(AGENT_RULES_ID, "Relevant AGENT rules", blocks.join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use coach_core::{
        ChatRole, EventKind, EventRange, GitInfo, MisalignmentEvidence, MisalignmentStatus,
        RuleKind, SessionId, SessionMeta, Severity,
    };

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn record(title: &str, status: MisalignmentStatus) -> MisalignmentRecord {
        MisalignmentRecord {
            id: format!("mis-{title}"),
            session_id: SessionId::from("s"),
            rule_id: title.into(),
            title: title.into(),
            summary: "keywords matched".into(),
            severity: Severity::High,
            status,
            evidence: vec![
                MisalignmentEvidence {
                    message: "Event #3 (Message) contains force".into(),
                    ..MisalignmentEvidence::default()
                },
                MisalignmentEvidence {
                    message: "second".into(),
                    ..MisalignmentEvidence::default()
                },
            ],
            event_range: Some(EventRange {
                start_index: 0,
                end_index: 3,
                start_at: ts(0),
                end_at: ts(60),
            }),
            created_at: ts(0),
            updated_at: ts(0),
        }
    }

    #[test]
    fn meta_section_lines() {
        let mut snapshot = SessionSnapshot::new("sess-9", Vec::new());
        assert!(session_meta_section(&snapshot).is_none());

        snapshot.meta = Some(SessionMeta {
            timestamp: None,
            git: Some(GitInfo {
                repo: Some("acme/app".into()),
                branch: None,
            }),
            instructions: Some("Fix the flaky test".into()),
        });
        let section = session_meta_section(&snapshot).unwrap();
        assert_eq!(section.id, "session-meta");
        assert_eq!(
            section.content,
            "Session ID: sess-9\nTimestamp: unknown\nRepo: acme/app (unknown branch)\nInstructions: Fix the flaky test"
        );
    }

    #[test]
    fn repo_line_needs_a_repository_name() {
        let mut snapshot = SessionSnapshot::new("sess-9", Vec::new());
        for repo in [None, Some(String::new())] {
            snapshot.meta = Some(SessionMeta {
                timestamp: Some("2025-03-01T12:00:00Z".into()),
                git: Some(GitInfo {
                    repo,
                    branch: Some("main".into()),
                }),
                instructions: None,
            });
            let section = session_meta_section(&snapshot).unwrap();
            assert_eq!(
                section.content,
                "Session ID: sess-9\nTimestamp: 2025-03-01T12:00:00Z"
            );
        }
    }

    #[test]
    fn misalignment_blocks_skip_dismissed() {
        let records = vec![
            record("first", MisalignmentStatus::Open),
            record("gone", MisalignmentStatus::Dismissed),
            record("second", MisalignmentStatus::Acknowledged),
        ];
        let section = misalignments_section(&records).unwrap();
        assert_eq!(
            section.content,
            "1. [HIGH | open] first\n\
             Summary: keywords matched\n\
             Evidence: Event #3 (Message) contains force | second\n\
             Events: 0 - 3 (1970-01-01T00:00:00Z → 1970-01-01T00:01:00Z)\n\
             \n\
             2. [HIGH | acknowledged] second\n\
             Summary: keywords matched\n\
             Evidence: Event #3 (Message) contains force | second\n\
             Events: 0 - 3 (1970-01-01T00:00:00Z → 1970-01-01T00:01:00Z)"
        );
    }

    #[test]
    fn all_dismissed_means_no_section() {
        assert!(misalignments_section(&[record("x", MisalignmentStatus::Dismissed)]).is_none());
        assert!(misalignments_section(&[]).is_none());
    }

    #[test]
    fn recent_events_keeps_the_tail() {
        let events: Vec<_> = (0..5)
            .map(|i| SessionEvent::message("user", &format!("msg {i}")))
            .chain([
                SessionEvent::shell("cargo test"),
                SessionEvent::new(EventKind::FunctionCall {
                    name: "read".into(),
                    args: serde_json::Value::Null,
                    output: None,
                    duration_ms: Some(5),
                }),
            ])
            .collect();
        let section = recent_events_section(&events, 3, 320).unwrap();
        assert_eq!(section.heading, "Recent events (latest 3)");
        assert_eq!(
            section.content,
            "- [user] msg 4\n- [shell] cargo test\n- [fn:read] duration 5ms"
        );
        assert!(recent_events_section(&[], 25, 320).is_none());
        assert!(recent_events_section(&events, 0, 320).is_none());
    }

    #[test]
    fn long_messages_are_truncated() {
        let long = "x".repeat(400);
        let section = recent_events_section(&[SessionEvent::message("user", &long)], 25, 320).unwrap();
        let line = section.content;
        assert!(line.ends_with("..."));
        assert_eq!(line.chars().count(), "- [user] ".len() + 320);
    }

    #[test]
    fn history_keeps_the_tail() {
        let history: Vec<_> = (0..25)
            .map(|i| ChatMessage::new(ChatRole::User, format!("q{i}")))
            .collect();
        let section = chat_history_section(&history, 20).unwrap();
        let lines: Vec<_> = section.content.lines().collect();
        assert_eq!(lines.len(), 20);
        assert_eq!(lines[0], "- [user] q5");
        assert!(chat_history_section(&[], 20).is_none());
    }

    #[test]
    fn rules_render_with_bullets() {
        let rule = AgentRule {
            id: "formatting".into(),
            heading: "Formatting".into(),
            level: 2,
            summary: "Formatting".into(),
            body: "- fmt\n- lint".into(),
            bullets: vec!["fmt".into(), "lint".into()],
            severity: Severity::Info,
            keywords: ["fmt".to_owned()].into_iter().collect(),
            source: "heading".into(),
            kind: RuleKind::Section,
        };
        let section = agent_rules_section(&[rule.clone(), rule], 1).unwrap();
        assert_eq!(section.content, "1. Formatting [INFO]\nFormatting\n  - fmt\n  - lint");
        assert!(agent_rules_section(&[], 15).is_none());
    }
}
