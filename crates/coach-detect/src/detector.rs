//! Keyword co-occurrence detection of rule violations in a session log.
//!
//! For every rule the detector derives an *active* keyword set and reports the
//! first event whose text contains all of them. Detection is pure: the same
//! input always yields the same records and warnings.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use coach_core::text::prefix;
use coach_core::{
    AgentRule, EventRange, MisalignmentEvidence, MisalignmentRecord, MisalignmentStatus,
    SessionEvent, SessionId,
};
use coach_rules::{IdAllocator, derive_keywords};
use serde::Serialize;
use tracing::{debug, warn};

/// Words removed from rule keywords before matching. They describe the rule
/// itself and would otherwise match log text quoting or discussing it.
pub const DETECTION_STOP_WORDS: &[&str] = &[
    "always", "avoid", "detected", "don", "ensure", "file", "files", "instead", "missing",
    "must", "never", "not", "prefer", "require", "required", "should", "violation",
];

/// Maximum characters of event text kept as evidence highlight.
pub const HIGHLIGHT_MAX_CHARS: usize = 200;

/// Events included before a hit in its range.
const RANGE_BEFORE: usize = 2;

/// Events included after a hit in its range.
const RANGE_AFTER: usize = 1;

/// Inputs for one detection pass.
#[derive(Clone, Debug)]
pub struct DetectionInput<'a> {
    /// Session being scanned.
    pub session_id: &'a SessionId,
    /// Ordered session log.
    pub events: &'a [SessionEvent],
    /// Rules to check.
    pub rules: &'a [AgentRule],
    /// Records from earlier passes.
    pub existing: &'a [MisalignmentRecord],
    /// Timestamp stamped on new records and used for events without one.
    pub detected_at: DateTime<Utc>,
}

impl<'a> DetectionInput<'a> {
    /// Input with no existing records, detected now.
    pub fn new(
        session_id: &'a SessionId,
        events: &'a [SessionEvent],
        rules: &'a [AgentRule],
    ) -> Self {
        Self {
            session_id,
            events,
            rules,
            existing: &[],
            detected_at: Utc::now(),
        }
    }

    /// Set the records from earlier passes.
    #[must_use]
    pub fn with_existing(mut self, existing: &'a [MisalignmentRecord]) -> Self {
        self.existing = existing;
        self
    }

    /// Set the detection timestamp.
    #[must_use]
    pub fn detected_at(mut self, at: DateTime<Utc>) -> Self {
        self.detected_at = at;
        self
    }
}

/// Output of one detection pass.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DetectionOutcome {
    /// New records, in rule order.
    pub misalignments: Vec<MisalignmentRecord>,
    /// Rules that could not be checked.
    pub warnings: Vec<String>,
}

struct ScannedEvent<'a> {
    id: Option<&'a str>,
    at: Option<DateTime<Utc>>,
    kind: &'static str,
    text: String,
}

/// Keywords a rule is matched on.
///
/// Falls back to the heading when the rule has no keywords of its own.
pub fn active_keywords(rule: &AgentRule) -> BTreeSet<String> {
    let base = if rule.keywords.is_empty() {
        derive_keywords(&rule.heading)
    } else {
        rule.keywords.clone()
    };
    base.into_iter()
        .filter(|k| k.chars().count() > 2 && !DETECTION_STOP_WORDS.contains(&k.as_str()))
        .collect()
}

/// Scan `input.events` against every rule.
pub fn detect_misalignments(input: &DetectionInput<'_>) -> DetectionOutcome {
    let scanned: Vec<ScannedEvent<'_>> = input
        .events
        .iter()
        .map(|event| ScannedEvent {
            id: event.id.as_deref(),
            at: event.at,
            kind: event.kind.type_name(),
            text: event.kind.flatten_text().to_lowercase(),
        })
        .collect();

    let mut ids = IdAllocator::with_taken(input.existing.iter().map(|r| r.id.clone()));
    let mut outcome = DetectionOutcome::default();

    for rule in input.rules {
        let keywords = active_keywords(rule);
        if keywords.is_empty() {
            warn!(rule_id = %rule.id, "rule has no usable keywords, skipping");
            outcome
                .warnings
                .push(format!("rule {} has no usable keywords; skipped", rule.id));
            continue;
        }

        if input
            .existing
            .iter()
            .any(|record| record.rule_id == rule.id && record.is_active())
        {
            debug!(rule_id = %rule.id, "rule already has an active misalignment");
            continue;
        }

        let Some(position) = scanned
            .iter()
            .position(|event| keywords.iter().all(|k| event.text.contains(k.as_str())))
        else {
            continue;
        };

        let record = build_record(input, rule, &keywords, &scanned, position, &mut ids);
        debug!(rule_id = %rule.id, record_id = %record.id, position, "misalignment detected");
        outcome.misalignments.push(record);
    }

    outcome
}

fn build_record(
    input: &DetectionInput<'_>,
    rule: &AgentRule,
    keywords: &BTreeSet<String>,
    scanned: &[ScannedEvent<'_>],
    position: usize,
    ids: &mut IdAllocator,
) -> MisalignmentRecord {
    let hit = &scanned[position];
    let start = position.saturating_sub(RANGE_BEFORE);
    let end = (position + RANGE_AFTER).min(scanned.len() - 1);
    let keyword_list = keywords.iter().map(String::as_str).collect::<Vec<_>>().join(", ");

    MisalignmentRecord {
        id: ids.claim(&format!("mis-{}-{}", input.session_id, rule.id)),
        session_id: input.session_id.clone(),
        rule_id: rule.id.clone(),
        title: rule.heading.clone(),
        summary: format!("Session activity matched rule keywords: {keyword_list}"),
        severity: rule.severity,
        status: MisalignmentStatus::Open,
        evidence: vec![MisalignmentEvidence {
            message: format!(
                "Event #{} ({}) contains {keyword_list}",
                position + 1,
                hit.kind
            ),
            event_index: Some(position),
            event_id: hit.id.map(str::to_owned),
            highlight: Some(prefix(&hit.text, HIGHLIGHT_MAX_CHARS)),
        }],
        event_range: Some(EventRange {
            start_index: start,
            end_index: end,
            start_at: scanned[start].at.unwrap_or(input.detected_at),
            end_at: scanned[end].at.unwrap_or(input.detected_at),
        }),
        created_at: input.detected_at,
        updated_at: input.detected_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use coach_core::logging::capture_logs;
    use coach_core::{RuleKind, Severity};
    use proptest::prelude::*;
    use tracing::Level;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn rule(id: &str, keywords: &[&str]) -> AgentRule {
        AgentRule {
            id: id.into(),
            heading: format!("Heading {id}"),
            level: 2,
            summary: String::new(),
            body: String::new(),
            bullets: Vec::new(),
            severity: Severity::High,
            keywords: keywords.iter().map(|k| (*k).to_owned()).collect(),
            source: "bullet".into(),
            kind: RuleKind::Bullet,
        }
    }

    fn events(texts: &[&str]) -> Vec<SessionEvent> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| SessionEvent::message("assistant", t).at(ts(i as i64 * 10)))
            .collect()
    }

    fn detect(
        session: &SessionId,
        events: &[SessionEvent],
        rules: &[AgentRule],
        existing: &[MisalignmentRecord],
    ) -> DetectionOutcome {
        detect_misalignments(
            &DetectionInput::new(session, events, rules)
                .with_existing(existing)
                .detected_at(ts(1_000)),
        )
    }

    #[test]
    fn strict_and_matching() {
        let session = SessionId::from("s1");
        let log = events(&["I will force it", "pushing now", "git push --force origin"]);
        let rules = vec![rule("no-force-push", &["force", "push"])];
        let outcome = detect(&session, &log, &rules, &[]);
        assert_eq!(outcome.misalignments.len(), 1);
        let record = &outcome.misalignments[0];
        assert_eq!(record.evidence[0].event_index, Some(2));
        assert_eq!(record.id, "mis-s1-no-force-push");
        assert_eq!(record.status, MisalignmentStatus::Open);
        assert_eq!(record.severity, Severity::High);
        assert_eq!(record.title, "Heading no-force-push");
        assert_eq!(record.summary, "Session activity matched rule keywords: force, push");
        assert_eq!(
            record.evidence[0].message,
            "Event #3 (Message) contains force, push"
        );
        assert_eq!(record.evidence[0].highlight.as_deref(), Some("git push --force origin"));
        assert_eq!(record.created_at, ts(1_000));
    }

    #[test]
    fn no_hit_when_one_keyword_missing() {
        let session = SessionId::from("s");
        let log = events(&["force everything", "deploy"]);
        let outcome = detect(&session, &log, &[rule("r", &["force", "push"])], &[]);
        assert!(outcome.misalignments.is_empty());
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn range_is_clamped_at_both_ends() {
        let session = SessionId::from("s");
        let rules = vec![rule("r", &["needle"])];

        let first = detect(&session, &events(&["needle", "b", "c"]), &rules, &[]);
        let range = first.misalignments[0].event_range.clone().unwrap();
        assert_eq!((range.start_index, range.end_index), (0, 1));
        assert_eq!(range.start_at, ts(0));
        assert_eq!(range.end_at, ts(10));

        let last = detect(&session, &events(&["a", "b", "c", "needle"]), &rules, &[]);
        let range = last.misalignments[0].event_range.clone().unwrap();
        assert_eq!((range.start_index, range.end_index), (1, 3));

        let single = detect(&session, &events(&["needle"]), &rules, &[]);
        let range = single.misalignments[0].event_range.clone().unwrap();
        assert_eq!((range.start_index, range.end_index), (0, 0));
    }

    #[test]
    fn missing_timestamps_fall_back_to_detection_time() {
        let session = SessionId::from("s");
        let log = vec![SessionEvent::shell("cargo publish --allow-dirty")];
        let outcome = detect(&session, &log, &[rule("r", &["publish"])], &[]);
        let record = &outcome.misalignments[0];
        let range = record.event_range.clone().unwrap();
        assert_eq!(range.start_at, ts(1_000));
        assert_eq!(
            record.evidence[0].message,
            "Event #1 (LocalShellCall) contains publish"
        );
    }

    #[test]
    fn evidence_counts_log_positions() {
        let session = SessionId::from("s");
        let mut log = events(&["a", "needle"]);
        log[1].index = Some(41);
        log[1].id = Some("evt-41".into());
        let outcome = detect(&session, &log, &[rule("r", &["needle"])], &[]);
        let evidence = &outcome.misalignments[0].evidence[0];
        assert_eq!(evidence.event_index, Some(1));
        assert_eq!(evidence.event_id.as_deref(), Some("evt-41"));
        assert!(evidence.message.starts_with("Event #2 "));
        let range = outcome.misalignments[0].event_range.clone().unwrap();
        assert_eq!((range.start_index, range.end_index), (0, 1));
    }

    #[test]
    fn open_records_suppress_redetection() {
        let session = SessionId::from("s");
        let log = events(&["needle"]);
        let rules = vec![rule("r", &["needle"])];
        let mut existing = detect(&session, &log, &rules, &[]).misalignments;

        assert!(detect(&session, &log, &rules, &existing).misalignments.is_empty());

        existing[0]
            .transition(MisalignmentStatus::Acknowledged, ts(2_000))
            .unwrap();
        assert!(detect(&session, &log, &rules, &existing).misalignments.is_empty());

        existing[0]
            .transition(MisalignmentStatus::Dismissed, ts(3_000))
            .unwrap();
        let again = detect(&session, &log, &rules, &existing).misalignments;
        assert_eq!(again.len(), 1);
        assert_eq!(again[0].id, "mis-s-r-2");
    }

    #[test]
    fn stop_words_are_removed_before_matching() {
        let session = SessionId::from("s");
        let log = events(&["the secrets live in .env"]);
        let rules = vec![rule("r", &["never", "must", "secrets"])];
        let outcome = detect(&session, &log, &rules, &[]);
        assert_eq!(outcome.misalignments.len(), 1);
    }

    #[test]
    fn rule_without_usable_keywords_warns() {
        let (logs, _guard) = capture_logs();
        let session = SessionId::from("s");
        let mut stop_only = rule("stop-only", &["never", "avoid"]);
        stop_only.heading = "Rules".into();
        let outcome = detect(&session, &events(&["never avoid"]), &[stop_only], &[]);
        assert!(outcome.misalignments.is_empty());
        assert_eq!(outcome.warnings, vec!["rule stop-only has no usable keywords; skipped"]);
        assert!(logs.has_event(Level::WARN, "no usable keywords"));
    }

    #[test]
    fn heading_fallback_when_keywords_empty() {
        let session = SessionId::from("s");
        let mut r = rule("fallback", &[]);
        r.heading = "Secrets handling".into();
        let outcome = detect(&session, &events(&["handling secrets carefully"]), &[r], &[]);
        assert_eq!(outcome.misalignments.len(), 1);
    }

    #[test]
    fn text_is_matched_case_insensitively() {
        let session = SessionId::from("s");
        let outcome = detect(&session, &events(&["Running NPM INSTALL"]), &[rule("r", &["npm"])], &[]);
        assert_eq!(outcome.misalignments.len(), 1);
    }

    #[test]
    fn empty_log_detects_nothing() {
        let session = SessionId::from("s");
        let outcome = detect(&session, &[], &[rule("r", &["needle"])], &[]);
        assert!(outcome.misalignments.is_empty());
    }

    proptest! {
        #[test]
        fn detection_is_deterministic_and_range_bounded(
            texts in proptest::collection::vec("[a-d ]{0,12}", 1..20),
            keyword in "[a-d]{3}",
        ) {
            let session = SessionId::from("p");
            let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
            let log = events(&refs);
            let rules = vec![rule("r", &[keyword.as_str()])];
            let first = detect(&session, &log, &rules, &[]);
            let second = detect(&session, &log, &rules, &[]);
            prop_assert_eq!(&first, &second);
            for record in &first.misalignments {
                let range = record.event_range.clone().unwrap();
                prop_assert!(range.start_index <= range.end_index);
                prop_assert!(range.end_index < log.len());
            }
        }
    }
}
