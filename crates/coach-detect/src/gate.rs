//! Prompt gate: checks content about to be sent to the coach against the rules.
//!
//! High and critical hits block the content. Lower-severity hits let it
//! through with alignment notes prepended.

use std::fmt;

use coach_core::{
    AgentRule, EventRange, MisalignmentEvidence, MisalignmentRecord, Severity, SessionEvent,
    SessionId, SessionSnapshot,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::detector::{DetectionInput, detect_misalignments};
use crate::severity::select_primary;

/// Maximum rules listed in a decision.
pub const MAX_GATE_RULES: usize = 5;

/// Where gated content came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateSource {
    /// A selection from the session timeline.
    Timeline,
    /// The session as a whole.
    Session,
    /// Typed by the user.
    Manual,
}

impl GateSource {
    /// Lowercase wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Timeline => "timeline",
            Self::Session => "session",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for GateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content to gate.
#[derive(Clone, Debug)]
pub struct GateInput<'a> {
    /// Session the content belongs to.
    pub session_id: &'a SessionId,
    /// Where the content came from.
    pub source: GateSource,
    /// The content itself.
    pub content: &'a str,
    /// Rules to check.
    pub rules: &'a [AgentRule],
    /// Full session to scan instead of the content alone.
    pub snapshot: Option<&'a SessionSnapshot>,
}

/// One rule that applies to the gated content.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GateRuleSummary {
    /// Rule ID.
    pub id: String,
    /// Rule heading.
    pub title: String,
    /// Misalignment summary.
    pub summary: String,
    /// Rule severity.
    pub severity: Severity,
    /// Events around the hit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_range: Option<EventRange>,
    /// Evidence entries.
    pub evidence: Vec<MisalignmentEvidence>,
}

impl From<&MisalignmentRecord> for GateRuleSummary {
    fn from(record: &MisalignmentRecord) -> Self {
        Self {
            id: record.rule_id.clone(),
            title: record.title.clone(),
            summary: record.summary.clone(),
            severity: record.severity,
            event_range: record.event_range.clone(),
            evidence: record.evidence.clone(),
        }
    }
}

/// Identifies the misalignment a follow-up prompt should remediate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Remediation {
    /// Misalignment record ID.
    pub misalignment_id: String,
    /// Rule ID.
    pub rule_id: String,
    /// Rule severity.
    pub severity: Severity,
    /// First event index of the hit window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_index: Option<usize>,
    /// Last event index of the hit window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_index: Option<usize>,
}

impl From<&MisalignmentRecord> for Remediation {
    fn from(record: &MisalignmentRecord) -> Self {
        Self {
            misalignment_id: record.id.clone(),
            rule_id: record.rule_id.clone(),
            severity: record.severity,
            start_index: record.event_range.as_ref().map(|r| r.start_index),
            end_index: record.event_range.as_ref().map(|r| r.end_index),
        }
    }
}

/// Prompt to prefill when content is let through.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Prefill {
    /// Prompt text.
    pub prompt: String,
    /// Misalignment the prompt addresses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<Remediation>,
}

/// Gate verdict.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GateDecision {
    /// Whether the content must not be sent as is.
    pub blocked: bool,
    /// Severity of the primary hit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    /// Up to [`MAX_GATE_RULES`] applicable rules.
    pub rules: Vec<GateRuleSummary>,
    /// Markdown alignment notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<String>,
    /// Primary misalignment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<Remediation>,
    /// User-facing verdict.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Prompt to send; absent when blocked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefill: Option<Prefill>,
}

impl GateDecision {
    fn pass(content: &str) -> Self {
        Self {
            blocked: false,
            severity: None,
            rules: Vec::new(),
            annotations: None,
            remediation: None,
            message: None,
            prefill: Some(Prefill {
                prompt: content.to_owned(),
                remediation: None,
            }),
        }
    }
}

/// Evaluate content against the rules.
pub fn evaluate_content(input: &GateInput<'_>) -> GateDecision {
    if input.rules.is_empty() {
        return GateDecision::pass(input.content);
    }

    let synthetic;
    let events: &[SessionEvent] = if let Some(snapshot) = input.snapshot {
        &snapshot.events
    } else {
        synthetic = [SessionEvent::message(
            "user",
            &format!("[Source:{}]\n\n{}", input.source, input.content),
        )];
        &synthetic
    };

    let outcome = detect_misalignments(&DetectionInput::new(input.session_id, events, input.rules));
    let Some(primary) = select_primary(&outcome.misalignments) else {
        return GateDecision::pass(input.content);
    };

    let blocked = primary.severity >= Severity::High;
    let annotations = format_annotations(&outcome.misalignments, input.source);
    let remediation = Remediation::from(primary);
    debug!(
        session_id = %input.session_id,
        source = %input.source,
        hits = outcome.misalignments.len(),
        blocked,
        "gate evaluated"
    );

    GateDecision {
        blocked,
        severity: Some(primary.severity),
        rules: outcome
            .misalignments
            .iter()
            .take(MAX_GATE_RULES)
            .map(GateRuleSummary::from)
            .collect(),
        message: Some(gate_message(primary, blocked)),
        prefill: (!blocked).then(|| Prefill {
            prompt: format!("{annotations}\n\n{}", input.content),
            remediation: Some(remediation.clone()),
        }),
        annotations: Some(annotations),
        remediation: Some(remediation),
    }
}

fn format_annotations(records: &[MisalignmentRecord], source: GateSource) -> String {
    let plural = if records.len() == 1 { "" } else { "s" };
    let mut blocks = vec![
        format!("## Alignment notes (source: {source})"),
        format!("Detected {} rule{plural} that apply to this prompt.", records.len()),
    ];
    blocks.extend(records.iter().take(MAX_GATE_RULES).enumerate().map(|(i, record)| {
        let summary = if record.summary.is_empty() {
            "Address this rule before proceeding."
        } else {
            record.summary.as_str()
        };
        format!(
            "{}. [{}] {}: {summary}",
            i + 1,
            record.severity.label(),
            record.title
        )
    }));
    blocks.join("\n\n")
}

fn gate_message(record: &MisalignmentRecord, blocked: bool) -> String {
    if blocked {
        format!(
            "Rule {} ({}) blocks this action until remediation is documented.",
            record.rule_id, record.title
        )
    } else {
        format!(
            "Rule {} ({}) must guide this chat prompt.",
            record.rule_id, record.title
        )
    }
}
