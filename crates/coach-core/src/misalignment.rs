//! Misalignment records: candidate violations of an agent rule.
//!
//! A record is created by the detector the first time a rule's keywords
//! co-occur in a session event. Afterwards it only changes through status
//! transitions driven by the reviewer, see [`MisalignmentStatus::can_transition_to`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{CoachError, Result};
use crate::ids::SessionId;

// ─────────────────────────────────────────────────────────────────────────────
// Severity
// ─────────────────────────────────────────────────────────────────────────────

/// How serious a rule (and therefore a misalignment of it) is.
///
/// Ordered from least to most severe, so `Ord` matches [`Severity::rank`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational guidance.
    #[default]
    Info,
    /// Soft preference.
    Low,
    /// Should be followed.
    Medium,
    /// Must be followed.
    High,
    /// Reserved for caller-assigned escalations; extraction never infers it.
    Critical,
}

impl Severity {
    /// Numeric rank, `info = 0` through `critical = 4`.
    #[must_use]
    pub fn rank(self) -> u8 {
        match self {
            Self::Info => 0,
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
            Self::Critical => 4,
        }
    }

    /// Lowercase wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Uppercase label used in prompt text (`HIGH`, `MEDIUM`, ...).
    #[must_use]
    pub fn label(self) -> String {
        self.as_str().to_uppercase()
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = CoachError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "info" => Ok(Self::Info),
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(CoachError::UnknownSeverity(other.to_owned())),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Status
// ─────────────────────────────────────────────────────────────────────────────

/// Review state of a misalignment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MisalignmentStatus {
    /// Freshly detected, not yet reviewed.
    #[default]
    Open,
    /// Seen by the reviewer and accepted as real.
    Acknowledged,
    /// Rejected by the reviewer. A dismissed record no longer blocks
    /// re-detection of its rule.
    Dismissed,
}

impl MisalignmentStatus {
    /// Statuses reachable from `self`.
    #[must_use]
    pub fn allowed_transitions(self) -> &'static [Self] {
        match self {
            Self::Open => &[Self::Acknowledged, Self::Dismissed],
            Self::Acknowledged => &[Self::Dismissed, Self::Open],
            Self::Dismissed => &[Self::Acknowledged, Self::Open],
        }
    }

    /// Whether moving from `self` to `next` is allowed.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_transitions().contains(&next)
    }

    /// Lowercase wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Acknowledged => "acknowledged",
            Self::Dismissed => "dismissed",
        }
    }
}

impl fmt::Display for MisalignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MisalignmentStatus {
    type Err = CoachError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "open" => Ok(Self::Open),
            "acknowledged" => Ok(Self::Acknowledged),
            "dismissed" => Ok(Self::Dismissed),
            other => Err(CoachError::UnknownStatus(other.to_owned())),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Records
// ─────────────────────────────────────────────────────────────────────────────

/// One piece of evidence backing a misalignment.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MisalignmentEvidence {
    /// Human-readable description of what matched.
    pub message: String,
    /// Zero-based index of the matching event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_index: Option<usize>,
    /// Recorder ID of the matching event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    /// Snippet of the matching event text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight: Option<String>,
}

/// Window of session events surrounding a detected hit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRange {
    /// First event index in the window (inclusive).
    pub start_index: usize,
    /// Last event index in the window (inclusive).
    pub end_index: usize,
    /// Timestamp of the first event.
    pub start_at: DateTime<Utc>,
    /// Timestamp of the last event.
    pub end_at: DateTime<Utc>,
}

/// A candidate violation of an agent rule within one session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MisalignmentRecord {
    /// Record ID.
    pub id: String,
    /// Session the violation was found in.
    pub session_id: SessionId,
    /// ID of the rule that triggered.
    pub rule_id: String,
    /// Display title (the rule heading).
    pub title: String,
    /// One-line explanation.
    pub summary: String,
    /// Copied from the rule.
    pub severity: Severity,
    /// Review state.
    pub status: MisalignmentStatus,
    /// Ordered evidence entries.
    #[serde(default)]
    pub evidence: Vec<MisalignmentEvidence>,
    /// Surrounding event window, when the hit came from an indexed event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_range: Option<EventRange>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl MisalignmentRecord {
    /// Whether the record still counts against its rule.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status != MisalignmentStatus::Dismissed
    }

    /// Move the record to `next`, stamping `updated_at`.
    pub fn transition(&mut self, next: MisalignmentStatus, at: DateTime<Utc>) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(CoachError::InvalidTransition {
                id: self.id.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = at;
        Ok(())
    }
}
