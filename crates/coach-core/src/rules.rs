//! Agent rules: atomic, checkable instructions extracted from guideline documents.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::misalignment::Severity;

/// Synthetic `source` for rules exploded from a single bullet.
pub const BULLET_SOURCE: &str = "bullet";

/// Synthetic `source` for rules covering a whole section.
pub const SECTION_SOURCE: &str = "heading";

/// How a rule was derived from its document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    /// One list item became one rule.
    Bullet,
    /// A heading section as a whole.
    Section,
}

/// One atomic rule.
///
/// Created once per document parse and never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRule {
    /// Slug, unique within one extraction call.
    pub id: String,
    /// Display heading (`Section: trigger` for bullet rules).
    pub heading: String,
    /// Nesting depth of the originating section.
    pub level: u8,
    /// One-line summary.
    pub summary: String,
    /// Raw source text.
    pub body: String,
    /// Sub-points; only filled for section rules whose bullets were not exploded.
    #[serde(default)]
    pub bullets: Vec<String>,
    /// Inferred severity.
    pub severity: Severity,
    /// Lowercase match tokens.
    #[serde(default)]
    pub keywords: BTreeSet<String>,
    /// Originating file path, or [`BULLET_SOURCE`] / [`SECTION_SOURCE`].
    pub source: String,
    /// Derivation kind.
    pub kind: RuleKind,
}
