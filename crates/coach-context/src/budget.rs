//! Greedy priority eviction of prompt sections.
//!
//! When the sections do not fit the prompt budget, whole sections are dropped,
//! least important first, until the rest fit. Sections are never truncated.

use coach_core::PromptSection;

use crate::constants::{MIN_PROMPT_BUDGET_TOKENS, MIN_RESERVED_OUTPUT_TOKENS, section_priority};
use crate::tokens::estimate_tokens;

/// A section with its eviction priority and estimated size.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MeasuredSection {
    /// The section.
    pub section: PromptSection,
    /// Eviction priority; higher is evicted first.
    pub priority: u8,
    /// Estimated tokens of the section content.
    pub tokens: usize,
}

impl MeasuredSection {
    /// Measure a section.
    pub fn new(section: PromptSection) -> Self {
        Self {
            priority: section_priority(&section.id),
            tokens: estimate_tokens(&section.content),
            section,
        }
    }
}

/// Outcome of budget enforcement.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BudgetOutcome {
    /// Surviving sections in their original order.
    pub sections: Vec<PromptSection>,
    /// Evicted section IDs in eviction order.
    pub trimmed_section_ids: Vec<String>,
    /// Estimated tokens of the survivors.
    pub used_tokens: usize,
}

/// Tokens available to the prompt for a provider window.
///
/// At least [`MIN_RESERVED_OUTPUT_TOKENS`] are held back for the answer, and
/// the result never drops below [`MIN_PROMPT_BUDGET_TOKENS`].
pub fn prompt_budget(max_context_tokens: u32, max_output_tokens: u32) -> usize {
    let reserved = max_output_tokens.max(MIN_RESERVED_OUTPUT_TOKENS);
    let limit = max_context_tokens
        .saturating_sub(reserved)
        .max(MIN_PROMPT_BUDGET_TOKENS);
    limit as usize
}

/// Drop the highest-priority-number sections until the total fits `limit`.
///
/// Among equal priorities the earliest section goes first.
pub fn enforce_budget(sections: Vec<MeasuredSection>, limit: usize) -> BudgetOutcome {
    let mut total: usize = sections.iter().map(|s| s.tokens).sum();
    let mut trimmed_section_ids = Vec::new();
    let mut evicted = vec![false; sections.len()];

    if total > limit {
        let mut order: Vec<usize> = (0..sections.len()).collect();
        order.sort_by(|&a, &b| sections[b].priority.cmp(&sections[a].priority));
        for position in order {
            if total <= limit {
                break;
            }
            total -= sections[position].tokens;
            evicted[position] = true;
            trimmed_section_ids.push(sections[position].section.id.clone());
        }
    }

    BudgetOutcome {
        sections: sections
            .into_iter()
            .zip(evicted)
            .filter_map(|(measured, gone)| (!gone).then_some(measured.section))
            .collect(),
        trimmed_section_ids,
        used_tokens: total,
    }
}
