//! # coach-context
//!
//! Token-budgeted prompt context for coaching a recorded session.
//!
//! - **Sections**: session metadata, misalignments, recent events, chat
//!   history and agent rules, each omitted when empty
//! - **Timeline**: `#N` event references resolved into a detail section
//! - **Budget**: greedy priority eviction of whole sections
//! - **Assembler**: ties the above into one rendered prompt

#![deny(unsafe_code)]

pub mod assembler;
pub mod budget;
pub mod constants;
pub mod sections;
pub mod timeline;
pub mod tokens;

pub use assembler::{
    ContextAssemblyResult, ContextLimits, ContextRequest, ProviderConfig, assemble_context,
    build_prompt,
};
pub use budget::{BudgetOutcome, MeasuredSection, enforce_budget, prompt_budget};
pub use constants::section_priority;
pub use timeline::{
    EventReference, ResolvedEvent, TimelineContext, TimelineLimits, requested_indexes,
    resolve_timeline_context,
};
pub use tokens::estimate_tokens;
