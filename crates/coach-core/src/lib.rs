//! # coach-core
//!
//! Foundation types shared by every stage of the coach pipeline.
//!
//! - **Branded IDs**: `SessionId`, `ChatMessageId` as newtypes for type safety
//! - **Session events**: `SessionEvent` with the closed `EventKind` sum type and
//!   per-variant text flattening
//! - **Rules**: `AgentRule`, the atomic rule record produced by extraction
//! - **Misalignments**: `MisalignmentRecord`, `Severity`, `MisalignmentStatus`
//!   with its transition table
//! - **Prompt sections**: `PromptSection`, the unit of assembled context
//! - **Errors**: `CoachError` via `thiserror`
//! - **Logging**: `tracing` subscriber setup and in-memory capture for tests

#![deny(unsafe_code)]

pub mod errors;
pub mod events;
pub mod ids;
pub mod logging;
pub mod misalignment;
pub mod prompt;
pub mod rules;
pub mod session;
pub mod text;

pub use errors::{CoachError, Result};
pub use events::{ContentPart, EventKind, MessageContent, SessionEvent};
pub use ids::{ChatMessageId, SessionId};
pub use misalignment::{
    EventRange, MisalignmentEvidence, MisalignmentRecord, MisalignmentStatus, Severity,
};
pub use prompt::PromptSection;
pub use rules::{AgentRule, RuleKind};
pub use session::{ChatMessage, ChatRole, GitInfo, SessionMeta, SessionSnapshot};
