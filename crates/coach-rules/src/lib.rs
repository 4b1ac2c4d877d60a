//! # coach-rules
//!
//! Turns project instruction documents into atomic [`AgentRule`]s.
//!
//! - [`markdown`]: heading/list/prose structure of a document
//! - [`extract`]: bullet and section rules with keywords, severity and IDs
//! - [`discovery`]: finding instruction files under a project root
//! - [`index`]: SHA-256 deduplication and the per-root [`InstructionCache`]
//!
//! [`AgentRule`]: coach_core::AgentRule

#![deny(unsafe_code)]

pub mod discovery;
pub mod errors;
pub mod extract;
pub mod ids;
pub mod index;
pub mod keywords;
pub mod markdown;
pub mod severity;

pub use discovery::{Discovery, discover_instruction_files};
pub use errors::{Result, RulesError};
pub use extract::extract_rules;
pub use ids::{IdAllocator, slugify};
pub use index::{
    DuplicateCheck, IndexStats, IngestOutcome, InstructionCache, InstructionIndex,
    InstructionRecord, hex_sha256, normalize_root,
};
pub use keywords::{EXTRACTION_STOP_WORDS, derive_keywords, tokenize};
pub use severity::infer_severity;
