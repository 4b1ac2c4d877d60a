//! # coach-detect
//!
//! Lexical misalignment detection over recorded session events.
//!
//! - [`detector`]: strict keyword co-occurrence scan producing
//!   [`MisalignmentRecord`](coach_core::MisalignmentRecord)s
//! - [`severity`]: ranking and primary selection
//! - [`gate`]: block or annotate content before it reaches the coach

#![deny(unsafe_code)]

pub mod detector;
pub mod gate;
pub mod severity;

pub use detector::{
    DETECTION_STOP_WORDS, DetectionInput, DetectionOutcome, active_keywords, detect_misalignments,
};
pub use gate::{
    GateDecision, GateInput, GateRuleSummary, GateSource, Prefill, Remediation, evaluate_content,
};
pub use severity::{rank, select_primary};
