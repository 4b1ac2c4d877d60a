//! Core error type.

use thiserror::Error;

use crate::misalignment::MisalignmentStatus;

/// Errors raised by core model operations.
#[derive(Debug, Error)]
pub enum CoachError {
    /// A misalignment status change not allowed by the transition table.
    #[error("invalid misalignment transition for {id}: {from} -> {to}")]
    InvalidTransition {
        /// Misalignment record ID.
        id: String,
        /// Current status.
        from: MisalignmentStatus,
        /// Requested status.
        to: MisalignmentStatus,
    },

    /// An unrecognised status string.
    #[error("unknown misalignment status: {0}")]
    UnknownStatus(String),

    /// An unrecognised severity string.
    #[error("unknown severity: {0}")]
    UnknownSeverity(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoachError>;
