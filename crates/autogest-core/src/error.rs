//! # Error Types
//!
//! Validation errors raised by the form checks in [`crate::validation`].
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  autogest-core     ValidationError  - bad user input (this file)        │
//! │  autogest-db       DbError          - persistence failures              │
//! │  autogest-media    MediaError       - image provider failures           │
//! │  autogest-report   ReportError      - document / printer failures       │
//! │  apps/cli          ApiError         - what the user sees                │
//! │                                                                         │
//! │  Flow: ValidationError ──► ApiError ──► message on stderr               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Field labels are the user-facing (Spanish) form labels, so the rendered
//! message names the field exactly as the form shows it.

use thiserror::Error;

/// Input validation errors.
///
/// A validation error always aborts the operation before anything is
/// persisted or uploaded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or blank.
    #[error("{field} is required")]
    Required { field: String },

    /// Field is not a number (or not an amount).
    #[error("{field} must be a valid number")]
    NotANumber { field: String },

    /// Numeric value is below the minimum (no upper bound configured).
    #[error("{field} must be at least {min}")]
    BelowMinimum { field: String, min: String },

    /// Numeric value is outside a closed range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: String,
        min: String,
        max: String,
    },

    /// Invalid format (e.g. a date that is not YYYY-MM-DD).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in the allowed set.
    #[error("{field} must be one of: {}", allowed.join(", "))]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    /// Returns the label of the offending field.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::NotANumber { field }
            | ValidationError::BelowMinimum { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::NotAllowed { field, .. } => field,
        }
    }
}
