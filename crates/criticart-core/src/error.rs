//! Local validation errors.

use thiserror::Error;

/// Input that failed a local precondition before any remote call was made.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A required field was empty or absent.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// Malformed email address.
    #[error("Please enter a valid email address")]
    InvalidEmail,

    /// Password does not meet the strength rules.
    #[error("{0}")]
    WeakPassword(&'static str),

    /// Username outside the allowed shape.
    #[error("Username must be 3-30 characters of letters, numbers or underscores")]
    InvalidUsername,

    /// Rating outside 0-5 or not a half step.
    #[error("Rating must be between 0 and 5 in half steps, got {0}")]
    InvalidRating(f64),

    /// Page numbers start at 1.
    #[error("Page must be at least 1")]
    InvalidPage,

    /// Page size must be positive.
    #[error("Page size must be at least 1")]
    InvalidPageSize,

    /// Field longer than the allowed maximum.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    /// Review status change that moderation does not allow.
    #[error("Cannot move a review from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// Owner tried to edit a review that already left the pending queue.
    #[error("Only pending reviews can be edited")]
    NotEditable,

    /// Upload with no content.
    #[error("File is empty")]
    EmptyFile,
}
