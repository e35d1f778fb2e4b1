//! # Error Types — Structured Error Hierarchy
//!
//! Defines the error types used throughout the commerce stack. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - Validation errors name the violating field and the rule.
//! - State machine errors include the current state, attempted transition,
//!   and rejection reason.
//! - No `Box<dyn Error>` — callers can match on structured variants.

use thiserror::Error;

/// Top-level error type for the commerce stack.
#[derive(Error, Debug)]
pub enum PetstoreError {
    /// Request or document validation failure.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// State machine transition rejected.
    #[error("state error: {0}")]
    State(#[from] StateError),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Validation failure for a domain value or request field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is empty or whitespace-only.
    #[error("{field} must not be empty")]
    Empty {
        /// Name of the offending field.
        field: &'static str,
    },

    /// A field exceeds its maximum length.
    #[error("{field} must not exceed {max} characters")]
    TooLong {
        /// Name of the offending field.
        field: &'static str,
        /// Maximum permitted length.
        max: usize,
    },

    /// A numeric field is outside its permitted range.
    #[error("{field} must be within {min}..={max}, got {actual}")]
    OutOfRange {
        /// Name of the offending field.
        field: &'static str,
        /// Lower bound (inclusive).
        min: i64,
        /// Upper bound (inclusive).
        max: i64,
        /// The rejected value.
        actual: i64,
    },

    /// A field has an invalid format.
    #[error("{field} is malformed: {reason}")]
    Malformed {
        /// Name of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Error in lifecycle state transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// Attempted an invalid state transition.
    #[error("invalid transition from {from} to {to}: {reason}")]
    InvalidTransition {
        /// Current state name.
        from: String,
        /// Attempted target state name.
        to: String,
        /// Reason the transition was rejected.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_messages_name_the_field() {
        let err = ValidationError::Empty { field: "sku" };
        assert_eq!(err.to_string(), "sku must not be empty");

        let err = ValidationError::OutOfRange {
            field: "qty",
            min: 1,
            max: 999,
            actual: 0,
        };
        assert!(err.to_string().contains("qty"));
        assert!(err.to_string().contains("999"));
    }

    #[test]
    fn state_error_carries_both_states() {
        let err = StateError::InvalidTransition {
            from: "DELIVERED".to_string(),
            to: "PAID".to_string(),
            reason: "DELIVERED is terminal".to_string(),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("DELIVERED"));
        assert!(rendered.contains("PAID"));
    }

    #[test]
    fn petstore_error_wraps_validation() {
        let err: PetstoreError = ValidationError::Empty { field: "name" }.into();
        assert!(matches!(err, PetstoreError::Validation(_)));
        assert!(err.to_string().contains("name"));
    }
}
