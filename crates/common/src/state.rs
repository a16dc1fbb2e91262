//! Common state machine error types
//!
//! Shared across all crates that implement state machines.

use thiserror::Error;

/// Errors that can occur during state transitions
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StateError {
    #[error("Invalid transition: cannot leave {from} via {event}")]
    InvalidTransition { from: String, event: String },

    #[error("Guard condition failed: {0}")]
    GuardFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_error_display() {
        let err = StateError::InvalidTransition {
            from: "uploading".to_string(),
            event: "start_capture".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid transition: cannot leave uploading via start_capture"
        );

        let err = StateError::GuardFailed("no image captured".to_string());
        assert_eq!(err.to_string(), "Guard condition failed: no image captured");
    }
}
