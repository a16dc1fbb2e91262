//! Common error types and the alerts shown to users

use serde::Serialize;

/// Common result type
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the league client.
///
/// Each crate keeps its own error enum and converts into this one at the
/// screen boundary, where it becomes an [`Alert`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unexpected error: {0}")]
    Unexpected(#[from] anyhow::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Authentication error: {0}")]
    Provider(String),

    #[error("Data error: {0}")]
    Store(String),

    #[error("Upload error: {0}")]
    Upload(String),

    /// Identity exists but its profile row could not be written
    #[error("Account incomplete: {0}")]
    ConsistencyGap(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Operation cancelled")]
    Cancelled,
}

/// A message box shown to the user after a failed operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub title: String,
    pub message: String,
}

impl Alert {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

impl Error {
    /// Get the error code used in logs
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Unexpected(_) => "UNEXPECTED_ERROR",
            Error::Serialization(_) => "SERIALIZATION_ERROR",
            Error::Provider(_) => "PROVIDER_ERROR",
            Error::Store(_) => "STORE_ERROR",
            Error::Upload(_) => "UPLOAD_ERROR",
            Error::ConsistencyGap(_) => "CONSISTENCY_GAP",
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::NotFound(_) => "NOT_FOUND",
            Error::Configuration(_) => "CONFIGURATION_ERROR",
            Error::Cancelled => "CANCELLED",
        }
    }

    /// Build the alert for this error.
    ///
    /// Returns `None` for cancelled operations: the screen that issued them
    /// is gone and there is nobody to show the alert to.
    pub fn alert(&self) -> Option<Alert> {
        let title = match self {
            Error::Cancelled => return None,
            Error::Provider(_) => "Authentication failed",
            Error::Store(_) => "Could not save changes",
            Error::Upload(_) => "Upload failed",
            Error::ConsistencyGap(_) => "Account incomplete",
            Error::Validation(_) => "Missing fields",
            Error::NotFound(_) => "Not found",
            Error::Unexpected(_) | Error::Serialization(_) | Error::Configuration(_) => "Error",
        };

        tracing::debug!(code = self.error_code(), error = %self, "Raising alert");

        Some(Alert::new(title, self.to_string()))
    }
}
