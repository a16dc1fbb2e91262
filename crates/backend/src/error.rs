//! Errors raised by the remote data client

use thiserror::Error;

/// Identity operation rejected or failed
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Invalid login credentials")]
    InvalidCredentials,

    #[error("User already registered: {0}")]
    AlreadyRegistered(String),

    #[error("No active session")]
    NoSession,

    #[error("Identity provider rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Identity provider request error: {0}")]
    Request(String),

    #[error("Identity provider response error: {0}")]
    Response(String),

    #[error("Session persistence error: {0}")]
    Persistence(#[from] KeyValueError),
}

/// Table operation rejected or failed
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("No row in {relation} matches {key}")]
    NotFound { relation: String, key: String },

    #[error("Store rejected the request ({code}): {message}")]
    Rejected { code: String, message: String },

    #[error("Store request error: {0}")]
    Request(String),

    #[error("Store response error: {0}")]
    Response(String),

    #[error("Row decoding error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Object storage write failed
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage rejected the upload ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Storage request error: {0}")]
    Request(String),
}

/// Local key-value persistence failed
#[derive(Error, Debug)]
pub enum KeyValueError {
    #[error("Key-value store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Key-value store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Backend could not be built from configuration
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Backend configuration error: {0}")]
    Configuration(String),
}

impl From<ProviderError> for league_common::Error {
    fn from(err: ProviderError) -> Self {
        league_common::Error::Provider(err.to_string())
    }
}

impl From<StoreError> for league_common::Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => league_common::Error::NotFound(err.to_string()),
            other => league_common::Error::Store(other.to_string()),
        }
    }
}

impl From<StorageError> for league_common::Error {
    fn from(err: StorageError) -> Self {
        league_common::Error::Upload(err.to_string())
    }
}

impl From<BackendError> for league_common::Error {
    fn from(err: BackendError) -> Self {
        league_common::Error::Configuration(err.to_string())
    }
}
