//! Media errors

use league_backend::StorageError;
use league_common::StateError;
use league_roster::ResourceError;
use thiserror::Error;

use crate::capture::CaptureSource;

/// Device capture failed
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CaptureError {
    #[error("Permission to use the {0} was denied")]
    PermissionDenied(CaptureSource),

    #[error("Capture failed: {0}")]
    Device(String),
}

/// Local or remote image could not be read
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("Could not read {uri}: {source}")]
    Io {
        uri: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not download {uri}: {source}")]
    Http {
        uri: String,
        #[source]
        source: reqwest::Error,
    },
}

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("{0}")]
    Capture(String),

    #[error("Permission to use the {0} was denied")]
    PermissionDenied(CaptureSource),

    #[error("{0}")]
    Read(#[from] ReadError),

    #[error("{0}")]
    Storage(#[from] StorageError),

    /// Image stored but the entity row was not updated
    #[error("Image uploaded but entity {entity_id} was not updated: {source}")]
    Attach {
        entity_id: i64,
        #[source]
        source: ResourceError,
    },

    #[error("An upload for entity {entity_id} is already in progress")]
    Busy { entity_id: i64 },

    #[error("{0}")]
    InvalidTransition(#[from] StateError),
}

impl From<CaptureError> for UploadError {
    fn from(err: CaptureError) -> Self {
        match err {
            CaptureError::PermissionDenied(source) => UploadError::PermissionDenied(source),
            CaptureError::Device(message) => UploadError::Capture(message),
        }
    }
}

impl From<UploadError> for league_common::Error {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Attach {
                source: ResourceError::Cancelled,
                ..
            } => league_common::Error::Cancelled,
            other => league_common::Error::Upload(other.to_string()),
        }
    }
}
