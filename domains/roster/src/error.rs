//! Roster errors

use league_backend::{ProviderError, StoreError};
use thiserror::Error;
use uuid::Uuid;

/// Resource hook error
#[derive(Error, Debug)]
pub enum ResourceError {
    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("Malformed {relation} row: {source}")]
    Decode {
        relation: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Missing fields: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("No {relation} row with id {id}")]
    NotFound { relation: &'static str, id: String },

    /// The hook was unmounted while the request was pending
    #[error("Request cancelled")]
    Cancelled,
}

/// Account provisioning error
#[derive(Error, Debug)]
pub enum AccountError {
    #[error("Missing fields: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Could not create the account: {0}")]
    Identity(#[from] ProviderError),

    /// Identity created, profile row missing
    #[error("Account {user_id} was created but its profile could not be written: {source}")]
    Profile {
        user_id: Uuid,
        #[source]
        source: StoreError,
    },

    /// Identity and profile created, player or team row missing
    #[error("Account {user_id} was created but its {relation} row could not be written: {source}")]
    Record {
        user_id: Uuid,
        relation: &'static str,
        #[source]
        source: ResourceError,
    },
}

impl From<ResourceError> for league_common::Error {
    fn from(err: ResourceError) -> Self {
        match err {
            ResourceError::Store(e) => e.into(),
            ResourceError::Decode { source, .. } => league_common::Error::Serialization(source),
            ResourceError::Validation(e) => league_common::Error::Validation(e.to_string()),
            ResourceError::NotFound { .. } => league_common::Error::NotFound(err.to_string()),
            ResourceError::Cancelled => league_common::Error::Cancelled,
        }
    }
}

impl From<AccountError> for league_common::Error {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Validation(e) => league_common::Error::Validation(e.to_string()),
            AccountError::Identity(e) => e.into(),
            AccountError::Profile { .. } | AccountError::Record { .. } => {
                league_common::Error::ConsistencyGap(err.to_string())
            }
        }
    }
}
