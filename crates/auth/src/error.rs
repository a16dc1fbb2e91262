//! Session context errors

use league_backend::{ProviderError, StoreError};
use thiserror::Error;
use uuid::Uuid;

/// Session context error
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Authentication error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Profile lookup failed: {0}")]
    Store(#[from] StoreError),

    /// The identity exists but its profile row could not be written
    #[error("Account {user_id} was created but its profile could not be provisioned: {source}")]
    ProfileProvisioning {
        user_id: Uuid,
        #[source]
        source: StoreError,
    },

    #[error("Malformed profile row: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<AuthError> for league_common::Error {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Provider(e) => league_common::Error::Provider(e.to_string()),
            AuthError::ProfileProvisioning { .. } => {
                league_common::Error::ConsistencyGap(err.to_string())
            }
            AuthError::Store(e) => e.into(),
            AuthError::Decode(e) => league_common::Error::Serialization(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_alert() {
        let err: league_common::Error = AuthError::Provider(ProviderError::InvalidCredentials).into();
        let alert = err.alert().unwrap();
        assert_eq!(alert.title, "Authentication failed");
        assert_eq!(alert.message, "Authentication error: Invalid login credentials");
    }

    #[test]
    fn test_provisioning_failure_is_consistency_gap() {
        let user_id = Uuid::new_v4();
        let err: league_common::Error = AuthError::ProfileProvisioning {
            user_id,
            source: StoreError::Request("connection reset".to_string()),
        }
        .into();
        assert_eq!(err.error_code(), "CONSISTENCY_GAP");
        assert!(err.to_string().contains(&user_id.to_string()));
    }
}
