//! Session and identity types issued by the identity provider

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ProviderError;

/// Local storage key holding the persisted session
pub const AUTH_TOKEN_KEY: &str = "supabase.auth.token";

/// User record owned by the identity provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Credential bundle for a signed-in user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub expires_in: i64,
    /// Unix timestamp (seconds)
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// JWT claims carried by a Supabase access token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (user ID)
    pub sub: String,
    pub email: Option<String>,
    pub exp: u64,
    #[serde(default)]
    pub iat: Option<u64>,
    #[serde(default)]
    pub aud: Option<String>,
    /// Provider role ("authenticated"), not the league role
    #[serde(default)]
    pub role: Option<String>,
}

impl Session {
    /// Expiry as a timestamp, when the provider sent one
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|exp| exp <= now)
    }

    /// Decode the access token claims without verifying the signature.
    ///
    /// The client never holds the project's JWT secret; claims read here are
    /// informational and must not be used for authorization.
    pub fn claims(&self) -> Result<SessionClaims, ProviderError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;

        decode::<SessionClaims>(
            &self.access_token,
            &DecodingKey::from_secret(&[]),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!(error = %e, "Access token is not a decodable JWT");
            ProviderError::Response(format!("Malformed access token: {}", e))
        })
    }
}

/// Kind of session change reported by the identity provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthChangeEvent {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
    PasswordRecovery,
}

impl std::fmt::Display for AuthChangeEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InitialSession => write!(f, "INITIAL_SESSION"),
            Self::SignedIn => write!(f, "SIGNED_IN"),
            Self::SignedOut => write!(f, "SIGNED_OUT"),
            Self::TokenRefreshed => write!(f, "TOKEN_REFRESHED"),
            Self::UserUpdated => write!(f, "USER_UPDATED"),
            Self::PasswordRecovery => write!(f, "PASSWORD_RECOVERY"),
        }
    }
}

/// Payload delivered to session-change subscribers
#[derive(Debug, Clone, PartialEq)]
pub struct AuthStateChange {
    pub event: AuthChangeEvent,
    pub session: Option<Session>,
}

impl AuthStateChange {
    pub fn new(event: AuthChangeEvent, session: Option<Session>) -> Self {
        Self { event, session }
    }

    pub fn user(&self) -> Option<&AuthUser> {
        self.session.as_ref().map(|s| &s.user)
    }
}

/// Result of account creation.
///
/// `session` is `None` when the project requires email confirmation.
#[derive(Debug, Clone, PartialEq)]
pub struct SignUpResponse {
    pub user: AuthUser,
    pub session: Option<Session>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn session_with_token(token: String, expires_at: Option<i64>) -> Session {
        Session {
            access_token: token,
            refresh_token: "refresh".to_string(),
            token_type: "bearer".to_string(),
            expires_in: 3600,
            expires_at,
            user: AuthUser {
                id: Uuid::new_v4(),
                email: Some("fan@example.com".to_string()),
                created_at: None,
            },
        }
    }

    #[test]
    fn test_claims_decoded_without_secret() {
        let claims = SessionClaims {
            sub: Uuid::new_v4().to_string(),
            email: Some("fan@example.com".to_string()),
            exp: 1_900_000_000,
            iat: Some(1_800_000_000),
            aud: Some("authenticated".to_string()),
            role: Some("authenticated".to_string()),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"project-secret"),
        )
        .unwrap();

        let session = session_with_token(token, None);
        assert_eq!(session.claims().unwrap(), claims);
    }

    #[test]
    fn test_malformed_token_is_response_error() {
        let session = session_with_token("not-a-jwt".to_string(), None);
        assert!(matches!(
            session.claims(),
            Err(ProviderError::Response(_))
        ));
    }

    #[test]
    fn test_expiry() {
        let now = Utc::now();
        let expired = session_with_token("t".to_string(), Some(now.timestamp() - 10));
        let fresh = session_with_token("t".to_string(), Some(now.timestamp() + 3600));
        let unknown = session_with_token("t".to_string(), None);

        assert!(expired.is_expired(now));
        assert!(!fresh.is_expired(now));
        assert!(!unknown.is_expired(now));
    }

    #[test]
    fn test_session_deserializes_gotrue_payload() {
        let user_id = Uuid::new_v4();
        let payload = serde_json::json!({
            "access_token": "abc",
            "token_type": "bearer",
            "expires_in": 3600,
            "expires_at": 1_900_000_000,
            "refresh_token": "def",
            "user": {
                "id": user_id,
                "aud": "authenticated",
                "email": "fan@example.com",
                "created_at": "2024-11-10T12:00:00Z"
            }
        });

        let session: Session = serde_json::from_value(payload).unwrap();
        assert_eq!(session.user.id, user_id);
        assert_eq!(session.user.email.as_deref(), Some("fan@example.com"));
        assert_eq!(session.expires_at, Some(1_900_000_000));
    }

    #[test]
    fn test_event_serialization_matches_provider_names() {
        let json = serde_json::to_string(&AuthChangeEvent::TokenRefreshed).unwrap();
        assert_eq!(json, "\"TOKEN_REFRESHED\"");
        assert_eq!(AuthChangeEvent::SignedOut.to_string(), "SIGNED_OUT");
    }
}
