//! GoTrue identity calls

use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::broadcast;

use super::SupabaseClient;
use crate::error::ProviderError;
use crate::session::{
    AuthChangeEvent, AuthStateChange, AuthUser, Session, SignUpResponse, AUTH_TOKEN_KEY,
};
use crate::IdentityProvider;

/// GoTrue error body. Older servers send `error`/`error_description`,
/// newer ones `code`/`error_code`/`msg`.
#[derive(Debug, Default, Deserialize)]
struct GoTrueError {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

fn map_auth_error(status: u16, body: &str) -> ProviderError {
    let parsed: GoTrueError = serde_json::from_str(body).unwrap_or_default();

    let message = parsed
        .error_description
        .or(parsed.msg)
        .or(parsed.message)
        .or_else(|| parsed.error.clone())
        .unwrap_or_else(|| body.to_string());
    let code = parsed.error_code.or(parsed.error).unwrap_or_default();

    match code.as_str() {
        "invalid_grant" | "invalid_credentials" => ProviderError::InvalidCredentials,
        "user_already_exists" | "email_exists" => ProviderError::AlreadyRegistered(message),
        _ if message.contains("already registered") => ProviderError::AlreadyRegistered(message),
        _ => ProviderError::Rejected { status, message },
    }
}

/// Sign-up returns a session when email confirmation is off, else the user
fn parse_sign_up(body: Value) -> Result<SignUpResponse, ProviderError> {
    if body.get("access_token").is_some() {
        let session: Session = serde_json::from_value(body)
            .map_err(|e| ProviderError::Response(format!("Failed to parse session: {}", e)))?;
        return Ok(SignUpResponse {
            user: session.user.clone(),
            session: Some(session),
        });
    }

    let user_value = match body.get("user") {
        Some(user) => user.clone(),
        None => body,
    };
    let user: AuthUser = serde_json::from_value(user_value)
        .map_err(|e| ProviderError::Response(format!("Failed to parse user: {}", e)))?;

    Ok(SignUpResponse {
        user,
        session: None,
    })
}

fn parse_session(body: Option<Value>) -> Result<Session, ProviderError> {
    let body = body.ok_or_else(|| ProviderError::Response("Empty session response".to_string()))?;
    serde_json::from_value(body)
        .map_err(|e| ProviderError::Response(format!("Failed to parse session: {}", e)))
}

impl SupabaseClient {
    async fn auth_request(
        &self,
        path: &str,
        query: &[(&str, &str)],
        body: Value,
        bearer: Option<&str>,
    ) -> Result<Option<Value>, ProviderError> {
        let mut request = self
            .http
            .post(self.url(path))
            .query(query)
            .header("apikey", &self.anon_key)
            .json(&body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::Response(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            tracing::debug!(path, status = %status, "GoTrue request rejected");
            return Err(map_auth_error(status.as_u16(), &text));
        }

        if text.trim().is_empty() {
            return Ok(None);
        }

        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| ProviderError::Response(format!("Failed to parse response: {}", e)))
    }

    async fn restore_persisted_session(&self) -> Option<Session> {
        let stored = match self.token_store.get(AUTH_TOKEN_KEY).await {
            Ok(stored) => stored?,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read persisted session");
                return None;
            }
        };

        match serde_json::from_str::<Session>(&stored) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable persisted session");
                if let Err(e) = self.token_store.remove(AUTH_TOKEN_KEY).await {
                    tracing::warn!(error = %e, "Failed to remove unreadable session");
                }
                None
            }
        }
    }
}

#[async_trait::async_trait]
impl IdentityProvider for SupabaseClient {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, ProviderError> {
        let body = self
            .auth_request(
                "/auth/v1/token",
                &[("grant_type", "password")],
                json!({ "email": email, "password": password }),
                None,
            )
            .await?;
        let session = parse_session(body)?;

        tracing::info!(user_id = %session.user.id, "Signed in with password");
        self.store_session(Some(session.clone()), AuthChangeEvent::SignedIn)
            .await;
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpResponse, ProviderError> {
        let body = self
            .auth_request(
                "/auth/v1/signup",
                &[],
                json!({ "email": email, "password": password }),
                None,
            )
            .await?
            .ok_or_else(|| ProviderError::Response("Empty sign-up response".to_string()))?;
        let response = parse_sign_up(body)?;

        tracing::info!(
            user_id = %response.user.id,
            confirmed = response.session.is_some(),
            "Account created"
        );
        if let Some(session) = &response.session {
            self.store_session(Some(session.clone()), AuthChangeEvent::SignedIn)
                .await;
        }
        Ok(response)
    }

    async fn create_identity(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthUser, ProviderError> {
        let body = self
            .auth_request(
                "/auth/v1/signup",
                &[],
                json!({ "email": email, "password": password }),
                None,
            )
            .await?
            .ok_or_else(|| ProviderError::Response("Empty sign-up response".to_string()))?;

        let user = parse_sign_up(body)?.user;
        tracing::info!(user_id = %user.id, "Identity created on behalf of another user");
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        if let Some(session) = self.current_session() {
            self.auth_request("/auth/v1/logout", &[], json!({}), Some(&session.access_token))
                .await?;
        }

        self.store_session(None, AuthChangeEvent::SignedOut).await;
        Ok(())
    }

    async fn reset_password_for_email(&self, email: &str) -> Result<(), ProviderError> {
        self.auth_request("/auth/v1/recover", &[], json!({ "email": email }), None)
            .await?;
        tracing::info!("Password reset email requested");
        Ok(())
    }

    async fn refresh_session(&self) -> Result<Session, ProviderError> {
        let current = self.current_session().ok_or(ProviderError::NoSession)?;

        let body = self
            .auth_request(
                "/auth/v1/token",
                &[("grant_type", "refresh_token")],
                json!({ "refresh_token": current.refresh_token }),
                None,
            )
            .await?;
        let session = parse_session(body)?;

        self.store_session(Some(session.clone()), AuthChangeEvent::TokenRefreshed)
            .await;
        Ok(session)
    }

    async fn initial_session(&self) -> Option<Session> {
        if let Some(session) = self.current_session() {
            return Some(session);
        }

        let restored = self.restore_persisted_session().await?;
        *self
            .session
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(restored.clone());

        if !restored.is_expired(chrono::Utc::now()) {
            tracing::info!(user_id = %restored.user.id, "Restored persisted session");
            return Some(restored);
        }

        match self.refresh_session().await {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!(error = %e, "Persisted session expired and could not be refreshed");
                self.store_session(None, AuthChangeEvent::SignedOut).await;
                None
            }
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthStateChange> {
        self.events.subscribe()
    }
}
