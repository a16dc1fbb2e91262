//! Supabase HTTP client
//!
//! One client implements all three backend contracts, the way the Supabase
//! SDK does: identity calls against GoTrue (`/auth/v1`), table calls against
//! PostgREST (`/rest/v1`) and uploads against Storage (`/storage/v1`). Table
//! and storage calls carry the current session's access token so row-level
//! security sees the signed-in user; without a session the anon key is used.

mod auth;
mod rest;
mod storage;

use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::broadcast;

use crate::session::{AuthChangeEvent, AuthStateChange, Session, AUTH_TOKEN_KEY};
use crate::token_store::KeyValueStore;
use crate::EVENT_CHANNEL_CAPACITY;

pub struct SupabaseClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    session: RwLock<Option<Session>>,
    events: broadcast::Sender<AuthStateChange>,
    token_store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("base_url", &self.base_url)
            .field("anon_key", &"[REDACTED]")
            .finish()
    }
}

impl SupabaseClient {
    pub fn new(base_url: &str, anon_key: &str, token_store: Arc<dyn KeyValueStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            session: RwLock::new(None),
            events,
            token_store,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn current_session(&self) -> Option<Session> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Token for data requests: the user's access token, else the anon key
    fn bearer(&self) -> String {
        self.current_session()
            .map(|s| s.access_token)
            .unwrap_or_else(|| self.anon_key.clone())
    }

    /// Replace the held session, mirror it to local storage, notify
    /// subscribers.
    async fn store_session(&self, session: Option<Session>, event: AuthChangeEvent) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = session.clone();

        let persisted = match &session {
            Some(s) => match serde_json::to_string(s) {
                Ok(json) => self.token_store.set(AUTH_TOKEN_KEY, json).await,
                Err(e) => Err(e.into()),
            },
            None => self.token_store.remove(AUTH_TOKEN_KEY).await,
        };
        if let Err(e) = persisted {
            tracing::error!(error = %e, "Failed to persist auth session");
        }

        tracing::debug!(event = %event, "Auth state changed");
        // No subscribers is fine
        let _ = self.events.send(AuthStateChange::new(event, session));
    }
}
