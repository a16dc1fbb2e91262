//! Session context
//!
//! `SessionManager` mirrors the identity provider's session into a `watch`
//! channel and resolves the league role for every signed-in user. It is
//! constructed explicitly with its collaborators, started with `init()` and
//! stopped with `teardown()`.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use league_backend::{
    AuthStateChange, AuthUser, Backend, IdentityProvider, KeyValueStore, Session, TableStore,
    AUTH_TOKEN_KEY,
};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::AuthError;
use crate::profiles;
use crate::types::Role;

/// Immutable copy of the session state, published on every change
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub user: Option<AuthUser>,
    pub session: Option<Session>,
    pub role: Option<Role>,
    pub loading: bool,
}

impl SessionSnapshot {
    pub fn is_admin(&self) -> bool {
        self.role.is_some_and(|r| r.is_admin())
    }

    pub fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }
}

/// Identity/session context
pub struct SessionManager {
    identity: Arc<dyn IdentityProvider>,
    tables: Arc<dyn TableStore>,
    token_store: Arc<dyn KeyValueStore>,
    state: watch::Sender<SessionSnapshot>,
    cancel: CancellationToken,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    pub fn new(backend: &Backend) -> Arc<Self> {
        let (state, _) = watch::channel(SessionSnapshot {
            loading: true,
            ..SessionSnapshot::default()
        });

        Arc::new(Self {
            identity: backend.identity.clone(),
            tables: backend.tables.clone(),
            token_store: backend.token_store.clone(),
            state,
            cancel: CancellationToken::new(),
            listener: Mutex::new(None),
        })
    }

    /// Subscribe to session changes, apply the restored session and start
    /// the listener. Calling it again is a no-op.
    pub async fn init(self: &Arc<Self>) {
        if self.lock_listener().is_some() {
            tracing::warn!("Session manager already initialised");
            return;
        }

        // Subscribe before reading the initial session so no change is missed
        let events = self.identity.subscribe();

        let initial = self.identity.initial_session().await;
        match &initial {
            Some(session) => tracing::info!(user_id = %session.user.id, "Restored session"),
            None => tracing::info!("No session to restore"),
        }
        self.apply_session(initial).await;
        self.state.send_modify(|s| s.loading = false);

        let handle = tokio::spawn(listen(
            Arc::downgrade(self),
            events,
            self.cancel.clone(),
        ));
        *self.lock_listener() = Some(handle);
    }

    /// Stop the listener. The published state is left as it was.
    pub async fn teardown(&self) {
        self.cancel.cancel();
        let handle = self.lock_listener().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Session listener ended abnormally");
            }
        }
        tracing::debug!("Session manager torn down");
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    /// Password sign-in. The listener publishes the user once the provider
    /// reports the new session.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        self.set_loading(true);
        let result = self.identity.sign_in_with_password(email, password).await;
        self.set_loading(false);

        match result {
            Ok(session) => {
                tracing::info!(user_id = %session.user.id, "Signed in");
                Ok(session)
            }
            Err(e) => {
                tracing::error!(error = %e, "Sign-in failed");
                Err(e.into())
            }
        }
    }

    /// Create an account and provision its `follower` profile
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        self.set_loading(true);
        let result = self.create_account(email, password).await;
        self.set_loading(false);
        result
    }

    async fn create_account(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        let response = self
            .identity
            .sign_up(email, password)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Sign-up failed");
                e
            })?;
        let user = response.user;

        self.provision_profile(user.id, user.email.as_deref().or(Some(email)))
            .await?;

        tracing::info!(user_id = %user.id, "Account registered");
        Ok(user)
    }

    /// Provision the `follower` profile for an identity. Safe to retry after
    /// `AuthError::ProfileProvisioning`.
    pub async fn provision_profile(
        &self,
        user_id: Uuid,
        email: Option<&str>,
    ) -> Result<(), AuthError> {
        profiles::provision_profile(self.tables.as_ref(), user_id, email, Role::Follower)
            .await
            .map_err(|source| {
                tracing::error!(
                    error = %source,
                    user_id = %user_id,
                    "Identity created without a profile"
                );
                AuthError::ProfileProvisioning { user_id, source }
            })
    }

    /// Sign out and clear all local session state
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.set_loading(true);
        let result = self.end_session().await;
        self.set_loading(false);
        result
    }

    async fn end_session(&self) -> Result<(), AuthError> {
        let user_id = self.snapshot().user.map(|u| u.id);

        // 1. Provider sign-out
        if let Err(e) = self.identity.sign_out().await {
            tracing::error!(error = %e, "Provider sign-out failed");
            return Err(e.into());
        }

        // 2. Cached token
        if let Err(e) = self.token_store.remove(AUTH_TOKEN_KEY).await {
            tracing::warn!(error = %e, "Failed to remove cached auth token");
        }

        // 3. Local state
        self.state.send_modify(|s| {
            s.user = None;
            s.session = None;
            s.role = None;
        });

        // 4. Provider state refresh; nothing is left to refresh
        if let Err(e) = self.identity.refresh_session().await {
            tracing::debug!(error = %e, "Session refresh after sign-out rejected");
        }

        match user_id {
            Some(user_id) => tracing::info!(user_id = %user_id, "Signed out"),
            None => tracing::info!("Signed out"),
        }
        Ok(())
    }

    pub async fn forgot_password(&self, email: &str) -> Result<(), AuthError> {
        self.set_loading(true);
        let result = self.identity.reset_password_for_email(email).await;
        self.set_loading(false);

        result.map_err(|e| {
            tracing::error!(error = %e, "Password reset request failed");
            e.into()
        })
    }

    /// Read the role of `user_id`. When it is the current user the snapshot
    /// is updated too.
    pub async fn refresh_role(&self, user_id: Uuid) -> Result<Role, AuthError> {
        let email = self
            .snapshot()
            .user
            .filter(|u| u.id == user_id)
            .and_then(|u| u.email);

        let role = profiles::resolve_role(self.tables.as_ref(), user_id, email.as_deref()).await?;

        self.state.send_if_modified(|s| {
            let current = s.user.as_ref().is_some_and(|u| u.id == user_id);
            if current && s.role != Some(role) {
                s.role = Some(role);
                true
            } else {
                false
            }
        });
        Ok(role)
    }

    /// Replace user, session and role together
    async fn apply_session(&self, session: Option<Session>) {
        let Some(session) = session else {
            self.state.send_modify(|s| {
                s.user = None;
                s.session = None;
                s.role = None;
            });
            return;
        };

        let user = session.user.clone();
        let role = match profiles::resolve_role(
            self.tables.as_ref(),
            user.id,
            user.email.as_deref(),
        )
        .await
        {
            Ok(role) => Some(role),
            Err(e) => {
                tracing::error!(error = %e, user_id = %user.id, "Failed to resolve role");
                None
            }
        };

        self.state.send_modify(|s| {
            s.user = Some(user);
            s.session = Some(session);
            s.role = role;
        });
    }

    async fn handle_change(&self, change: AuthStateChange) {
        tracing::debug!(event = %change.event, "Session change received");
        self.apply_session(change.session).await;
    }

    fn set_loading(&self, loading: bool) {
        self.state.send_if_modified(|s| {
            let changed = s.loading != loading;
            s.loading = loading;
            changed
        });
    }

    fn lock_listener(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.listener.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn listen(
    manager: Weak<SessionManager>,
    mut events: tokio::sync::broadcast::Receiver<AuthStateChange>,
    cancel: CancellationToken,
) {
    loop {
        let received = tokio::select! {
            _ = cancel.cancelled() => break,
            received = events.recv() => received,
        };

        match received {
            Ok(change) => {
                let Some(manager) = manager.upgrade() else {
                    break;
                };
                manager.handle_change(change).await;
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Session listener lagged behind provider events");
            }
            Err(RecvError::Closed) => break,
        }
    }
    tracing::debug!("Session listener stopped");
}
