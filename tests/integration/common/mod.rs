//! Common test utilities and fixtures for integration tests
//!
//! Every scenario runs against the in-memory backend:
//! - `TestApp` wires a `LeagueApp` over a shared `MockBackend`
//! - account fixtures for admins and followers
//! - a timed wait on the published session state

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use league_app::LeagueApp;
use league_auth::{Role, SessionSnapshot, PROFILES};
use league_backend::{AuthUser, Backend, KeyValueStore, MockBackend};
use league_common::Config;
use serde_json::json;

pub const ADMIN_EMAIL: &str = "admin@liga.com";
pub const FOLLOWER_EMAIL: &str = "hincha@liga.com";
pub const PASSWORD: &str = "secret-password";

const WAIT_TIMEOUT: Duration = Duration::from_secs(2);

/// Test application over a shared mock backend
pub struct TestApp {
    pub app: LeagueApp,
    pub mock: Arc<MockBackend>,
}

impl TestApp {
    /// Started application with no accounts
    pub async fn new() -> Self {
        Self::with_mock(Arc::new(MockBackend::new())).await
    }

    pub async fn with_token_store(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_mock(Arc::new(MockBackend::with_token_store(store))).await
    }

    pub async fn with_mock(mock: Arc<MockBackend>) -> Self {
        let app = LeagueApp::with_backend(Config::mock(), Backend::from_mock(mock.clone()));
        app.start().await;
        Self { app, mock }
    }

    /// Account whose profile row carries `role`
    pub fn seed_user(&self, email: &str, role: Role) -> AuthUser {
        let user = self.mock.seed_account(email, PASSWORD);
        self.mock.seed_rows(
            PROFILES,
            vec![json!({
                "id": user.id.to_string(),
                "email": email,
                "role": role.to_string(),
            })],
        );
        user
    }

    pub fn seed_admin(&self) -> AuthUser {
        self.seed_user(ADMIN_EMAIL, Role::Admin)
    }

    /// Wait until the published session state satisfies `condition`
    pub async fn wait_for<F>(&self, condition: F) -> SessionSnapshot
    where
        F: FnMut(&SessionSnapshot) -> bool,
    {
        let mut rx = self.app.session.watch();
        let snapshot = tokio::time::timeout(WAIT_TIMEOUT, rx.wait_for(condition))
            .await
            .expect("timed out waiting for session state")
            .expect("session manager dropped")
            .clone();
        snapshot
    }

    pub async fn sign_in_admin(&self) -> SessionSnapshot {
        let admin = self.seed_admin();
        self.app
            .session
            .sign_in(ADMIN_EMAIL, PASSWORD)
            .await
            .expect("admin sign-in");
        self.wait_for(|s| s.user.as_ref().is_some_and(|u| u.id == admin.id) && s.role.is_some())
            .await
    }
}
