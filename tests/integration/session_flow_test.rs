//! Session lifecycle integration tests
//!
//! Sign-in, registration, sign-out and session restore through the
//! composed application, observed via the published session state and the
//! navigator.

mod common;

use std::sync::Arc;

use league_auth::{AuthError, Role, ScreenTree, PROFILES};
use league_backend::{
    FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, ProviderError, RecordedCall, TableOp,
    AUTH_TOKEN_KEY,
};
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

use crate::common::{TestApp, ADMIN_EMAIL, FOLLOWER_EMAIL, PASSWORD};

#[test_log::test(tokio::test)]
async fn test_invalid_credentials_leave_user_unchanged() {
    let t = TestApp::new().await;
    t.seed_admin();

    let err = assert_err!(t.app.session.sign_in(ADMIN_EMAIL, "wrong").await);
    assert!(matches!(
        err,
        AuthError::Provider(ProviderError::InvalidCredentials)
    ));

    let snapshot = t.app.session.snapshot();
    assert!(snapshot.user.is_none());
    assert!(!snapshot.loading);

    let alert = league_common::Error::from(err).alert().unwrap();
    assert_eq!(alert.title, "Authentication failed");
}

#[test_log::test(tokio::test)]
async fn test_admin_sign_in_then_sign_out() {
    let t = TestApp::new().await;
    let mut navigator = t.app.navigator();
    assert_eq!(navigator.current(), ScreenTree::Auth);

    let snapshot = t.sign_in_admin().await;
    assert!(snapshot.is_admin());
    assert_eq!(navigator.changed().await, Some(ScreenTree::Admin));
    assert!(assert_ok!(t.mock.token_store().get(AUTH_TOKEN_KEY).await).is_some());

    assert_ok!(t.app.session.sign_out().await);
    let snapshot = t.wait_for(|s| s.user.is_none()).await;
    assert!(snapshot.session.is_none());
    assert!(!snapshot.is_admin());
    assert_eq!(navigator.changed().await, Some(ScreenTree::Auth));

    // Cached token key is gone
    assert!(assert_ok!(t.mock.token_store().get(AUTH_TOKEN_KEY).await).is_none());
    let calls = t.mock.recorded_calls();
    assert!(calls.contains(&RecordedCall::SignOut));
    assert!(calls.contains(&RecordedCall::RefreshSession));

    t.app.shutdown().await;
}

#[test_log::test(tokio::test)]
async fn test_sign_out_failure_keeps_session() {
    let t = TestApp::new().await;
    t.sign_in_admin().await;
    t.mock.behavior().fail_sign_out("service unavailable");

    let err = assert_err!(t.app.session.sign_out().await);
    assert!(matches!(err, AuthError::Provider(_)));
    assert!(t.app.session.snapshot().is_signed_in());
    assert!(assert_ok!(t.mock.token_store().get(AUTH_TOKEN_KEY).await).is_some());
}

#[test_log::test(tokio::test)]
async fn test_sign_up_provisions_follower_profile() {
    let t = TestApp::new().await;

    let user = assert_ok!(t.app.session.sign_up(FOLLOWER_EMAIL, PASSWORD).await);

    let profiles = t.mock.rows(PROFILES);
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0]["id"], json!(user.id.to_string()));
    assert_eq!(profiles[0]["role"], json!("follower"));

    let snapshot = t.wait_for(|s| s.role.is_some()).await;
    assert_eq!(snapshot.role, Some(Role::Follower));
    assert_eq!(t.app.navigator().current(), ScreenTree::Main);
}

#[test_log::test(tokio::test)]
async fn test_profile_failure_is_reported_and_retryable() {
    let t = TestApp::new().await;
    t.mock
        .behavior()
        .fail_table(PROFILES, TableOp::Upsert, "permission denied for table profiles");

    let err = assert_err!(t.app.session.sign_up(FOLLOWER_EMAIL, PASSWORD).await);
    let AuthError::ProfileProvisioning { user_id, .. } = err else {
        panic!("expected a profile provisioning error, got {err:?}");
    };
    assert!(t.mock.rows(PROFILES).is_empty());

    let common_err = league_common::Error::from(AuthError::ProfileProvisioning {
        user_id,
        source: league_backend::StoreError::Request("x".to_string()),
    });
    assert_eq!(common_err.error_code(), "CONSISTENCY_GAP");

    // Retry once the store accepts writes again
    t.mock.behavior().reset();
    assert_ok!(
        t.app
            .session
            .provision_profile(user_id, Some(FOLLOWER_EMAIL))
            .await
    );
    assert_eq!(t.mock.rows(PROFILES).len(), 1);
    // A second retry does not duplicate the row
    assert_ok!(t.app.session.provision_profile(user_id, None).await);
    assert_eq!(t.mock.rows(PROFILES).len(), 1);
}

#[test_log::test(tokio::test)]
async fn test_refresh_role_after_promotion() {
    let t = TestApp::new().await;
    let user = t.seed_user(FOLLOWER_EMAIL, Role::Follower);
    assert_ok!(t.app.session.sign_in(FOLLOWER_EMAIL, PASSWORD).await);
    t.wait_for(|s| s.role == Some(Role::Follower)).await;

    // An admin promotes the account
    assert_ok!(
        t.app
            .users
            .update(
                user.id,
                league_roster::ProfilePatch {
                    role: Some(Role::Admin),
                    ..Default::default()
                },
            )
            .await
    );

    assert_eq!(assert_ok!(t.app.session.refresh_role(user.id).await), Role::Admin);
    assert!(t.app.session.snapshot().is_admin());
    assert_eq!(t.app.navigator().current(), ScreenTree::Admin);
}

#[test_log::test(tokio::test)]
async fn test_session_restored_from_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");

    let first = TestApp::with_token_store(Arc::new(FileKeyValueStore::new(&path))).await;
    first.seed_admin();
    assert_ok!(first.app.session.sign_in(ADMIN_EMAIL, PASSWORD).await);
    first.app.shutdown().await;

    // A new process with an empty backend restores the session from disk and
    // provisions the missing profile just in time
    let second = TestApp::with_token_store(Arc::new(FileKeyValueStore::new(&path))).await;
    let snapshot = second.app.session.snapshot();
    assert!(!snapshot.loading);
    assert_eq!(
        snapshot.user.and_then(|u| u.email).as_deref(),
        Some(ADMIN_EMAIL)
    );
    assert_eq!(snapshot.role, Some(Role::Follower));
    assert_eq!(second.mock.rows(PROFILES).len(), 1);
}

#[test_log::test(tokio::test)]
async fn test_forgot_password_is_forwarded() {
    let t = TestApp::with_token_store(Arc::new(MemoryKeyValueStore::new())).await;
    assert_ok!(t.app.session.forgot_password(FOLLOWER_EMAIL).await);
    assert!(t.mock.recorded_calls().contains(&RecordedCall::ResetPassword {
        email: FOLLOWER_EMAIL.to_string(),
    }));
}
