//! League Remote Data Client
//!
//! The boundary between the league client and its hosted backend:
//! - `IdentityProvider`: sign-in, sign-up, sign-out, password reset,
//!   session refresh and session-change notifications
//! - `TableStore`: select/insert/upsert/update/delete against named relations
//! - `ObjectStorage`: byte uploads to buckets and public URL resolution
//! - `KeyValueStore`: device-local persistence of the auth token
//!
//! `SupabaseClient` talks to a Supabase project over HTTP; `MockBackend`
//! keeps everything in memory with programmable failures for tests and
//! local development.

pub mod error;
pub mod mock;
pub mod query;
pub mod session;
pub mod supabase;
pub mod token_store;

use std::sync::Arc;

use league_common::{BackendProvider, Config};
use serde_json::Value;
use tokio::sync::broadcast;

pub use error::{BackendError, KeyValueError, ProviderError, StorageError, StoreError};
pub use mock::{MockBackend, MockBehavior, RecordedCall, StoredObject, TableOp};
pub use query::{Filter, Order, Query};
pub use session::{
    AuthChangeEvent, AuthStateChange, AuthUser, Session, SessionClaims, SignUpResponse,
    AUTH_TOKEN_KEY,
};
pub use supabase::SupabaseClient;
pub use token_store::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};

/// Buffered session-change events per subscriber
pub const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Identity provider contract
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Password sign-in. On success the provider emits `SignedIn`.
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, ProviderError>;

    /// Create an account for the caller. Emits `SignedIn` when the provider
    /// returns a session right away.
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpResponse, ProviderError>;

    /// Create an account on someone else's behalf without touching the
    /// current session.
    async fn create_identity(&self, email: &str, password: &str)
        -> Result<AuthUser, ProviderError>;

    /// End the current session. Emits `SignedOut`.
    async fn sign_out(&self) -> Result<(), ProviderError>;

    async fn reset_password_for_email(&self, email: &str) -> Result<(), ProviderError>;

    /// Exchange the refresh token for a new session. Emits `TokenRefreshed`.
    async fn refresh_session(&self) -> Result<Session, ProviderError>;

    /// Session held at startup, restored from persistence when available
    async fn initial_session(&self) -> Option<Session>;

    /// Subscribe to session changes
    fn subscribe(&self) -> broadcast::Receiver<AuthStateChange>;
}

/// Relational store contract. Rows travel as JSON objects.
#[async_trait::async_trait]
pub trait TableStore: Send + Sync {
    async fn select(&self, relation: &str, query: &Query) -> Result<Vec<Value>, StoreError>;

    /// Insert rows and return them as stored
    async fn insert(&self, relation: &str, rows: Vec<Value>) -> Result<Vec<Value>, StoreError>;

    /// Insert rows, resolving conflicts on `on_conflict`.
    ///
    /// With `ignore_duplicates` existing rows are left untouched and only
    /// newly inserted rows are returned; otherwise existing rows are merged.
    async fn upsert(
        &self,
        relation: &str,
        rows: Vec<Value>,
        on_conflict: &str,
        ignore_duplicates: bool,
    ) -> Result<Vec<Value>, StoreError>;

    /// Apply `fields` to matching rows and return the updated rows
    async fn update(
        &self,
        relation: &str,
        fields: Value,
        filter: &Filter,
    ) -> Result<Vec<Value>, StoreError>;

    /// Delete matching rows and return them
    async fn delete(&self, relation: &str, filter: &Filter) -> Result<Vec<Value>, StoreError>;
}

/// Object storage contract
#[async_trait::async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(
        &self,
        bucket: &str,
        filename: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError>;

    fn public_url(&self, bucket: &str, filename: &str) -> String;
}

/// The Remote Data Client handed to the rest of the application
#[derive(Clone)]
pub struct Backend {
    pub identity: Arc<dyn IdentityProvider>,
    pub tables: Arc<dyn TableStore>,
    pub storage: Arc<dyn ObjectStorage>,
    pub token_store: Arc<dyn KeyValueStore>,
}

impl Backend {
    /// Wrap a mock backend sharing one token store
    pub fn from_mock(mock: Arc<MockBackend>) -> Self {
        let token_store = mock.token_store();
        Self {
            identity: mock.clone(),
            tables: mock.clone(),
            storage: mock,
            token_store,
        }
    }
}

/// Factory for creating the Remote Data Client
pub struct BackendFactory;

impl BackendFactory {
    /// Create a backend based on configuration.
    pub fn create(config: &Config) -> Result<Backend, BackendError> {
        let token_store: Arc<dyn KeyValueStore> = match &config.token_store_path {
            Some(path) => Arc::new(FileKeyValueStore::new(path)),
            None => Arc::new(MemoryKeyValueStore::new()),
        };

        match config.backend_provider {
            BackendProvider::Supabase => {
                tracing::info!(url = %config.supabase_url, "Creating Supabase backend");
                if config.supabase_url.is_empty() || config.supabase_anon_key.is_empty() {
                    return Err(BackendError::Configuration(
                        "SUPABASE_URL and SUPABASE_ANON_KEY are required for the supabase provider"
                            .to_string(),
                    ));
                }
                let client = Arc::new(SupabaseClient::new(
                    &config.supabase_url,
                    &config.supabase_anon_key,
                    token_store.clone(),
                ));
                Ok(Backend {
                    identity: client.clone(),
                    tables: client.clone(),
                    storage: client,
                    token_store,
                })
            }
            BackendProvider::Mock => {
                tracing::info!("Creating mock backend");
                Ok(Backend::from_mock(Arc::new(MockBackend::with_token_store(
                    token_store,
                ))))
            }
        }
    }
}
