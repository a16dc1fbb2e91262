//! Mock Remote Data Client
//!
//! In-memory backend for tests and local development:
//! - `MockBackend`: accounts, tables with per-relation auto-increment ids,
//!   bucket objects and a recorded call history
//! - `MockBehavior`: programmable failures and latency
//!
//! Sessions are real HS256 JWTs so claim decoding works the same way it does
//! against a hosted project. Sign-in persists the session to the shared
//! token store; sign-out only drops the in-memory session, leaving local
//! storage cleanup to the caller.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{Map, Value};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::{KeyValueError, ProviderError, StorageError, StoreError};
use crate::query::{Filter, Query};
use crate::session::{
    AuthChangeEvent, AuthStateChange, AuthUser, Session, SessionClaims, SignUpResponse,
    AUTH_TOKEN_KEY,
};
use crate::token_store::{KeyValueStore, MemoryKeyValueStore};
use crate::{IdentityProvider, ObjectStorage, TableStore, EVENT_CHANNEL_CAPACITY};

const MOCK_JWT_SECRET: &[u8] = b"mock-project-jwt-secret";
const MOCK_TOKEN_TTL_SECS: i64 = 3600;

/// Table operation kinds that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableOp {
    Select,
    Insert,
    Upsert,
    Update,
    Delete,
}

/// Programmable behavior for the mock backend
#[derive(Debug, Default)]
pub struct MockBehavior {
    sign_out_error: RwLock<Option<String>>,
    refresh_error: RwLock<Option<String>>,
    upload_error: RwLock<Option<String>>,
    table_errors: RwLock<HashMap<(String, TableOp), String>>,
    require_confirmation: RwLock<bool>,
    latency: RwLock<Duration>,
}

fn read<T: Clone>(lock: &RwLock<T>) -> T {
    lock.read().unwrap_or_else(PoisonError::into_inner).clone()
}

fn write<T>(lock: &RwLock<T>, value: T) {
    *lock.write().unwrap_or_else(PoisonError::into_inner) = value;
}

impl MockBehavior {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `sign_out` fail with the given message
    pub fn fail_sign_out(&self, message: impl Into<String>) {
        write(&self.sign_out_error, Some(message.into()));
    }

    /// Make `refresh_session` fail with the given message
    pub fn fail_refresh(&self, message: impl Into<String>) {
        write(&self.refresh_error, Some(message.into()));
    }

    /// Make every upload fail with the given message
    pub fn fail_uploads(&self, message: impl Into<String>) {
        write(&self.upload_error, Some(message.into()));
    }

    /// Make one operation on one relation fail with the given message
    pub fn fail_table(&self, relation: &str, op: TableOp, message: impl Into<String>) {
        self.table_errors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((relation.to_string(), op), message.into());
    }

    /// Sign-up returns no session, as with email confirmation enabled
    pub fn require_email_confirmation(&self, required: bool) {
        write(&self.require_confirmation, required);
    }

    /// Delay applied before every table operation
    pub fn set_latency(&self, latency: Duration) {
        write(&self.latency, latency);
    }

    /// Reset to default behavior
    pub fn reset(&self) {
        write(&self.sign_out_error, None);
        write(&self.refresh_error, None);
        write(&self.upload_error, None);
        write(&self.table_errors, HashMap::new());
        write(&self.require_confirmation, false);
        write(&self.latency, Duration::ZERO);
    }

    fn table_error(&self, relation: &str, op: TableOp) -> Option<StoreError> {
        self.table_errors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(relation.to_string(), op))
            .map(|message| StoreError::Rejected {
                code: "MOCK".to_string(),
                message: message.clone(),
            })
    }
}

/// A recorded backend call for test assertions
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    SignIn { email: String },
    SignUp { email: String },
    CreateIdentity { email: String },
    SignOut,
    ResetPassword { email: String },
    RefreshSession,
    Select { relation: String, query: Query },
    Insert { relation: String, rows: Vec<Value> },
    Upsert { relation: String, rows: Vec<Value>, on_conflict: String },
    Update { relation: String, fields: Value, filter: Filter },
    Delete { relation: String, filter: Filter },
    Upload { bucket: String, filename: String, size: usize },
}

#[derive(Debug, Clone)]
struct MockAccount {
    user: AuthUser,
    password: String,
}

/// Stored bucket object
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Debug, Default)]
struct MockState {
    accounts: HashMap<String, MockAccount>,
    session: Option<Session>,
    tables: HashMap<String, Vec<Value>>,
    next_ids: HashMap<String, i64>,
    objects: BTreeMap<String, StoredObject>,
}

/// Mock backend with programmable behavior
pub struct MockBackend {
    behavior: Arc<MockBehavior>,
    state: Mutex<MockState>,
    history: Mutex<Vec<RecordedCall>>,
    events: broadcast::Sender<AuthStateChange>,
    token_store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for MockBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockBackend")
            .field("behavior", &self.behavior)
            .finish_non_exhaustive()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self::with_token_store(Arc::new(MemoryKeyValueStore::new()))
    }

    pub fn with_token_store(token_store: Arc<dyn KeyValueStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            behavior: Arc::new(MockBehavior::new()),
            state: Mutex::new(MockState::default()),
            history: Mutex::new(Vec::new()),
            events,
            token_store,
        }
    }

    /// Shared behavior for configuring failures
    pub fn behavior(&self) -> &Arc<MockBehavior> {
        &self.behavior
    }

    pub fn token_store(&self) -> Arc<dyn KeyValueStore> {
        self.token_store.clone()
    }

    /// Register an account without signing it in
    pub fn seed_account(&self, email: &str, password: &str) -> AuthUser {
        let mut state = self.lock_state();
        Self::create_account(&mut state, email, password)
    }

    /// Insert rows directly, assigning ids where missing
    pub fn seed_rows(&self, relation: &str, rows: Vec<Value>) -> Vec<Value> {
        let mut state = self.lock_state();
        rows.into_iter()
            .map(|row| Self::store_row(&mut state, relation, row))
            .collect()
    }

    /// Current contents of a relation
    pub fn rows(&self, relation: &str) -> Vec<Value> {
        self.lock_state()
            .tables
            .get(relation)
            .cloned()
            .unwrap_or_default()
    }

    pub fn object(&self, bucket: &str, filename: &str) -> Option<StoredObject> {
        self.lock_state()
            .objects
            .get(&format!("{}/{}", bucket, filename))
            .cloned()
    }

    pub fn current_session(&self) -> Option<Session> {
        self.lock_state().session.clone()
    }

    /// Emit a session change without any state change, as the provider does
    /// for out-of-band events.
    pub fn emit(&self, event: AuthChangeEvent) {
        let session = self.current_session();
        let _ = self.events.send(AuthStateChange::new(event, session));
    }

    pub fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn reset_history(&self) {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn record(&self, call: RecordedCall) {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn create_account(state: &mut MockState, email: &str, password: &str) -> AuthUser {
        let user = AuthUser {
            id: Uuid::new_v4(),
            email: Some(email.to_string()),
            created_at: Some(Utc::now()),
        };
        state.accounts.insert(
            email.to_lowercase(),
            MockAccount {
                user: user.clone(),
                password: password.to_string(),
            },
        );
        user
    }

    fn issue_session(user: &AuthUser) -> Result<Session, ProviderError> {
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            exp: (now + MOCK_TOKEN_TTL_SECS) as u64,
            iat: Some(now as u64),
            aud: Some("authenticated".to_string()),
            role: Some("authenticated".to_string()),
        };
        let access_token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(MOCK_JWT_SECRET),
        )
        .map_err(|e| ProviderError::Response(format!("Failed to issue token: {}", e)))?;

        Ok(Session {
            access_token,
            refresh_token: Uuid::new_v4().to_string(),
            token_type: "bearer".to_string(),
            expires_in: MOCK_TOKEN_TTL_SECS,
            expires_at: Some(now + MOCK_TOKEN_TTL_SECS),
            user: user.clone(),
        })
    }

    async fn start_session(
        &self,
        session: Session,
        event: AuthChangeEvent,
    ) -> Result<(), ProviderError> {
        self.lock_state().session = Some(session.clone());
        let json = serde_json::to_string(&session).map_err(KeyValueError::from)?;
        self.token_store.set(AUTH_TOKEN_KEY, json).await?;
        let _ = self.events.send(AuthStateChange::new(event, Some(session)));
        Ok(())
    }

    async fn simulate_latency(&self) {
        let latency = read(&self.behavior.latency);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }

    fn check_table(&self, relation: &str, op: TableOp) -> Result<(), StoreError> {
        match self.behavior.table_error(relation, op) {
            Some(err) => {
                tracing::debug!(relation, ?op, "Mock backend: simulated table failure");
                Err(err)
            }
            None => Ok(()),
        }
    }

    /// Insert one row, assigning the next id when the row has none
    fn store_row(state: &mut MockState, relation: &str, row: Value) -> Value {
        let mut object = match row {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };

        let counter = state.next_ids.entry(relation.to_string()).or_insert(0);
        match object.get("id").and_then(Value::as_i64) {
            Some(explicit) => *counter = (*counter).max(explicit),
            None if !object.contains_key("id") => {
                *counter += 1;
                object.insert("id".to_string(), Value::from(*counter));
            }
            None => {}
        }

        let stored = Value::Object(object);
        state
            .tables
            .entry(relation.to_string())
            .or_default()
            .push(stored.clone());
        stored
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn matches_filter(row: &Value, filter: &Filter) -> bool {
    row.get(&filter.column)
        .is_some_and(|v| cell_text(v) == filter.value)
}

fn compare_cells(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::Null) | None, Some(Value::Null) | None) => Ordering::Equal,
        (Some(Value::Null) | None, _) => Ordering::Less,
        (_, Some(Value::Null) | None) => Ordering::Greater,
        (Some(x), Some(y)) => cell_text(x).cmp(&cell_text(y)),
    }
}

fn project(row: &Value, columns: &str) -> Value {
    if columns.trim() == "*" {
        return row.clone();
    }
    let mut projected = Map::new();
    for column in columns.split(',').map(str::trim) {
        if let Some(value) = row.get(column) {
            projected.insert(column.to_string(), value.clone());
        }
    }
    Value::Object(projected)
}

fn merge(row: &mut Value, fields: &Value) {
    if let (Value::Object(target), Value::Object(source)) = (row, fields) {
        for (key, value) in source {
            target.insert(key.clone(), value.clone());
        }
    }
}

#[async_trait::async_trait]
impl IdentityProvider for MockBackend {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, ProviderError> {
        self.record(RecordedCall::SignIn {
            email: email.to_string(),
        });

        let account = self
            .lock_state()
            .accounts
            .get(&email.to_lowercase())
            .cloned()
            .filter(|a| a.password == password)
            .ok_or(ProviderError::InvalidCredentials)?;

        let session = Self::issue_session(&account.user)?;
        tracing::info!(user_id = %account.user.id, "Mock backend: signed in");
        self.start_session(session.clone(), AuthChangeEvent::SignedIn)
            .await?;
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpResponse, ProviderError> {
        self.record(RecordedCall::SignUp {
            email: email.to_string(),
        });

        let user = {
            let mut state = self.lock_state();
            if state.accounts.contains_key(&email.to_lowercase()) {
                return Err(ProviderError::AlreadyRegistered(
                    "User already registered".to_string(),
                ));
            }
            Self::create_account(&mut state, email, password)
        };

        if read(&self.behavior.require_confirmation) {
            return Ok(SignUpResponse {
                user,
                session: None,
            });
        }

        let session = Self::issue_session(&user)?;
        self.start_session(session.clone(), AuthChangeEvent::SignedIn)
            .await?;
        Ok(SignUpResponse {
            user,
            session: Some(session),
        })
    }

    async fn create_identity(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthUser, ProviderError> {
        self.record(RecordedCall::CreateIdentity {
            email: email.to_string(),
        });

        let mut state = self.lock_state();
        if state.accounts.contains_key(&email.to_lowercase()) {
            return Err(ProviderError::AlreadyRegistered(
                "User already registered".to_string(),
            ));
        }
        Ok(Self::create_account(&mut state, email, password))
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.record(RecordedCall::SignOut);

        if let Some(message) = read(&self.behavior.sign_out_error) {
            return Err(ProviderError::Rejected {
                status: 500,
                message,
            });
        }

        self.lock_state().session = None;
        let _ = self
            .events
            .send(AuthStateChange::new(AuthChangeEvent::SignedOut, None));
        Ok(())
    }

    async fn reset_password_for_email(&self, email: &str) -> Result<(), ProviderError> {
        self.record(RecordedCall::ResetPassword {
            email: email.to_string(),
        });
        Ok(())
    }

    async fn refresh_session(&self) -> Result<Session, ProviderError> {
        self.record(RecordedCall::RefreshSession);

        if let Some(message) = read(&self.behavior.refresh_error) {
            return Err(ProviderError::Rejected {
                status: 400,
                message,
            });
        }

        let current = self.current_session().ok_or(ProviderError::NoSession)?;
        let session = Self::issue_session(&current.user)?;
        self.start_session(session.clone(), AuthChangeEvent::TokenRefreshed)
            .await?;
        Ok(session)
    }

    async fn initial_session(&self) -> Option<Session> {
        if let Some(session) = self.current_session() {
            return Some(session);
        }

        let stored = self.token_store.get(AUTH_TOKEN_KEY).await.ok()??;
        let session: Session = serde_json::from_str(&stored).ok()?;
        self.lock_state().session = Some(session.clone());
        Some(session)
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthStateChange> {
        self.events.subscribe()
    }
}

#[async_trait::async_trait]
impl TableStore for MockBackend {
    async fn select(&self, relation: &str, query: &Query) -> Result<Vec<Value>, StoreError> {
        self.record(RecordedCall::Select {
            relation: relation.to_string(),
            query: query.clone(),
        });
        self.simulate_latency().await;
        self.check_table(relation, TableOp::Select)?;

        let mut rows: Vec<Value> = self
            .rows(relation)
            .into_iter()
            .filter(|row| query.filters.iter().all(|f| matches_filter(row, f)))
            .collect();

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ordering = compare_cells(a.get(&order.column), b.get(&order.column));
                if order.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            });
        }

        Ok(rows.iter().map(|row| project(row, &query.columns)).collect())
    }

    async fn insert(&self, relation: &str, rows: Vec<Value>) -> Result<Vec<Value>, StoreError> {
        self.record(RecordedCall::Insert {
            relation: relation.to_string(),
            rows: rows.clone(),
        });
        self.simulate_latency().await;
        self.check_table(relation, TableOp::Insert)?;

        let mut state = self.lock_state();
        let existing = state.tables.get(relation).cloned().unwrap_or_default();
        for row in &rows {
            if let Some(id) = row.get("id") {
                if existing.iter().any(|r| r.get("id") == Some(id)) {
                    return Err(StoreError::Rejected {
                        code: "23505".to_string(),
                        message: format!(
                            "duplicate key value violates unique constraint \"{}_pkey\"",
                            relation
                        ),
                    });
                }
            }
        }

        Ok(rows
            .into_iter()
            .map(|row| Self::store_row(&mut state, relation, row))
            .collect())
    }

    async fn upsert(
        &self,
        relation: &str,
        rows: Vec<Value>,
        on_conflict: &str,
        ignore_duplicates: bool,
    ) -> Result<Vec<Value>, StoreError> {
        self.record(RecordedCall::Upsert {
            relation: relation.to_string(),
            rows: rows.clone(),
            on_conflict: on_conflict.to_string(),
        });
        self.simulate_latency().await;
        self.check_table(relation, TableOp::Upsert)?;

        let mut state = self.lock_state();
        let mut written = Vec::new();
        for row in rows {
            let position = row.get(on_conflict).and_then(|key| {
                state
                    .tables
                    .get(relation)
                    .and_then(|table| table.iter().position(|r| r.get(on_conflict) == Some(key)))
            });

            match position {
                Some(_) if ignore_duplicates => {}
                Some(index) => {
                    if let Some(current) = state
                        .tables
                        .get_mut(relation)
                        .and_then(|table| table.get_mut(index))
                    {
                        merge(current, &row);
                        written.push(current.clone());
                    }
                }
                None => written.push(Self::store_row(&mut state, relation, row)),
            }
        }
        Ok(written)
    }

    async fn update(
        &self,
        relation: &str,
        fields: Value,
        filter: &Filter,
    ) -> Result<Vec<Value>, StoreError> {
        self.record(RecordedCall::Update {
            relation: relation.to_string(),
            fields: fields.clone(),
            filter: filter.clone(),
        });
        self.simulate_latency().await;
        self.check_table(relation, TableOp::Update)?;

        let mut state = self.lock_state();
        let Some(table) = state.tables.get_mut(relation) else {
            return Ok(Vec::new());
        };
        Ok(table
            .iter_mut()
            .filter(|row| matches_filter(row, filter))
            .map(|row| {
                merge(row, &fields);
                row.clone()
            })
            .collect())
    }

    async fn delete(&self, relation: &str, filter: &Filter) -> Result<Vec<Value>, StoreError> {
        self.record(RecordedCall::Delete {
            relation: relation.to_string(),
            filter: filter.clone(),
        });
        self.simulate_latency().await;
        self.check_table(relation, TableOp::Delete)?;

        let mut state = self.lock_state();
        let Some(table) = state.tables.get_mut(relation) else {
            return Ok(Vec::new());
        };
        let (removed, kept): (Vec<Value>, Vec<Value>) =
            table.drain(..).partition(|row| matches_filter(row, filter));
        *table = kept;
        Ok(removed)
    }
}

#[async_trait::async_trait]
impl ObjectStorage for MockBackend {
    async fn upload(
        &self,
        bucket: &str,
        filename: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.record(RecordedCall::Upload {
            bucket: bucket.to_string(),
            filename: filename.to_string(),
            size: bytes.len(),
        });
        self.simulate_latency().await;

        if let Some(message) = read(&self.behavior.upload_error) {
            return Err(StorageError::Rejected {
                status: 500,
                message,
            });
        }

        let path = format!("{}/{}", bucket, filename);
        let mut state = self.lock_state();
        if state.objects.contains_key(&path) {
            return Err(StorageError::Rejected {
                status: 409,
                message: "The resource already exists".to_string(),
            });
        }
        state.objects.insert(
            path,
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    fn public_url(&self, bucket: &str, filename: &str) -> String {
        format!("mock://storage/{}/{}", bucket, filename)
    }
}
