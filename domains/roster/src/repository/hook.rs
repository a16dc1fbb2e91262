//! Generic resource hook

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use league_backend::{Filter, Query, StoreError, TableStore};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use validator::Validate;

use super::Resource;
use crate::error::ResourceError;

fn decode_row<T: DeserializeOwned>(relation: &'static str, row: Value) -> Result<T, ResourceError> {
    serde_json::from_value(row).map_err(|source| ResourceError::Decode { relation, source })
}

/// Counts one pending fetch until dropped
struct PendingFetch<'a>(&'a AtomicUsize);

impl<'a> PendingFetch<'a> {
    fn start(pending: &'a AtomicUsize) -> Self {
        pending.fetch_add(1, Ordering::AcqRel);
        Self(pending)
    }
}

impl Drop for PendingFetch<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Local copy of one relation guarded by a cancellation scope
pub(crate) struct LocalCopy<T> {
    relation: &'static str,
    items: RwLock<Vec<T>>,
    pending: AtomicUsize,
    scope: CancellationToken,
}

impl<T: DeserializeOwned + Clone> LocalCopy<T> {
    pub(crate) fn new(relation: &'static str) -> Self {
        Self {
            relation,
            items: RwLock::new(Vec::new()),
            pending: AtomicUsize::new(0),
            scope: CancellationToken::new(),
        }
    }

    pub(crate) fn list(&self) -> Vec<T> {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// True while at least one fetch is pending
    pub(crate) fn loading(&self) -> bool {
        self.pending.load(Ordering::Acquire) > 0
    }

    pub(crate) fn is_mounted(&self) -> bool {
        !self.scope.is_cancelled()
    }

    pub(crate) fn unmount(&self) {
        tracing::debug!(relation = self.relation, "Hook unmounted");
        self.scope.cancel();
    }

    pub(crate) fn ensure_active(&self) -> Result<(), ResourceError> {
        if self.scope.is_cancelled() {
            return Err(ResourceError::Cancelled);
        }
        Ok(())
    }

    /// Replace the local copy with the rows matching `query`
    pub(crate) async fn fetch(
        &self,
        tables: &dyn TableStore,
        query: &Query,
    ) -> Result<Vec<T>, ResourceError> {
        self.ensure_active()?;
        let _pending = PendingFetch::start(&self.pending);

        let result = tokio::select! {
            biased;
            _ = self.scope.cancelled() => Err(ResourceError::Cancelled),
            rows = tables.select(self.relation, query) => match rows {
                Ok(rows) => rows
                    .into_iter()
                    .map(|row| decode_row(self.relation, row))
                    .collect::<Result<Vec<T>, _>>(),
                Err(e) => Err(e.into()),
            },
        };

        // Unmounted while the response was in flight: leave the copy alone
        if self.scope.is_cancelled() {
            tracing::debug!(relation = self.relation, "Discarding fetch for unmounted hook");
            return Err(ResourceError::Cancelled);
        }

        let items = result.map_err(|e| {
            tracing::error!(relation = self.relation, error = %e, "Failed to fetch rows");
            e
        })?;
        *self.items.write().unwrap_or_else(PoisonError::into_inner) = items.clone();
        tracing::debug!(relation = self.relation, rows = items.len(), "Fetched rows");
        Ok(items)
    }
}

/// Validate and insert one row, returning it as stored
pub(crate) async fn insert_one<R: Resource>(
    tables: &dyn TableStore,
    draft: &R::Draft,
) -> Result<R, ResourceError> {
    draft.validate()?;
    let row = serde_json::to_value(draft).map_err(|source| ResourceError::Decode {
        relation: R::RELATION,
        source,
    })?;

    let inserted = tables.insert(R::RELATION, vec![row]).await?;
    let row = inserted.into_iter().next().ok_or_else(|| {
        StoreError::Response(format!("Insert into {} returned no row", R::RELATION))
    })?;
    decode_row(R::RELATION, row)
}

/// Cached access to one relation
pub struct ResourceHook<R: Resource> {
    tables: Arc<dyn TableStore>,
    copy: LocalCopy<R>,
}

impl<R: Resource> std::fmt::Debug for ResourceHook<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceHook")
            .field("relation", &R::RELATION)
            .field("mounted", &self.copy.is_mounted())
            .finish_non_exhaustive()
    }
}

impl<R: Resource> ResourceHook<R> {
    pub fn new(tables: Arc<dyn TableStore>) -> Self {
        Self {
            tables,
            copy: LocalCopy::new(R::RELATION),
        }
    }

    /// Rows from the last successful fetch, in store order
    pub fn list(&self) -> Vec<R> {
        self.copy.list()
    }

    pub fn loading(&self) -> bool {
        self.copy.loading()
    }

    pub fn is_mounted(&self) -> bool {
        self.copy.is_mounted()
    }

    /// Cancel the scope: pending fetches resolve to `Cancelled`
    pub fn unmount(&self) {
        self.copy.unmount();
    }

    pub async fn create(&self, draft: R::Draft) -> Result<R, ResourceError> {
        self.copy.ensure_active()?;
        let created = insert_one::<R>(self.tables.as_ref(), &draft)
            .await
            .map_err(|e| {
                tracing::error!(relation = R::RELATION, error = %e, "Failed to create row");
                e
            })?;

        tracing::info!(relation = R::RELATION, id = %created.id(), "Row created");
        Ok(created)
    }

    /// Partial update by primary key
    pub async fn update(&self, id: R::Id, patch: R::Patch) -> Result<R, ResourceError> {
        self.copy.ensure_active()?;
        patch.validate()?;
        let fields = serde_json::to_value(&patch).map_err(|source| ResourceError::Decode {
            relation: R::RELATION,
            source,
        })?;

        let updated = self
            .tables
            .update(R::RELATION, fields, &Filter::eq("id", &id))
            .await
            .map_err(|e| {
                tracing::error!(relation = R::RELATION, id = %id, error = %e, "Failed to update row");
                e
            })?;

        let row = updated.into_iter().next().ok_or_else(|| ResourceError::NotFound {
            relation: R::RELATION,
            id: id.to_string(),
        })?;
        tracing::info!(relation = R::RELATION, id = %id, "Row updated");
        decode_row(R::RELATION, row)
    }

    pub async fn delete(&self, id: R::Id) -> Result<(), ResourceError> {
        self.copy.ensure_active()?;
        let removed = self
            .tables
            .delete(R::RELATION, &Filter::eq("id", &id))
            .await
            .map_err(|e| {
                tracing::error!(relation = R::RELATION, id = %id, error = %e, "Failed to delete row");
                e
            })?;

        if removed.is_empty() {
            return Err(ResourceError::NotFound {
                relation: R::RELATION,
                id: id.to_string(),
            });
        }
        tracing::info!(relation = R::RELATION, id = %id, "Row deleted");
        Ok(())
    }

    /// Replace the local copy with the whole relation
    pub async fn fetch(&self) -> Result<Vec<R>, ResourceError> {
        self.copy.fetch(self.tables.as_ref(), &Query::all()).await
    }

    /// Replace the local copy with the rows where `column` equals `value`
    pub async fn fetch_where(
        &self,
        column: &str,
        value: impl ToString,
    ) -> Result<Vec<R>, ResourceError> {
        self.copy
            .fetch(self.tables.as_ref(), &Query::all().eq(column, value))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{NewTeam, Player, PlayerPatch, Team, TeamPatch, PLAYERS, TEAMS};
    use league_backend::{MockBackend, TableOp};
    use serde_json::json;
    use std::time::Duration;

    fn teams_hook(mock: &Arc<MockBackend>) -> ResourceHook<Team> {
        ResourceHook::new(mock.clone())
    }

    #[tokio::test]
    async fn test_create_fetch_delete_scenario() {
        let mock = Arc::new(MockBackend::new());
        let hook = teams_hook(&mock);

        let tigers = hook.create(NewTeam::named("Tigers")).await.unwrap();
        assert_eq!(tigers.id, 1);
        assert_eq!(tigers.name, "Tigers");
        // Mutations leave the local copy alone
        assert!(hook.list().is_empty());

        let fetched = hook.fetch().await.unwrap();
        assert_eq!(fetched, vec![tigers.clone()]);
        assert_eq!(hook.list(), vec![tigers]);

        hook.delete(1).await.unwrap();
        assert!(hook.fetch().await.unwrap().is_empty());
        assert!(hook.list().is_empty());
    }

    #[tokio::test]
    async fn test_update_then_fetch_shows_new_value() {
        let mock = Arc::new(MockBackend::new());
        let hook = teams_hook(&mock);
        let team = hook.create(NewTeam::named("Tigers")).await.unwrap();

        let patch = TeamPatch {
            name: Some("Tigers FC".to_string()),
            ..TeamPatch::default()
        };
        let updated = hook.update(team.id, patch).await.unwrap();
        assert_eq!(updated.name, "Tigers FC");

        hook.fetch().await.unwrap();
        assert_eq!(hook.list()[0].name, "Tigers FC");
    }

    #[tokio::test]
    async fn test_update_clears_nullable_column() {
        let mock = Arc::new(MockBackend::new());
        let hook = teams_hook(&mock);
        let team = hook
            .create(NewTeam {
                name: "Tigers".to_string(),
                shield_url: Some("mock://storage/team-shields/1.jpg".to_string()),
            })
            .await
            .unwrap();
        assert!(team.shield_url.is_some());

        let patch = TeamPatch {
            shield_url: Some(None),
            ..TeamPatch::default()
        };
        let cleared = hook.update(team.id, patch).await.unwrap();
        assert!(cleared.shield_url.is_none());
        assert_eq!(cleared.name, "Tigers");
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_row_are_not_found() {
        let mock = Arc::new(MockBackend::new());
        let hook = teams_hook(&mock);

        let err = hook
            .update(42, TeamPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ResourceError::NotFound { relation: "teams", .. }));

        let err = hook.delete(42).await.unwrap_err();
        assert!(matches!(err, ResourceError::NotFound { ref id, .. } if id == "42"));
    }

    #[tokio::test]
    async fn test_create_rejects_blank_draft_before_request() {
        let mock = Arc::new(MockBackend::new());
        let hook = teams_hook(&mock);

        let err = hook.create(NewTeam::named("")).await.unwrap_err();
        assert!(matches!(err, ResourceError::Validation(_)));
        assert!(mock.recorded_calls().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_is_returned() {
        let mock = Arc::new(MockBackend::new());
        mock.behavior()
            .fail_table(TEAMS, TableOp::Insert, "permission denied");
        let hook = teams_hook(&mock);

        let err = hook.create(NewTeam::named("Tigers")).await.unwrap_err();
        assert!(matches!(err, ResourceError::Store(StoreError::Rejected { .. })));
    }

    #[tokio::test]
    async fn test_fetch_where_filters_rows() {
        let mock = Arc::new(MockBackend::new());
        mock.seed_rows(
            PLAYERS,
            vec![
                json!({ "name": "Miguel", "surname": "Borja", "jersey_number": 9, "position": "Delantero", "age": 31, "team_id": 1 }),
                json!({ "name": "Edinson", "surname": "Cavani", "jersey_number": 10, "position": "Delantero", "age": 37, "team_id": 2 }),
            ],
        );
        let hook: ResourceHook<Player> = ResourceHook::new(mock.clone());

        let players = hook.fetch_where("team_id", 2).await.unwrap();
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].surname, "Cavani");

        let patch = PlayerPatch {
            jersey_number: Some(7),
            ..PlayerPatch::default()
        };
        assert_eq!(hook.update(players[0].id, patch).await.unwrap().jersey_number, 7);
    }

    #[tokio::test]
    async fn test_unmount_abandons_pending_fetch() {
        let mock = Arc::new(MockBackend::new());
        mock.seed_rows(TEAMS, vec![json!({ "name": "Tigers" })]);
        mock.behavior().set_latency(Duration::from_millis(200));
        let hook = Arc::new(teams_hook(&mock));

        let pending = tokio::spawn({
            let hook = hook.clone();
            async move { hook.fetch().await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        hook.unmount();

        let result = pending.await.unwrap();
        assert!(matches!(result, Err(ResourceError::Cancelled)));
        assert!(hook.list().is_empty());
        assert!(!hook.is_mounted());

        // Every later request is refused
        assert!(matches!(
            hook.create(NewTeam::named("Lions")).await,
            Err(ResourceError::Cancelled)
        ));
        assert!(matches!(hook.fetch().await, Err(ResourceError::Cancelled)));
        assert!(!hook.loading());
    }

    #[tokio::test]
    async fn test_loading_tracks_pending_fetch() {
        let mock = Arc::new(MockBackend::new());
        mock.seed_rows(TEAMS, vec![json!({ "name": "Tigers" })]);
        mock.behavior().set_latency(Duration::from_millis(100));
        let hook = Arc::new(teams_hook(&mock));
        assert!(!hook.loading());

        let pending = tokio::spawn({
            let hook = hook.clone();
            async move { hook.fetch().await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(hook.loading());

        assert_eq!(pending.await.unwrap().unwrap().len(), 1);
        assert!(!hook.loading());
    }

    #[tokio::test]
    async fn test_loading_cleared_after_failed_fetch() {
        let mock = Arc::new(MockBackend::new());
        mock.behavior()
            .fail_table(TEAMS, TableOp::Select, "network down");
        let hook = teams_hook(&mock);

        assert!(hook.fetch().await.is_err());
        assert!(!hook.loading());
    }

    #[tokio::test]
    async fn test_loading_cleared_after_unmount() {
        let mock = Arc::new(MockBackend::new());
        mock.behavior().set_latency(Duration::from_millis(200));
        let hook = Arc::new(teams_hook(&mock));

        let pending = tokio::spawn({
            let hook = hook.clone();
            async move { hook.fetch().await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(hook.loading());
        hook.unmount();

        assert!(matches!(pending.await.unwrap(), Err(ResourceError::Cancelled)));
        assert!(!hook.loading());
    }

    #[tokio::test]
    async fn test_loading_stays_set_while_slower_fetch_pending() {
        let mock = Arc::new(MockBackend::new());
        mock.seed_rows(TEAMS, vec![json!({ "name": "Tigers" })]);
        mock.behavior().set_latency(Duration::from_millis(300));
        let hook = Arc::new(teams_hook(&mock));

        let slow = tokio::spawn({
            let hook = hook.clone();
            async move { hook.fetch().await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        mock.behavior().set_latency(Duration::ZERO);
        hook.fetch().await.unwrap();
        assert!(hook.loading());

        slow.await.unwrap().unwrap();
        assert!(!hook.loading());
    }
}
