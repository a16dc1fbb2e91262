//! Read-only hook over the stats relation

use std::sync::Arc;

use league_backend::{Query, TableStore};

use super::hook::LocalCopy;
use crate::domain::entities::{MatchId, PlayerId, Stats, STATS};
use crate::error::ResourceError;

pub struct StatsHook {
    tables: Arc<dyn TableStore>,
    copy: LocalCopy<Stats>,
}

impl std::fmt::Debug for StatsHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatsHook")
            .field("mounted", &self.copy.is_mounted())
            .finish_non_exhaustive()
    }
}

impl StatsHook {
    pub fn new(tables: Arc<dyn TableStore>) -> Self {
        Self {
            tables,
            copy: LocalCopy::new(STATS),
        }
    }

    pub fn list(&self) -> Vec<Stats> {
        self.copy.list()
    }

    pub fn loading(&self) -> bool {
        self.copy.loading()
    }

    pub fn is_mounted(&self) -> bool {
        self.copy.is_mounted()
    }

    pub fn unmount(&self) {
        self.copy.unmount();
    }

    pub async fn fetch(&self) -> Result<Vec<Stats>, ResourceError> {
        self.copy.fetch(self.tables.as_ref(), &Query::all()).await
    }

    pub async fn fetch_for_player(&self, player_id: PlayerId) -> Result<Vec<Stats>, ResourceError> {
        self.copy
            .fetch(self.tables.as_ref(), &Query::all().eq("player_id", player_id))
            .await
    }

    pub async fn fetch_for_match(&self, match_id: MatchId) -> Result<Vec<Stats>, ResourceError> {
        self.copy
            .fetch(self.tables.as_ref(), &Query::all().eq("match_id", match_id))
            .await
    }
}
