//! Entities that carry an image URL

use std::fmt::Display;
use std::future::Future;

use league_roster::{
    PlayerPatch, PlayersHook, ResourceError, TeamPatch, TeamsHook, PLAYERS, TEAMS,
};

#[async_trait::async_trait]
pub trait ImageOwner: Send + Sync {
    /// Store `url` on entity `id`, then refresh the owner's list.
    ///
    /// Only the update can fail; once the row holds the URL a failed
    /// refresh is logged and the list stays stale until the next fetch.
    async fn attach_image(&self, id: i64, url: &str) -> Result<(), ResourceError>;
}

async fn refresh<T, F>(relation: &str, id: impl Display, fetch: F)
where
    F: Future<Output = Result<Vec<T>, ResourceError>>,
{
    if let Err(e) = fetch.await {
        tracing::warn!(relation, id = %id, error = %e, "Image attached but list refresh failed");
    }
}

#[async_trait::async_trait]
impl ImageOwner for TeamsHook {
    async fn attach_image(&self, id: i64, url: &str) -> Result<(), ResourceError> {
        let patch = TeamPatch {
            shield_url: Some(Some(url.to_string())),
            ..TeamPatch::default()
        };
        self.update(id, patch).await?;
        refresh(TEAMS, id, self.fetch()).await;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ImageOwner for PlayersHook {
    async fn attach_image(&self, id: i64, url: &str) -> Result<(), ResourceError> {
        let patch = PlayerPatch {
            photo_url: Some(Some(url.to_string())),
            ..PlayerPatch::default()
        };
        self.update(id, patch).await?;
        refresh(PLAYERS, id, self.fetch()).await;
        Ok(())
    }
}
