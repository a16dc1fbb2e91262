//! League client composition root
//!
//! Builds the Remote Data Client from configuration and wires the session
//! context, resource hooks, account provisioning and media flows on top.

pub mod telemetry;

use std::sync::Arc;

use league_auth::{Navigator, SessionManager};
use league_backend::{Backend, BackendFactory};
use league_common::Config;
use league_media::{CaptureFlow, ImageSource, ImageUploader};
use league_roster::{AccountProvisioner, MatchesHook, PlayersHook, StatsHook, TeamsHook, UsersHook};

pub struct LeagueApp {
    pub config: Config,
    pub backend: Backend,
    pub session: Arc<SessionManager>,
    pub teams: Arc<TeamsHook>,
    pub players: Arc<PlayersHook>,
    pub matches: Arc<MatchesHook>,
    pub users: Arc<UsersHook>,
    pub stats: Arc<StatsHook>,
    pub accounts: AccountProvisioner,
    uploader: Arc<ImageUploader>,
}

impl std::fmt::Debug for LeagueApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeagueApp")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl LeagueApp {
    /// Build the application for the configured backend provider
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let backend = BackendFactory::create(&config).map_err(|e| {
            tracing::error!(error = %e, "Failed to create backend");
            anyhow::anyhow!(e)
        })?;
        Ok(Self::with_backend(config, backend))
    }

    pub fn with_backend(config: Config, backend: Backend) -> Self {
        let tables = backend.tables.clone();
        Self {
            session: SessionManager::new(&backend),
            teams: Arc::new(TeamsHook::new(tables.clone())),
            players: Arc::new(PlayersHook::new(tables.clone())),
            matches: Arc::new(MatchesHook::new(tables.clone())),
            users: Arc::new(UsersHook::new(tables.clone())),
            stats: Arc::new(StatsHook::new(tables)),
            accounts: AccountProvisioner::new(&backend),
            uploader: Arc::new(ImageUploader::new(backend.storage.clone())),
            config,
            backend,
        }
    }

    /// Restore the persisted session and start listening for changes
    pub async fn start(&self) {
        tracing::info!(provider = ?self.config.backend_provider, "Starting league client");
        self.session.init().await;
    }

    /// Navigator following the session context
    pub fn navigator(&self) -> Navigator {
        Navigator::new(self.session.watch())
    }

    /// Capture flow storing team shields
    pub fn shield_flow(&self, source: Arc<dyn ImageSource>) -> CaptureFlow {
        CaptureFlow::new(
            source,
            self.uploader.clone(),
            self.teams.clone(),
            self.config.team_shield_bucket.clone(),
        )
    }

    /// Capture flow storing player photos
    pub fn photo_flow(&self, source: Arc<dyn ImageSource>) -> CaptureFlow {
        CaptureFlow::new(
            source,
            self.uploader.clone(),
            self.players.clone(),
            self.config.player_photo_bucket.clone(),
        )
    }

    /// Unmount every hook and stop the session listener
    pub async fn shutdown(&self) {
        self.teams.unmount();
        self.players.unmount();
        self.matches.unmount();
        self.users.unmount();
        self.stats.unmount();
        self.session.teardown().await;
        tracing::info!("League client stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use league_auth::ScreenTree;
    use league_backend::MockBackend;
    use league_media::{CaptureSource, MockImageSource};
    use league_roster::{NewTeam, ResourceError};
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn test_mock_app_starts_signed_out() {
        let app = assert_ok!(LeagueApp::new(Config::mock()));
        app.start().await;

        let snapshot = app.session.snapshot();
        assert!(!snapshot.loading);
        assert!(!snapshot.is_signed_in());
        assert_eq!(app.navigator().current(), ScreenTree::Auth);

        app.shutdown().await;
    }

    #[tokio::test]
    async fn test_hooks_share_backend() {
        let mock = Arc::new(MockBackend::new());
        let app = LeagueApp::with_backend(Config::mock(), Backend::from_mock(mock.clone()));

        app.teams.create(NewTeam::named("Tigers")).await.unwrap();
        assert_eq!(mock.rows("teams").len(), 1);

        app.shutdown().await;
        assert!(matches!(app.teams.fetch().await, Err(ResourceError::Cancelled)));
    }

    #[tokio::test]
    async fn test_flows_use_configured_buckets() {
        let mut config = Config::mock();
        config.team_shield_bucket = "shields".to_string();
        let app = assert_ok!(LeagueApp::new(config));
        let source = Arc::new(MockImageSource::new());

        assert_eq!(app.shield_flow(source.clone()).bucket(), "shields");
        assert_eq!(app.photo_flow(source.clone()).bucket(), "player-photos");

        // Backing out never reaches storage
        let flow = app.shield_flow(source);
        assert!(matches!(
            flow.capture_and_upload(1, CaptureSource::Camera).await,
            Ok(None)
        ));
    }
}
