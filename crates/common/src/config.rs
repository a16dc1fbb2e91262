//! Configuration management following 12-factor app principles
//!
//! All configuration is loaded from environment variables (optionally seeded
//! from a `.env` file) to keep deployment settings out of the code.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_TEAM_SHIELD_BUCKET: &str = "team-shields";
pub const DEFAULT_PLAYER_PHOTO_BUCKET: &str = "player-photos";

/// Which Remote Data Client implementation to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendProvider {
    Supabase,
    #[default]
    Mock,
}

impl std::str::FromStr for BackendProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "supabase" => Ok(BackendProvider::Supabase),
            "mock" => Ok(BackendProvider::Mock),
            other => Err(anyhow::anyhow!(
                "Unknown backend provider: {}. Supported providers: supabase, mock",
                other
            )),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    pub backend_provider: BackendProvider,

    /// Supabase project URL and public anon key
    pub supabase_url: String,
    pub supabase_anon_key: String,

    /// File holding the persisted auth token; in-memory when unset
    pub token_store_path: Option<PathBuf>,

    /// Object storage buckets
    pub team_shield_bucket: String,
    pub player_photo_bucket: String,

    /// Runtime configuration
    pub log_format: LogFormat,
    pub rust_log: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("backend_provider", &self.backend_provider)
            .field("supabase_url", &self.supabase_url)
            .field("supabase_anon_key", &"[REDACTED]")
            .field("token_store_path", &self.token_store_path)
            .field("team_shield_bucket", &self.team_shield_bucket)
            .field("player_photo_bucket", &self.player_photo_bucket)
            .field("log_format", &self.log_format)
            .field("rust_log", &self.rust_log)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend_provider: BackendProvider = lookup("BACKEND_PROVIDER")
            .unwrap_or_else(|| "mock".to_string())
            .parse()?;

        let (supabase_url, supabase_anon_key) = match backend_provider {
            BackendProvider::Supabase => (
                lookup("SUPABASE_URL")
                    .ok_or_else(|| anyhow::anyhow!("SUPABASE_URL is required"))?,
                lookup("SUPABASE_ANON_KEY")
                    .ok_or_else(|| anyhow::anyhow!("SUPABASE_ANON_KEY is required"))?,
            ),
            BackendProvider::Mock => (
                lookup("SUPABASE_URL").unwrap_or_else(|| "http://localhost:54321".to_string()),
                lookup("SUPABASE_ANON_KEY").unwrap_or_else(|| "mock-anon-key".to_string()),
            ),
        };

        let log_format = match lookup("LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            backend_provider,
            supabase_url: supabase_url.trim_end_matches('/').to_string(),
            supabase_anon_key,
            token_store_path: lookup("TOKEN_STORE_PATH").map(PathBuf::from),
            team_shield_bucket: lookup("TEAM_SHIELD_BUCKET")
                .unwrap_or_else(|| DEFAULT_TEAM_SHIELD_BUCKET.to_string()),
            player_photo_bucket: lookup("PLAYER_PHOTO_BUCKET")
                .unwrap_or_else(|| DEFAULT_PLAYER_PHOTO_BUCKET.to_string()),
            log_format,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "league=debug".to_string()),
        })
    }

    /// Configuration for the in-memory backend
    pub fn mock() -> Self {
        Self {
            backend_provider: BackendProvider::Mock,
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "mock-anon-key".to_string(),
            token_store_path: None,
            team_shield_bucket: DEFAULT_TEAM_SHIELD_BUCKET.to_string(),
            player_photo_bucket: DEFAULT_PLAYER_PHOTO_BUCKET.to_string(),
            log_format: LogFormat::Pretty,
            rust_log: "league=debug".to_string(),
        }
    }
}
