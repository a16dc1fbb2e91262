//! Domain entities for the league roster
//!
//! Each entity mirrors one relation of the remote store. Drafts are the rows
//! sent on insert and carry presence checks; patches are partial updates
//! where `None` leaves the column untouched. Nullable columns take
//! `Option<Option<T>>` so `Some(None)` clears them.

use chrono::{DateTime, Utc};
use league_auth::Role;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

pub type TeamId = i64;
pub type PlayerId = i64;
pub type MatchId = i64;

pub const TEAMS: &str = "teams";
pub const PLAYERS: &str = "players";
pub const MATCHES: &str = "matches";
pub const STATS: &str = "stats";
pub use league_auth::PROFILES;

// ============================================================================
// Team
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    /// Public URL of the shield image
    #[serde(rename = "team_shield", default)]
    pub shield_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Validate)]
pub struct NewTeam {
    #[validate(length(min = 1, message = "Team name is required"))]
    pub name: String,
    #[serde(rename = "team_shield", skip_serializing_if = "Option::is_none")]
    pub shield_url: Option<String>,
}

impl NewTeam {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shield_url: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Validate)]
pub struct TeamPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "Team name cannot be blank"))]
    pub name: Option<String>,
    #[serde(rename = "team_shield", skip_serializing_if = "Option::is_none")]
    pub shield_url: Option<Option<String>>,
}

// ============================================================================
// Player
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub surname: String,
    pub jersey_number: i32,
    pub position: String,
    pub age: i32,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub team_id: Option<TeamId>,
    /// Identity of the player's account, when one was created for them
    #[serde(default)]
    pub user_id: Option<Uuid>,
}

impl Player {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.name, self.surname)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Validate)]
pub struct NewPlayer {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Surname is required"))]
    pub surname: String,
    pub jersey_number: i32,
    #[validate(length(min = 1, message = "Position is required"))]
    pub position: String,
    pub age: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<TeamId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Validate)]
pub struct PlayerPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "Name cannot be blank"))]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "Surname cannot be blank"))]
    pub surname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jersey_number: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "Position cannot be blank"))]
    pub position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<Option<TeamId>>,
}

// ============================================================================
// Match
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub home_team_id: TeamId,
    pub away_team_id: TeamId,
    pub date: DateTime<Utc>,
    pub stadium: String,
    #[serde(rename = "local_team_goals", default)]
    pub home_goals: Option<i32>,
    #[serde(rename = "away_team_goals", default)]
    pub away_goals: Option<i32>,
}

impl Match {
    /// Both scores are known
    pub fn score(&self) -> Option<(i32, i32)> {
        self.home_goals.zip(self.away_goals)
    }

    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        self.date > now
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Validate)]
pub struct NewMatch {
    pub home_team_id: TeamId,
    pub away_team_id: TeamId,
    pub date: DateTime<Utc>,
    #[validate(length(min = 1, message = "Stadium is required"))]
    pub stadium: String,
    #[serde(rename = "local_team_goals", skip_serializing_if = "Option::is_none")]
    pub home_goals: Option<i32>,
    #[serde(rename = "away_team_goals", skip_serializing_if = "Option::is_none")]
    pub away_goals: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Validate)]
pub struct MatchPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_team_id: Option<TeamId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub away_team_id: Option<TeamId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "Stadium cannot be blank"))]
    pub stadium: Option<String>,
    #[serde(rename = "local_team_goals", skip_serializing_if = "Option::is_none")]
    pub home_goals: Option<Option<i32>>,
    #[serde(rename = "away_team_goals", skip_serializing_if = "Option::is_none")]
    pub away_goals: Option<Option<i32>>,
}

impl MatchPatch {
    /// Record a final score
    pub fn score(home_goals: i32, away_goals: i32) -> Self {
        Self {
            home_goals: Some(Some(home_goals)),
            away_goals: Some(Some(away_goals)),
            ..Self::default()
        }
    }

    /// Drop a recorded score, making the match unplayed again
    pub fn clear_score() -> Self {
        Self {
            home_goals: Some(None),
            away_goals: Some(None),
            ..Self::default()
        }
    }
}

// ============================================================================
// Profile (users)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize, Validate)]
pub struct NewProfile {
    pub id: Uuid,
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub role: Role,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Validate)]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "Username cannot be blank"))]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

// ============================================================================
// Stats
// ============================================================================

/// Per-player, per-match statistics line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    #[serde(default)]
    pub id: Option<i64>,
    pub player_id: PlayerId,
    pub match_id: MatchId,
    #[serde(default)]
    pub goals: i32,
    #[serde(default)]
    pub yellow_cards: i32,
    #[serde(default)]
    pub red_cards: i32,
}
