//! League Roster Domain
//!
//! Teams, players, matches, user profiles and per-match stats, read and
//! written through cancellable resource hooks. Also hosts the derived league
//! views (fixtures, standings, top scorers) and admin account provisioning.

pub mod accounts;
pub mod domain;
pub mod error;
pub mod repository;

pub use accounts::{
    AccountProvisioner, AccountRecord, CreatedAccount, NewAccountRequest, PlayerAccount,
    TeamAccount,
};
pub use domain::entities::*;
pub use domain::views::{
    describe_match, partition_matches, standings, team_name, top_scorers, MatchPartition,
    ScorerRow, StandingRow, POINTS_DRAW, POINTS_WIN,
};
pub use error::{AccountError, ResourceError};
pub use repository::{
    MatchesHook, PlayersHook, Resource, ResourceHook, StatsHook, TeamsHook, UsersHook,
};
