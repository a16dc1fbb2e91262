//! Resource hooks over the remote store
//!
//! A hook owns an unsynchronised local copy of one relation plus a
//! cancellation scope. Mutations never refresh the copy; callers re-invoke
//! `fetch`. Once `unmount()` is called, pending fetches are abandoned and no
//! request touches the copy again.

mod hook;
mod stats;

use std::fmt::Display;

use serde::de::DeserializeOwned;
use serde::Serialize;
use validator::Validate;

use crate::domain::entities::{
    Match, MatchId, MatchPatch, NewMatch, NewPlayer, NewProfile, NewTeam, Player, PlayerId,
    PlayerPatch, Profile, ProfilePatch, Team, TeamId, TeamPatch, MATCHES, PLAYERS, PROFILES,
    TEAMS,
};

pub use hook::ResourceHook;
pub use stats::StatsHook;

pub(crate) use hook::insert_one;

/// An entity stored in one relation and addressed by primary key `id`
pub trait Resource: DeserializeOwned + Clone + Send + Sync + 'static {
    type Id: Display + Clone + Send + Sync;
    type Draft: Serialize + Validate + Send + Sync;
    type Patch: Serialize + Validate + Send + Sync;

    const RELATION: &'static str;

    fn id(&self) -> Self::Id;
}

impl Resource for Team {
    type Id = TeamId;
    type Draft = NewTeam;
    type Patch = TeamPatch;
    const RELATION: &'static str = TEAMS;

    fn id(&self) -> TeamId {
        self.id
    }
}

impl Resource for Player {
    type Id = PlayerId;
    type Draft = NewPlayer;
    type Patch = PlayerPatch;
    const RELATION: &'static str = PLAYERS;

    fn id(&self) -> PlayerId {
        self.id
    }
}

impl Resource for Match {
    type Id = MatchId;
    type Draft = NewMatch;
    type Patch = MatchPatch;
    const RELATION: &'static str = MATCHES;

    fn id(&self) -> MatchId {
        self.id
    }
}

impl Resource for Profile {
    type Id = uuid::Uuid;
    type Draft = NewProfile;
    type Patch = ProfilePatch;
    const RELATION: &'static str = PROFILES;

    fn id(&self) -> uuid::Uuid {
        self.id
    }
}

pub type TeamsHook = ResourceHook<Team>;
pub type PlayersHook = ResourceHook<Player>;
pub type MatchesHook = ResourceHook<Match>;
pub type UsersHook = ResourceHook<Profile>;
