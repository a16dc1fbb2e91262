//! Auth read-model types
//!
//! Lightweight views of the `profiles` rows owned by the roster domain.
//! These carry only the fields needed for role decisions.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Relation holding one profile row per identity
pub const PROFILES: &str = "profiles";

/// League role stored on the profile row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Player,
    Follower,
}

impl Role {
    /// Check if this role can use the management screens
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Player => write!(f, "player"),
            Role::Follower => write!(f, "follower"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "player" => Ok(Role::Player),
            "follower" => Ok(Role::Follower),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

/// Role projection of a profile row
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ProfileRole {
    pub role: Role,
}

/// Row written when provisioning a profile
#[derive(Debug, Clone, Serialize)]
pub(crate) struct NewProfile<'a> {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<&'a str>,
    pub role: Role,
}
