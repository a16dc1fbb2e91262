//! Account provisioning for the admin users screen
//!
//! Creating an account touches three systems in order: the identity
//! provider, the `profiles` relation and the player or team relation. Each
//! step after the first can fail on its own; the error names the identity
//! that was left without its rows so an admin can retry.

use std::sync::Arc;

use league_auth::{provision_profile, Role};
use league_backend::{AuthUser, Backend, IdentityProvider, TableStore};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::entities::{NewPlayer, NewTeam, Player, Team, TeamId};
use crate::error::AccountError;
use crate::repository::{insert_one, Resource};

/// Form for a player account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PlayerAccount {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Surname is required"))]
    pub surname: String,
    pub jersey_number: i32,
    pub age: i32,
    #[validate(length(min = 1, message = "Position is required"))]
    pub position: String,
    #[serde(default)]
    pub team_id: Option<TeamId>,
}

/// Form for a team account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct TeamAccount {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    #[validate(length(min = 1, message = "Team name is required"))]
    pub name: String,
    #[serde(default)]
    pub shield_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NewAccountRequest {
    Player(PlayerAccount),
    Team(TeamAccount),
}

impl NewAccountRequest {
    pub fn validate(&self) -> Result<(), validator::ValidationErrors> {
        match self {
            NewAccountRequest::Player(account) => account.validate(),
            NewAccountRequest::Team(account) => account.validate(),
        }
    }

    pub fn email(&self) -> &str {
        match self {
            NewAccountRequest::Player(account) => &account.email,
            NewAccountRequest::Team(account) => &account.email,
        }
    }

    fn password(&self) -> &str {
        match self {
            NewAccountRequest::Player(account) => &account.password,
            NewAccountRequest::Team(account) => &account.password,
        }
    }

    /// Role written on the new profile
    pub fn role(&self) -> Role {
        match self {
            NewAccountRequest::Player(_) => Role::Player,
            NewAccountRequest::Team(_) => Role::Follower,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AccountRecord {
    Player(Player),
    Team(Team),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreatedAccount {
    pub user: AuthUser,
    pub role: Role,
    pub record: AccountRecord,
}

pub struct AccountProvisioner {
    identity: Arc<dyn IdentityProvider>,
    tables: Arc<dyn TableStore>,
}

impl AccountProvisioner {
    pub fn new(backend: &Backend) -> Self {
        Self {
            identity: backend.identity.clone(),
            tables: backend.tables.clone(),
        }
    }

    /// Create the identity, its profile and its player or team row.
    ///
    /// The admin's own session is left in place.
    pub async fn create_account(
        &self,
        request: NewAccountRequest,
    ) -> Result<CreatedAccount, AccountError> {
        request.validate()?;
        let role = request.role();

        let user = self
            .identity
            .create_identity(request.email(), request.password())
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to create identity");
                e
            })?;
        let user_id = user.id;
        tracing::info!(user_id = %user_id, role = %role, "Identity created");

        provision_profile(self.tables.as_ref(), user_id, user.email.as_deref(), role)
            .await
            .map_err(|source| {
                tracing::error!(user_id = %user_id, error = %source, "Profile provisioning failed");
                AccountError::Profile { user_id, source }
            })?;

        let record = match request {
            NewAccountRequest::Player(account) => {
                let draft = NewPlayer {
                    name: account.name,
                    surname: account.surname,
                    jersey_number: account.jersey_number,
                    position: account.position,
                    age: account.age,
                    photo_url: None,
                    team_id: account.team_id,
                    user_id: Some(user_id),
                };
                insert_one::<Player>(self.tables.as_ref(), &draft)
                    .await
                    .map(AccountRecord::Player)
                    .map_err(|source| AccountError::Record {
                        user_id,
                        relation: Player::RELATION,
                        source,
                    })?
            }
            NewAccountRequest::Team(account) => {
                let draft = NewTeam {
                    name: account.name,
                    shield_url: account.shield_url,
                };
                insert_one::<Team>(self.tables.as_ref(), &draft)
                    .await
                    .map(AccountRecord::Team)
                    .map_err(|source| AccountError::Record {
                        user_id,
                        relation: Team::RELATION,
                        source,
                    })?
            }
        };

        tracing::info!(user_id = %user_id, "Account created");
        Ok(CreatedAccount { user, role, record })
    }
}
