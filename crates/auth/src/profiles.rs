//! Profile role reads and idempotent provisioning
//!
//! The profile row is keyed by identity id. Provisioning is an upsert that
//! ignores duplicates, so it can be retried after a partial failure and
//! never overwrites a role an admin has already assigned.

use league_backend::{Query, StoreError, TableStore};
use uuid::Uuid;

use crate::error::AuthError;
use crate::types::{NewProfile, ProfileRole, Role, PROFILES};

/// Write the profile row for `user_id` unless one already exists
pub async fn provision_profile(
    tables: &dyn TableStore,
    user_id: Uuid,
    email: Option<&str>,
    role: Role,
) -> Result<(), StoreError> {
    let row = serde_json::to_value(NewProfile {
        id: user_id,
        email,
        role,
    })?;

    let written = tables.upsert(PROFILES, vec![row], "id", true).await?;
    if written.is_empty() {
        tracing::debug!(user_id = %user_id, "Profile already provisioned");
    } else {
        tracing::info!(user_id = %user_id, role = %role, "Profile provisioned");
    }
    Ok(())
}

/// Read the role stored on the profile row, `None` when there is no row
pub async fn find_role(tables: &dyn TableStore, user_id: Uuid) -> Result<Option<Role>, AuthError> {
    let rows = tables
        .select(PROFILES, &Query::all().columns("role").eq("id", user_id))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, user_id = %user_id, "Failed to load profile role");
            e
        })?;

    match rows.into_iter().next() {
        Some(row) => {
            let profile: ProfileRole = serde_json::from_value(row)?;
            Ok(Some(profile.role))
        }
        None => Ok(None),
    }
}

/// Resolve the role for an identity, provisioning a follower profile just in
/// time when the row is missing.
pub async fn resolve_role(
    tables: &dyn TableStore,
    user_id: Uuid,
    email: Option<&str>,
) -> Result<Role, AuthError> {
    if let Some(role) = find_role(tables, user_id).await? {
        return Ok(role);
    }

    tracing::warn!(user_id = %user_id, "Profile missing, provisioning follower");
    provision_profile(tables, user_id, email, Role::Follower)
        .await
        .map_err(|source| AuthError::ProfileProvisioning { user_id, source })?;
    Ok(Role::Follower)
}
