//! Team member role changes and removal

use super::error::or_not_found;
use super::team::TeamService;
use crate::contract::{Role, ServiceError};
use crate::infra::storage::repositories::find_membership;
use crudkit::UpdateMap;

impl TeamService {
    // ===== Members =====

    /// No-op when the member already holds `role`.
    pub async fn update_member_role(
        &self,
        actor_id: &str,
        team_id: &str,
        user_id: &str,
        role: Role,
    ) -> Result<(), ServiceError> {
        self.require_manager(team_id, actor_id).await?;
        let member = find_membership(&self.stores.members, team_id, user_id)
            .await
            .map_err(or_not_found("team member", user_id))?;

        let current: Role = member.role.parse()?;
        if current == role {
            return Ok(());
        }
        if current == Role::Owner || role == Role::Owner {
            return Err(ServiceError::validation(
                "ownership changes go through a team ownership transfer",
            ));
        }

        self.stores
            .members
            .updates(
                &member,
                &UpdateMap::new()
                    .set("role", role.as_str())
                    .set("updated_by", actor_id),
            )
            .await?;
        tracing::info!(team_id, user_id, role = %role, "member role updated");
        Ok(())
    }

    /// Soft delete recording who removed the member. Members may always
    /// leave on their own.
    pub async fn remove_member(
        &self,
        actor_id: &str,
        team_id: &str,
        user_id: &str,
    ) -> Result<(), ServiceError> {
        let team = self.find_team(team_id).await?;
        if actor_id != user_id {
            self.require_manager(team_id, actor_id).await?;
        }
        if team.owner_id == user_id {
            return Err(ServiceError::validation("the team owner cannot be removed"));
        }

        let member = find_membership(&self.stores.members, team_id, user_id)
            .await
            .map_err(or_not_found("team member", user_id))?;
        self.stores
            .members
            .soft_delete_with_update(&member, &UpdateMap::new().set("updated_by", actor_id))
            .await?;
        tracing::info!(team_id, user_id, actor_id, "member removed");
        Ok(())
    }
}
