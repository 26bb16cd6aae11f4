//! Team invitations

use super::error::or_not_found;
use super::team::{TeamService, MEMBER_CONFLICT_COLUMNS, MEMBER_UPDATE_COLUMNS};
use crate::contract::{
    InvitationAction, InvitationStatus, MemberRequest, ServiceError, TeamInvitation,
};
use crate::infra::storage::entity::team_invitation;
use crate::infra::storage::repositories::{find_pending_for, find_valid_invitations, membership};
use chrono::Utc;
use crudkit::{with_transaction, UpdateMap};
use sea_orm::ActiveValue::{NotSet, Set};
use std::collections::HashMap;

const INVITATION_CONFLICT_COLUMNS: [&str; 2] = ["team_id", "to_user_id"];
const INVITATION_UPDATE_COLUMNS: [&str; 3] = ["role", "status", "expires_at"];

impl TeamService {
    // ===== Invitations =====

    /// Invite users to a team.
    ///
    /// Unknown users are skipped, as are users whose unexpired invitation
    /// already carries the requested role. Anyone else gets a fresh pending
    /// invitation, replacing an older one for the same team.
    pub async fn invite_users(
        &self,
        actor_id: &str,
        team_id: &str,
        invitations: Vec<MemberRequest>,
    ) -> Result<(), ServiceError> {
        self.find_team(team_id).await?;
        self.require_manager(team_id, actor_id).await?;
        if invitations.is_empty() {
            return Ok(());
        }

        let now = Utc::now();
        let user_ids: Vec<String> = invitations.iter().map(|i| i.user_id.clone()).collect();
        let known = self.directory.get_map(&user_ids).await?;
        let existing: HashMap<String, team_invitation::Model> =
            find_valid_invitations(&self.stores.invitations, team_id, &user_ids, now)
                .await?
                .into_iter()
                .map(|inv| (inv.to_user_id.clone(), inv))
                .collect();

        let expires_at = now + self.invitation_ttl;
        for request in invitations {
            if !known.contains_key(&request.user_id) {
                tracing::warn!(team_id, user_id = %request.user_id, "skipping invitation for unknown user");
                continue;
            }
            if existing
                .get(&request.user_id)
                .is_some_and(|current| current.role == request.role.as_str())
            {
                tracing::debug!(team_id, user_id = %request.user_id, "invitation already valid");
                continue;
            }

            let model = team_invitation::ActiveModel {
                id: NotSet,
                team_id: Set(team_id.to_string()),
                from_user_id: Set(actor_id.to_string()),
                to_user_id: Set(request.user_id.clone()),
                message: Set(request.message),
                status: Set(InvitationStatus::Pending.as_str().to_string()),
                role: Set(request.role.as_str().to_string()),
                expires_at: Set(Some(expires_at)),
                created_at: NotSet,
                updated_at: NotSet,
                deleted_at: Set(None),
            };
            let saved = self
                .stores
                .invitations
                .upsert_only_columns(model, &INVITATION_CONFLICT_COLUMNS, &INVITATION_UPDATE_COLUMNS)
                .await?;
            tracing::info!(team_id, invitation_id = %saved.id, to_user_id = %saved.to_user_id, "invitation sent");
        }
        Ok(())
    }

    /// Accepting adds the membership and closes the invitation atomically.
    pub async fn respond_to_invitation(
        &self,
        actor_id: &str,
        invitation_id: &str,
        action: InvitationAction,
    ) -> Result<(), ServiceError> {
        let record = self
            .stores
            .invitations
            .find_by_id(invitation_id.to_string())
            .await
            .map_err(or_not_found("invitation", invitation_id))?;
        let invitation = TeamInvitation::try_from(record.clone())?;

        if invitation.to_user_id != actor_id {
            return Err(ServiceError::forbidden(
                "you are not allowed to respond to this invitation",
            ));
        }
        if invitation.is_expired(Utc::now()) {
            return Err(ServiceError::validation("invitation has expired"));
        }
        if invitation.status != InvitationStatus::Pending {
            return Err(ServiceError::conflict(format!(
                "invitation was already {}",
                invitation.status
            )));
        }

        match action {
            InvitationAction::Accept => {
                let actor = actor_id.to_string();
                with_transaction(&self.stores.db, |txn| {
                    let members = self.stores.members.with_session(txn.clone());
                    let invitations = self.stores.invitations.with_session(txn);
                    async move {
                        members
                            .upsert_only_columns(
                                membership(&invitation.team_id, &actor, invitation.role, &actor),
                                &MEMBER_CONFLICT_COLUMNS,
                                &MEMBER_UPDATE_COLUMNS,
                            )
                            .await?;
                        invitations
                            .updates(
                                &record,
                                &UpdateMap::new()
                                    .set("status", InvitationStatus::Accepted.as_str()),
                            )
                            .await?;
                        Ok::<_, ServiceError>(())
                    }
                })
                .await?;
                tracing::info!(invitation_id, actor_id, "invitation accepted");
            }
            InvitationAction::Reject => {
                self.stores
                    .invitations
                    .updates(
                        &record,
                        &UpdateMap::new().set("status", InvitationStatus::Rejected.as_str()),
                    )
                    .await?;
                tracing::info!(invitation_id, actor_id, "invitation rejected");
            }
        }
        Ok(())
    }

    /// Pending, unexpired invitations addressed to the acting user.
    pub async fn list_pending_invitations(
        &self,
        actor_id: &str,
    ) -> Result<Vec<TeamInvitation>, ServiceError> {
        find_pending_for(&self.stores.invitations, actor_id, Utc::now())
            .await?
            .into_iter()
            .map(TeamInvitation::try_from)
            .collect()
    }
}
