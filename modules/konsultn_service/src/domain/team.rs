//! Teams and their membership
//!
//! Member and invitation operations live in `member.rs` and
//! `invitation.rs` as further `impl TeamService` blocks.

use super::directory::UserDirectory;
use super::error::or_not_found;
use crate::contract::{
    MemberRequest, NewTeam, PageParams, Paginated, Role, ServiceError, Team, TeamMember,
    TeamSummary, TeamUpdate,
};
use crate::infra::storage::entity::{team, team_member};
use crate::infra::storage::repositories::{
    is_team_admin, membership, teams_of_user, Stores, TeamMemberRepository, TeamSummaryRow,
};
use crudkit::{with_transaction, PageDefaults, RawSql, Session, UpdateMap};

/// Columns rewritten when a member row is added again.
pub(super) const MEMBER_CONFLICT_COLUMNS: [&str; 2] = ["team_id", "user_id"];
pub(super) const MEMBER_UPDATE_COLUMNS: [&str; 3] = ["role", "updated_by", "deleted_at"];

#[derive(Clone)]
pub struct TeamService {
    pub(super) stores: Stores,
    pub(super) directory: UserDirectory,
    pub(super) page_defaults: PageDefaults,
    pub(super) invitation_ttl: chrono::Duration,
}

impl TeamService {
    pub fn new(
        stores: Stores,
        directory: UserDirectory,
        page_defaults: PageDefaults,
        invitation_ttl: chrono::Duration,
    ) -> Self {
        Self {
            stores,
            directory,
            page_defaults,
            invitation_ttl,
        }
    }

    // ===== Teams =====

    /// Create the team and its owner membership atomically.
    pub async fn create_team(&self, actor_id: &str, new_team: NewTeam) -> Result<Team, ServiceError> {
        if new_team.name.trim().is_empty() {
            return Err(ServiceError::validation("team name is required"));
        }
        if new_team.slug.trim().is_empty() {
            return Err(ServiceError::validation("team slug is required"));
        }
        if !self.directory.exists(actor_id).await? {
            return Err(ServiceError::not_found("user", actor_id));
        }
        self.ensure_slug_free(&new_team.slug).await?;

        let model = new_team.to_active_model(actor_id);
        let actor = actor_id.to_string();
        let created = with_transaction(&self.stores.db, |txn| {
            let teams = self.stores.teams.with_session(txn.clone());
            let members = self.stores.members.with_session(txn);
            async move {
                let team = teams.save(model).await?;
                members
                    .save(membership(&team.id, &actor, Role::Owner, &actor))
                    .await?;
                Ok::<_, ServiceError>(team)
            }
        })
        .await?;

        tracing::info!(team_id = %created.id, owner_id = %actor_id, "team created");
        self.get_team(&created.id).await
    }

    /// Team with owner and member user views.
    pub async fn get_team(&self, team_id: &str) -> Result<Team, ServiceError> {
        let (model, member_rows) = self
            .stores
            .teams
            .preload::<team_member::Entity>("id", team_id)
            .await
            .map_err(or_not_found("team", team_id))?;

        let mut team = Team::from(model);
        let users = self
            .directory
            .get_map(
                member_rows
                    .iter()
                    .map(|m| m.user_id.as_str())
                    .chain([team.owner_id.as_str()]),
            )
            .await?;

        let mut members = member_rows
            .into_iter()
            .map(TeamMember::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        members.sort_by(|a, b| a.joined_at.cmp(&b.joined_at).then_with(|| a.id.cmp(&b.id)));
        for member in &mut members {
            member.user = users.get(&member.user_id).cloned();
        }
        team.owner = users.get(&team.owner_id).cloned();
        team.members = members;
        Ok(team)
    }

    /// Apply field changes, an optional ownership transfer and member sync.
    pub async fn update_team(
        &self,
        actor_id: &str,
        team_id: &str,
        update: TeamUpdate,
    ) -> Result<Team, ServiceError> {
        let current = self.find_team(team_id).await?;
        self.require_manager(team_id, actor_id).await?;

        let mut changes = UpdateMap::new();
        if let Some(name) = update.name.filter(|n| !n.trim().is_empty()) {
            changes.insert("name", name);
        }
        if let Some(slug) = update.slug.filter(|s| !s.trim().is_empty()) {
            if slug != current.slug {
                self.ensure_slug_free(&slug).await?;
                changes.insert("slug", slug);
            }
        }
        if let Some(description) = update.description {
            changes.insert("description", description);
        }
        if let Some(owner_id) = update.owner_id.filter(|o| *o != current.owner_id) {
            if actor_id != current.owner_id {
                return Err(ServiceError::forbidden(
                    "only the team owner can transfer ownership",
                ));
            }
            if !self.directory.exists(&owner_id).await? {
                return Err(ServiceError::validation(format!(
                    "new owner {owner_id} does not exist"
                )));
            }
            changes.insert("owner_id", owner_id);
        }

        let additions = self.known_members(&current, update.add_members).await?;
        let removals = removable_members(&current, update.remove_members);
        if !changes.is_empty() {
            changes.insert("updated_by", actor_id);
        }

        let actor = actor_id.to_string();
        with_transaction(&self.stores.db, |txn| {
            let teams = self.stores.teams.with_session(txn.clone());
            let members = self.stores.members.with_session(txn);
            async move {
                if !changes.is_empty() {
                    teams.updates(&current, &changes).await?;
                }
                sync_members(&members, &current.id, &actor, &additions, &removals).await
            }
        })
        .await?;

        tracing::info!(team_id, actor_id, "team updated");
        self.get_team(team_id).await
    }

    /// Teams the acting user belongs to, with member counts.
    pub async fn list_user_teams(
        &self,
        actor_id: &str,
        params: &PageParams,
    ) -> Result<Paginated<TeamSummary>, ServiceError> {
        let page = teams_of_user(&self.stores.teams, actor_id)
            .with_page_request(params.resolve(&self.page_defaults))
            .paginate_as::<TeamSummaryRow>()
            .await?;

        let owners = self
            .directory
            .get_map(page.items.iter().map(|row| row.owner_id.as_str()))
            .await?;
        Ok(page.map(|row| TeamSummary {
            owner: owners.get(&row.owner_id).cloned(),
            id: row.id,
            name: row.name,
            slug: row.slug,
            owner_id: row.owner_id,
            member_count: row.member_count,
            created_at: row.created_at,
        }))
    }

    pub async fn can_manage_team(&self, team_id: &str, user_id: &str) -> Result<bool, ServiceError> {
        Ok(is_team_admin(&self.stores.members, team_id, user_id).await?)
    }

    // ===== Helpers =====

    pub(super) async fn find_team(&self, team_id: &str) -> Result<team::Model, ServiceError> {
        self.stores
            .teams
            .find_by_id(team_id.to_string())
            .await
            .map_err(or_not_found("team", team_id))
    }

    pub(super) async fn require_manager(&self, team_id: &str, actor_id: &str) -> Result<(), ServiceError> {
        if self.can_manage_team(team_id, actor_id).await? {
            Ok(())
        } else {
            Err(ServiceError::forbidden(format!(
                "user {actor_id} cannot manage team {team_id}"
            )))
        }
    }

    async fn ensure_slug_free(&self, slug: &str) -> Result<(), ServiceError> {
        let taken = self
            .stores
            .teams
            .unscoped()
            .exists(RawSql::new("slug = ?").bind(slug))
            .await?;
        if taken {
            return Err(ServiceError::conflict(format!("team slug {slug} is taken")));
        }
        Ok(())
    }

    /// Member requests for users that exist. Unknown users are skipped.
    async fn known_members(
        &self,
        team: &team::Model,
        add: Vec<MemberRequest>,
    ) -> Result<Vec<MemberRequest>, ServiceError> {
        let known = self
            .directory
            .get_map(add.iter().map(|req| req.user_id.as_str()))
            .await?;
        Ok(add
            .into_iter()
            .filter(|req| {
                let exists = known.contains_key(&req.user_id);
                if !exists {
                    tracing::warn!(team_id = %team.id, user_id = %req.user_id, "skipping unknown member");
                }
                exists
            })
            .collect())
    }
}

/// Users to remove, never including the owner.
fn removable_members(team: &team::Model, remove: Vec<String>) -> Vec<String> {
    remove
        .into_iter()
        .filter(|user_id| {
            let is_owner = *user_id == team.owner_id;
            if is_owner {
                tracing::warn!(team_id = %team.id, "refusing to remove the team owner");
            }
            !is_owner
        })
        .collect()
}

/// Upsert `add` on (team_id, user_id), restoring removed members, then
/// soft-delete `remove`.
async fn sync_members<S: Session>(
    members: &TeamMemberRepository<S>,
    team_id: &str,
    actor_id: &str,
    add: &[MemberRequest],
    remove: &[String],
) -> Result<(), ServiceError> {
    for request in add {
        members
            .upsert_only_columns(
                membership(team_id, &request.user_id, request.role, actor_id),
                &MEMBER_CONFLICT_COLUMNS,
                &MEMBER_UPDATE_COLUMNS,
            )
            .await?;
    }

    if !remove.is_empty() {
        let removed = members
            .delete_where(
                RawSql::new("team_id = ? AND user_id IN ?")
                    .bind(team_id)
                    .bind_list(remove.iter().cloned()),
            )
            .await?;
        tracing::debug!(team_id, removed, "members removed");
    }
    Ok(())
}
