//! Typed repositories and the domain queries built on them

use super::entity::{project, task, team, team_invitation, team_member, user};
use crate::contract::{InvitationStatus, Role};
use chrono::{DateTime, Utc};
use crudkit::query::JoinCondition;
use crudkit::{Filterable, Operator, QueryBuilder, RawSql, RepoError, Repository, Session, Sql};
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::{DatabaseConnection, FromQueryResult};
use std::sync::Arc;

pub type UserRepository<S = Arc<DatabaseConnection>> = Repository<user::Entity, S>;
pub type TeamRepository<S = Arc<DatabaseConnection>> = Repository<team::Entity, S>;
pub type TeamMemberRepository<S = Arc<DatabaseConnection>> = Repository<team_member::Entity, S>;
pub type TeamInvitationRepository<S = Arc<DatabaseConnection>> =
    Repository<team_invitation::Entity, S>;
pub type ProjectRepository<S = Arc<DatabaseConnection>> = Repository<project::Entity, S>;
pub type TaskRepository<S = Arc<DatabaseConnection>> = Repository<task::Entity, S>;

/// Every repository of the module over one shared connection pool.
#[derive(Clone)]
pub struct Stores {
    pub db: Arc<DatabaseConnection>,
    pub users: UserRepository,
    pub teams: TeamRepository,
    pub members: TeamMemberRepository,
    pub invitations: TeamInvitationRepository,
    pub projects: ProjectRepository,
    pub tasks: TaskRepository,
}

impl Stores {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            users: Repository::new(db.clone()),
            teams: Repository::new(db.clone()),
            members: Repository::new(db.clone()),
            invitations: Repository::new(db.clone()),
            projects: Repository::new(db.clone()),
            tasks: Repository::new(db.clone()),
            db,
        }
    }
}

// ===== Team members =====

/// Active membership row, or `NotFound`.
pub async fn find_membership<S: Session>(
    members: &TeamMemberRepository<S>,
    team_id: &str,
    user_id: &str,
) -> Result<team_member::Model, RepoError> {
    members
        .query()
        .where_eq("team_id", team_id)
        .where_eq("user_id", user_id)
        .first()
        .await
}

pub async fn is_team_admin<S: Session>(
    members: &TeamMemberRepository<S>,
    team_id: &str,
    user_id: &str,
) -> Result<bool, RepoError> {
    members
        .exists(
            RawSql::new("team_id = ? AND user_id = ? AND role IN ?")
                .bind(team_id)
                .bind(user_id)
                .bind_list([Role::Owner.as_str(), Role::Admin.as_str()]),
        )
        .await
}

/// New membership row. Clears `deleted_at` so an upsert restores a
/// previously removed member.
pub fn membership(team_id: &str, user_id: &str, role: Role, actor_id: &str) -> team_member::ActiveModel {
    team_member::ActiveModel {
        id: NotSet,
        team_id: Set(team_id.to_string()),
        user_id: Set(user_id.to_string()),
        role: Set(role.as_str().to_string()),
        joined_at: Set(Utc::now()),
        updated_by: Set(actor_id.to_string()),
        deleted_at: Set(None),
    }
}

// ===== Invitations =====

/// Unexpired invitations of `team_id` addressed to any of `user_ids`.
pub async fn find_valid_invitations<S: Session>(
    invitations: &TeamInvitationRepository<S>,
    team_id: &str,
    user_ids: &[String],
    now: DateTime<Utc>,
) -> Result<Vec<team_invitation::Model>, RepoError> {
    if user_ids.is_empty() {
        return Ok(Vec::new());
    }
    invitations
        .find_where_expr(
            RawSql::new("team_id = ? AND to_user_id IN ? AND expires_at > ?")
                .bind(team_id)
                .bind_list(user_ids.iter().cloned())
                .bind(now),
        )
        .await
}

/// Pending, unexpired invitations addressed to `user_id`, newest first.
pub async fn find_pending_for<S: Session>(
    invitations: &TeamInvitationRepository<S>,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<Vec<team_invitation::Model>, RepoError> {
    invitations
        .query()
        .where_eq("to_user_id", user_id)
        .where_eq("status", InvitationStatus::Pending.as_str())
        .where_group(|g| g.where_null("expires_at").or_where_gt("expires_at", now))
        .order_desc("created_at")
        .all()
        .await
}

// ===== Teams =====

/// Row of [`teams_of_user`]
#[derive(Debug, FromQueryResult)]
pub struct TeamSummaryRow {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub owner_id: String,
    pub member_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Teams `user_id` belongs to, with their live member counts.
///
/// `tm_user` restricts to the user's own memberships; the second join
/// counts every live member of each team.
pub fn teams_of_user(
    teams: &TeamRepository,
    user_id: &str,
) -> QueryBuilder<team::Entity, Arc<DatabaseConnection>> {
    let user_id = user_id.to_string();
    teams
        .query()
        .select([
            "teams.id",
            "teams.name",
            "teams.slug",
            "teams.owner_id",
            "teams.created_at",
        ])
        .select_as(Sql::count("team_members.user_id"), "member_count")
        .join_as("team_members", "tm_user")
        .on_group(move |c| {
            c.on("id", Operator::Eq, "team_id")
                .and("tm_user.user_id", Operator::Eq, JoinCondition::bind(user_id))
                .and_null("deleted_at");
        })
        .left_join("team_members")
        .on_group(|c| {
            c.on("id", Operator::Eq, "team_id").and_null("deleted_at");
        })
        .group_by(["teams.id"])
}
