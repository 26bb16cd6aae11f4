//! Native client trait for in-process callers
//!
//! The acting user is always passed explicitly.

use super::error::ServiceError;
use super::model::{
    InvitationAction, MemberRequest, NewTask, NewTeam, NewUser, Project, Registration, Role, Task,
    Team, TeamInvitation, TeamSummary, TeamUpdate, User,
};
use async_trait::async_trait;
use crudkit::{PageParams, Paginated};

/// Konsultn service API
#[async_trait]
pub trait KonsultnApi: Send + Sync {
    // ===== Users =====

    async fn list_users(&self, params: &PageParams) -> Result<Paginated<User>, ServiceError>;

    async fn get_user(&self, user_id: &str) -> Result<User, ServiceError>;

    async fn find_user_by_email(&self, email: &str) -> Result<User, ServiceError>;

    async fn create_user(&self, user: NewUser) -> Result<User, ServiceError>;

    /// Soft delete
    async fn delete_user(&self, user_id: &str) -> Result<(), ServiceError>;

    // ===== Authentication =====

    /// Create the identity and the local user record
    async fn register(&self, registration: Registration) -> Result<User, ServiceError>;

    /// Resolve the acting user from a bearer token
    async fn resolve_actor(&self, token: &str) -> Result<User, ServiceError>;

    // ===== Teams =====

    async fn create_team(&self, actor_id: &str, team: NewTeam) -> Result<Team, ServiceError>;

    /// Team with owner and members hydrated
    async fn get_team(&self, team_id: &str) -> Result<Team, ServiceError>;

    async fn update_team(
        &self,
        actor_id: &str,
        team_id: &str,
        update: TeamUpdate,
    ) -> Result<Team, ServiceError>;

    async fn list_user_teams(
        &self,
        actor_id: &str,
        params: &PageParams,
    ) -> Result<Paginated<TeamSummary>, ServiceError>;

    async fn can_manage_team(&self, team_id: &str, user_id: &str) -> Result<bool, ServiceError>;

    // ===== Members =====

    async fn update_member_role(
        &self,
        actor_id: &str,
        team_id: &str,
        user_id: &str,
        role: Role,
    ) -> Result<(), ServiceError>;

    async fn remove_member(
        &self,
        actor_id: &str,
        team_id: &str,
        user_id: &str,
    ) -> Result<(), ServiceError>;

    // ===== Invitations =====

    async fn invite_users(
        &self,
        actor_id: &str,
        team_id: &str,
        invitations: Vec<MemberRequest>,
    ) -> Result<(), ServiceError>;

    async fn respond_to_invitation(
        &self,
        actor_id: &str,
        invitation_id: &str,
        action: InvitationAction,
    ) -> Result<(), ServiceError>;

    async fn list_pending_invitations(
        &self,
        actor_id: &str,
    ) -> Result<Vec<TeamInvitation>, ServiceError>;

    // ===== Projects =====

    async fn create_project(&self, name: &str) -> Result<Project, ServiceError>;

    /// Project with its tasks and their assignees
    async fn get_project(&self, project_id: &str) -> Result<Project, ServiceError>;

    async fn create_project_task(
        &self,
        project_id: &str,
        task: NewTask,
    ) -> Result<Project, ServiceError>;

    // ===== Tasks =====

    async fn create_task(&self, task: NewTask) -> Result<Task, ServiceError>;

    async fn get_task(&self, task_id: &str) -> Result<Task, ServiceError>;

    async fn list_tasks(&self, params: &PageParams) -> Result<Paginated<Task>, ServiceError>;
}
