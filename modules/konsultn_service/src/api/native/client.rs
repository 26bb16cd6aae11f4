//! Native client implementation - wraps the domain services for in-process calls

use crate::contract::{
    InvitationAction, KonsultnApi, MemberRequest, NewTask, NewTeam, NewUser, PageParams,
    Paginated, Project, Registration, Role, ServiceError, Task, Team, TeamInvitation,
    TeamSummary, TeamUpdate, User,
};
use crate::domain::Services;
use async_trait::async_trait;
use std::sync::Arc;

/// Native client that calls the domain services directly
#[derive(Clone)]
pub struct NativeClient {
    services: Arc<Services>,
}

impl NativeClient {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl KonsultnApi for NativeClient {
    async fn list_users(&self, params: &PageParams) -> Result<Paginated<User>, ServiceError> {
        self.services.users.list_users(params).await
    }

    async fn get_user(&self, user_id: &str) -> Result<User, ServiceError> {
        self.services.users.get_user(user_id).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<User, ServiceError> {
        self.services.users.find_user_by_email(email).await
    }

    async fn create_user(&self, user: NewUser) -> Result<User, ServiceError> {
        self.services.users.create_user(user).await
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), ServiceError> {
        self.services.users.delete_user(user_id).await
    }

    async fn register(&self, registration: Registration) -> Result<User, ServiceError> {
        self.services.auth.register(registration).await
    }

    async fn resolve_actor(&self, token: &str) -> Result<User, ServiceError> {
        self.services.auth.resolve_actor(token).await
    }

    async fn create_team(&self, actor_id: &str, team: NewTeam) -> Result<Team, ServiceError> {
        self.services.teams.create_team(actor_id, team).await
    }

    async fn get_team(&self, team_id: &str) -> Result<Team, ServiceError> {
        self.services.teams.get_team(team_id).await
    }

    async fn update_team(
        &self,
        actor_id: &str,
        team_id: &str,
        update: TeamUpdate,
    ) -> Result<Team, ServiceError> {
        self.services.teams.update_team(actor_id, team_id, update).await
    }

    async fn list_user_teams(
        &self,
        actor_id: &str,
        params: &PageParams,
    ) -> Result<Paginated<TeamSummary>, ServiceError> {
        self.services.teams.list_user_teams(actor_id, params).await
    }

    async fn can_manage_team(&self, team_id: &str, user_id: &str) -> Result<bool, ServiceError> {
        self.services.teams.can_manage_team(team_id, user_id).await
    }

    async fn update_member_role(
        &self,
        actor_id: &str,
        team_id: &str,
        user_id: &str,
        role: Role,
    ) -> Result<(), ServiceError> {
        self.services
            .teams
            .update_member_role(actor_id, team_id, user_id, role)
            .await
    }

    async fn remove_member(
        &self,
        actor_id: &str,
        team_id: &str,
        user_id: &str,
    ) -> Result<(), ServiceError> {
        self.services
            .teams
            .remove_member(actor_id, team_id, user_id)
            .await
    }

    async fn invite_users(
        &self,
        actor_id: &str,
        team_id: &str,
        invitations: Vec<MemberRequest>,
    ) -> Result<(), ServiceError> {
        self.services
            .teams
            .invite_users(actor_id, team_id, invitations)
            .await
    }

    async fn respond_to_invitation(
        &self,
        actor_id: &str,
        invitation_id: &str,
        action: InvitationAction,
    ) -> Result<(), ServiceError> {
        self.services
            .teams
            .respond_to_invitation(actor_id, invitation_id, action)
            .await
    }

    async fn list_pending_invitations(
        &self,
        actor_id: &str,
    ) -> Result<Vec<TeamInvitation>, ServiceError> {
        self.services.teams.list_pending_invitations(actor_id).await
    }

    async fn create_project(&self, name: &str) -> Result<Project, ServiceError> {
        self.services.projects.create_project(name).await
    }

    async fn get_project(&self, project_id: &str) -> Result<Project, ServiceError> {
        self.services.projects.get_project(project_id).await
    }

    async fn create_project_task(
        &self,
        project_id: &str,
        task: NewTask,
    ) -> Result<Project, ServiceError> {
        self.services
            .projects
            .create_project_task(project_id, task)
            .await
    }

    async fn create_task(&self, task: NewTask) -> Result<Task, ServiceError> {
        self.services.tasks.create_task(task).await
    }

    async fn get_task(&self, task_id: &str) -> Result<Task, ServiceError> {
        self.services.tasks.get_task(task_id).await
    }

    async fn list_tasks(&self, params: &PageParams) -> Result<Paginated<Task>, ServiceError> {
        self.services.tasks.list_tasks(params).await
    }
}
