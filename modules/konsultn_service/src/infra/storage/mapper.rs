//! Entity to model mappers
//!
//! Conversions between SeaORM entities and contract models

use super::entity::{project, task, team, team_invitation, team_member, user};
use crate::contract::{
    NewTask, NewTeam, NewUser, Project, ServiceError, Task, Team, TeamInvitation, TeamMember,
    User, UserView, DEFAULT_USER_STATUS,
};
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::FromQueryResult;

// ===== User Conversions =====

impl From<user::Model> for User {
    fn from(entity: user::Model) -> Self {
        Self {
            id: entity.id,
            uid: entity.uid,
            first_name: entity.first_name,
            last_name: entity.last_name,
            email: entity.email,
            phone_number: entity.phone_number,
            status: entity.status,
            last_login: entity.last_login,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

impl From<&NewUser> for user::ActiveModel {
    fn from(model: &NewUser) -> Self {
        Self {
            id: NotSet,
            uid: Set(None),
            first_name: Set(model.first_name.clone()),
            last_name: Set(model.last_name.clone()),
            email: Set(model.email.clone()),
            phone_number: Set(model.phone_number.clone()),
            status: Set(DEFAULT_USER_STATUS.to_string()),
            last_login: Set(None),
            created_at: NotSet,
            updated_at: NotSet,
            deleted_at: Set(None),
        }
    }
}

/// `users` columns selected for [`UserView`]
pub const USER_VIEW_COLUMNS: [&str; 4] = ["id", "first_name", "last_name", "email"];

#[derive(Debug, FromQueryResult)]
pub struct UserViewRow {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl From<UserViewRow> for UserView {
    fn from(row: UserViewRow) -> Self {
        Self {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
        }
    }
}

// ===== Team Conversions =====

impl From<team::Model> for Team {
    fn from(entity: team::Model) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            slug: entity.slug,
            description: entity.description,
            owner_id: entity.owner_id,
            updated_by: entity.updated_by,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
            owner: None,
            members: Vec::new(),
        }
    }
}

impl NewTeam {
    pub(crate) fn to_active_model(&self, owner_id: &str) -> team::ActiveModel {
        team::ActiveModel {
            id: NotSet,
            name: Set(self.name.clone()),
            slug: Set(self.slug.clone()),
            description: Set(self.description.clone()),
            owner_id: Set(owner_id.to_string()),
            updated_by: Set(owner_id.to_string()),
            created_at: NotSet,
            updated_at: NotSet,
            deleted_at: Set(None),
        }
    }
}

impl TryFrom<team_member::Model> for TeamMember {
    type Error = ServiceError;

    fn try_from(entity: team_member::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            role: entity.role.parse()?,
            id: entity.id,
            team_id: entity.team_id,
            user_id: entity.user_id,
            joined_at: entity.joined_at,
            updated_by: entity.updated_by,
            user: None,
        })
    }
}

impl TryFrom<team_invitation::Model> for TeamInvitation {
    type Error = ServiceError;

    fn try_from(entity: team_invitation::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            status: entity.status.parse()?,
            role: entity.role.parse()?,
            id: entity.id,
            team_id: entity.team_id,
            from_user_id: entity.from_user_id,
            to_user_id: entity.to_user_id,
            message: entity.message,
            expires_at: entity.expires_at,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        })
    }
}

// ===== Project & Task Conversions =====

impl From<project::Model> for Project {
    fn from(entity: project::Model) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
            tasks: Vec::new(),
        }
    }
}

impl From<task::Model> for Task {
    fn from(entity: task::Model) -> Self {
        Self {
            id: entity.id,
            project_id: entity.project_id,
            title: entity.title,
            description: entity.description,
            status: entity.status,
            priority: entity.priority,
            due_date: entity.due_date,
            assignee_id: entity.assignee_id,
            parent_task_id: entity.parent_task_id,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
            assignee: None,
        }
    }
}

impl From<&NewTask> for task::ActiveModel {
    fn from(model: &NewTask) -> Self {
        Self {
            id: NotSet,
            project_id: Set(model.project_id.clone()),
            title: Set(model.title.clone()),
            description: Set(model.description.clone()),
            status: Set(model.status.clone()),
            priority: Set(model.priority.clone()),
            due_date: Set(model.due_date),
            assignee_id: Set(model.assignee_id.clone()),
            parent_task_id: Set(model.parent_task_id.clone()),
            created_at: NotSet,
            updated_at: NotSet,
            deleted_at: Set(None),
        }
    }
}
