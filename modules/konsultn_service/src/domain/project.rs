//! Projects and the tasks inside them

use super::directory::UserDirectory;
use super::error::or_not_found;
use super::task::TaskService;
use crate::contract::{NewTask, Project, ServiceError, Task};
use crate::infra::storage::entity::{project, task};
use crate::infra::storage::repositories::Stores;
use sea_orm::ActiveValue::Set;

#[derive(Clone)]
pub struct ProjectService {
    stores: Stores,
    directory: UserDirectory,
    tasks: TaskService,
}

impl ProjectService {
    pub fn new(stores: Stores, directory: UserDirectory, tasks: TaskService) -> Self {
        Self {
            stores,
            directory,
            tasks,
        }
    }

    pub async fn create_project(&self, name: &str) -> Result<Project, ServiceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::validation("project name is required"));
        }
        let saved = self
            .stores
            .projects
            .save(project::ActiveModel {
                name: Set(name.to_string()),
                deleted_at: Set(None),
                ..Default::default()
            })
            .await?;
        tracing::info!(project_id = %saved.id, "project created");
        Ok(saved.into())
    }

    /// Project with its tasks, oldest first, and their assignees.
    pub async fn get_project(&self, project_id: &str) -> Result<Project, ServiceError> {
        let (model, task_rows) = self
            .stores
            .projects
            .preload::<task::Entity>("id", project_id)
            .await
            .map_err(or_not_found("project", project_id))?;

        let assignees = self
            .directory
            .get_map(task_rows.iter().filter_map(|t| t.assignee_id.as_deref()))
            .await?;
        let mut tasks: Vec<Task> = task_rows
            .into_iter()
            .map(|row| {
                let mut task = Task::from(row);
                task.assignee = task
                    .assignee_id
                    .as_ref()
                    .and_then(|id| assignees.get(id).cloned());
                task
            })
            .collect();
        tasks.sort_by(|a, b| a.id.cmp(&b.id));

        let mut project = Project::from(model);
        project.tasks = tasks;
        Ok(project)
    }

    /// Create a task in `project_id`, returning the refreshed project.
    pub async fn create_project_task(
        &self,
        project_id: &str,
        mut new_task: NewTask,
    ) -> Result<Project, ServiceError> {
        if !self.stores.projects.exist_by_id(project_id.to_string()).await? {
            return Err(ServiceError::not_found("project", project_id));
        }
        new_task.project_id = Some(project_id.to_string());
        self.tasks.create_task(new_task).await?;
        self.get_project(project_id).await
    }
}
