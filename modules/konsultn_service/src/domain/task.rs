//! Tasks

use super::directory::UserDirectory;
use super::error::or_not_found;
use crate::contract::{NewTask, PageParams, Paginated, ServiceError, Task};
use crate::infra::storage::entity::task;
use crate::infra::storage::repositories::Stores;
use crudkit::{Filterable, PageDefaults};

/// Filter keys accepted by [`TaskService::list_tasks`]
pub const TASK_FILTERS: [&str; 4] = ["status", "priority", "project_id", "assignee_id"];

#[derive(Clone)]
pub struct TaskService {
    stores: Stores,
    directory: UserDirectory,
    page_defaults: PageDefaults,
}

impl TaskService {
    pub fn new(stores: Stores, directory: UserDirectory, page_defaults: PageDefaults) -> Self {
        Self {
            stores,
            directory,
            page_defaults,
        }
    }

    pub async fn create_task(&self, new_task: NewTask) -> Result<Task, ServiceError> {
        if new_task.title.trim().is_empty() {
            return Err(ServiceError::validation("task title is required"));
        }
        if let Some(project_id) = &new_task.project_id {
            if !self.stores.projects.exist_by_id(project_id.clone()).await? {
                return Err(ServiceError::not_found("project", project_id.as_str()));
            }
        }
        if let Some(parent_id) = &new_task.parent_task_id {
            if !self.stores.tasks.exist_by_id(parent_id.clone()).await? {
                return Err(ServiceError::validation(format!(
                    "parent task {parent_id} does not exist"
                )));
            }
        }
        let assignee = match &new_task.assignee_id {
            Some(assignee_id) => Some(self.directory.get(assignee_id).await?.ok_or_else(|| {
                ServiceError::validation(format!("assignee {assignee_id} does not exist"))
            })?),
            None => None,
        };

        let saved = self
            .stores
            .tasks
            .save(task::ActiveModel::from(&new_task))
            .await?;
        tracing::info!(task_id = %saved.id, project_id = ?saved.project_id, "task created");

        let mut created = Task::from(saved);
        created.assignee = assignee;
        Ok(created)
    }

    pub async fn get_task(&self, task_id: &str) -> Result<Task, ServiceError> {
        let model = self
            .stores
            .tasks
            .find_by_id(task_id.to_string())
            .await
            .map_err(or_not_found("task", task_id))?;
        let mut task = Task::from(model);
        if let Some(assignee_id) = &task.assignee_id {
            task.assignee = self.directory.get(assignee_id).await?;
        }
        Ok(task)
    }

    /// Filters on [`TASK_FILTERS`] are exact matches; `search` matches
    /// titles by substring.
    pub async fn list_tasks(&self, params: &PageParams) -> Result<Paginated<Task>, ServiceError> {
        let mut query = self.stores.tasks.query();
        for (key, value) in &params.filter {
            if !TASK_FILTERS.contains(&key.as_str()) {
                return Err(ServiceError::validation(format!(
                    "unsupported task filter: {key}"
                )));
            }
            query = query.where_eq(&format!("tasks.{key}"), value.as_str());
        }
        if let Some(search) = params.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            query = query.where_like("tasks.title", format!("%{search}%"));
        }

        let page = query
            .with_page_request(params.resolve(&self.page_defaults))
            .paginate()
            .await?;
        let assignees = self
            .directory
            .get_map(page.items.iter().filter_map(|t| t.assignee_id.as_deref()))
            .await?;

        Ok(page.map(|model| {
            let mut task = Task::from(model);
            task.assignee = task
                .assignee_id
                .as_ref()
                .and_then(|id| assignees.get(id).cloned());
            task
        }))
    }
}
