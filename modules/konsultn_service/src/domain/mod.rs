//! Domain layer - business logic over the storage repositories

mod auth;
mod directory;
mod error;
mod invitation;
mod member;
mod project;
mod task;
mod team;
mod user;

pub use auth::{AuthService, IdentityProvider};
pub use directory::UserDirectory;
pub use project::ProjectService;
pub use task::{TaskService, TASK_FILTERS};
pub use team::TeamService;
pub use user::UserService;

use crate::config::Config;
use crate::infra::storage::repositories::Stores;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Every domain service of the module, wired over one connection pool.
#[derive(Clone)]
pub struct Services {
    pub users: UserService,
    pub auth: AuthService,
    pub teams: TeamService,
    pub projects: ProjectService,
    pub tasks: TaskService,
}

impl Services {
    pub fn new(
        db: Arc<DatabaseConnection>,
        identity: Arc<dyn IdentityProvider>,
        config: &Config,
    ) -> Self {
        let stores = Stores::new(db);
        let page_defaults = config.page_defaults();
        let directory = UserDirectory::new(stores.users.clone());

        let users = UserService::new(stores.users.clone(), page_defaults.clone());
        let auth = AuthService::new(identity, stores.users.clone(), users.clone());
        let teams = TeamService::new(
            stores.clone(),
            directory.clone(),
            page_defaults.clone(),
            config.invitation_ttl(),
        );
        let tasks = TaskService::new(stores.clone(), directory.clone(), page_defaults);
        let projects = ProjectService::new(stores, directory, tasks.clone());

        Self {
            users,
            auth,
            teams,
            projects,
            tasks,
        }
    }
}
