//! Read-only user lookups for hydrating other aggregates

use crate::contract::{ServiceError, UserView};
use crate::infra::storage::mapper::{UserViewRow, USER_VIEW_COLUMNS};
use crate::infra::storage::repositories::UserRepository;
use crudkit::Filterable;
use std::collections::{BTreeSet, HashMap};

/// Public projections of users, by id.
#[derive(Clone)]
pub struct UserDirectory {
    users: UserRepository,
}

impl UserDirectory {
    pub fn new(users: UserRepository) -> Self {
        Self {
            users: users.select(USER_VIEW_COLUMNS),
        }
    }

    pub async fn get(&self, user_id: &str) -> Result<Option<UserView>, ServiceError> {
        let mut views = self.get_many([user_id]).await?;
        Ok(views.pop())
    }

    /// Unknown and soft-deleted ids are left out of the result.
    pub async fn get_many<I, T>(&self, user_ids: I) -> Result<Vec<UserView>, ServiceError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let ids: BTreeSet<String> = user_ids
            .into_iter()
            .map(|id| id.as_ref().to_string())
            .filter(|id| !id.is_empty())
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = self
            .users
            .query()
            .where_in("id", ids)
            .all_as::<UserViewRow>()
            .await?;
        Ok(rows.into_iter().map(UserView::from).collect())
    }

    pub async fn get_map<I, T>(&self, user_ids: I) -> Result<HashMap<String, UserView>, ServiceError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        Ok(self
            .get_many(user_ids)
            .await?
            .into_iter()
            .map(|view| (view.id.clone(), view))
            .collect())
    }

    pub async fn exists(&self, user_id: &str) -> Result<bool, ServiceError> {
        Ok(self.get(user_id).await?.is_some())
    }
}
