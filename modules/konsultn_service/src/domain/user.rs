//! User accounts

use super::error::or_not_found;
use crate::contract::{NewUser, PageParams, Paginated, ServiceError, User};
use crate::infra::storage::entity::user;
use crate::infra::storage::repositories::UserRepository;
use crudkit::{PageDefaults, RawSql, UpdateMap};

#[derive(Clone)]
pub struct UserService {
    users: UserRepository,
    page_defaults: PageDefaults,
}

impl UserService {
    pub fn new(users: UserRepository, page_defaults: PageDefaults) -> Self {
        Self {
            users,
            page_defaults,
        }
    }

    pub async fn list_users(&self, params: &PageParams) -> Result<Paginated<User>, ServiceError> {
        let page = self
            .users
            .query()
            .with_page_request(params.resolve(&self.page_defaults))
            .paginate()
            .await?;
        Ok(page.map(User::from))
    }

    pub async fn get_user(&self, user_id: &str) -> Result<User, ServiceError> {
        let model = self
            .users
            .find_by_id(user_id.to_string())
            .await
            .map_err(or_not_found("user", user_id))?;
        Ok(model.into())
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<User, ServiceError> {
        let model = self
            .users
            .find_first_by("email", email)
            .await
            .map_err(or_not_found("user", email))?;
        Ok(model.into())
    }

    pub async fn create_user(&self, new_user: NewUser) -> Result<User, ServiceError> {
        self.create_with_uid(&new_user, None).await
    }

    /// Soft delete
    pub async fn delete_user(&self, user_id: &str) -> Result<(), ServiceError> {
        let model = self
            .users
            .find_by_id(user_id.to_string())
            .await
            .map_err(or_not_found("user", user_id))?;
        self.users.soft_delete(&model).await?;
        tracing::info!(user_id, "user deleted");
        Ok(())
    }

    pub(crate) async fn create_with_uid(
        &self,
        new_user: &NewUser,
        uid: Option<String>,
    ) -> Result<User, ServiceError> {
        validate_new_user(new_user)?;
        self.ensure_email_free(&new_user.email).await?;

        let mut model = user::ActiveModel::from(new_user);
        model.uid = sea_orm::ActiveValue::Set(uid);
        let saved = self.users.save(model).await?;
        tracing::info!(user_id = %saved.id, "user created");
        Ok(saved.into())
    }

    /// Soft-deleted accounts still hold their address.
    pub(crate) async fn ensure_email_free(&self, email: &str) -> Result<(), ServiceError> {
        let taken = self
            .users
            .unscoped()
            .exists(RawSql::new("email = ?").bind(email))
            .await?;
        if taken {
            return Err(ServiceError::conflict(format!(
                "a user with email {email} already exists"
            )));
        }
        Ok(())
    }

    pub(crate) async fn record_login(&self, model: &user::Model) -> Result<User, ServiceError> {
        let now = chrono::Utc::now();
        self.users
            .updates(model, &UpdateMap::new().set("last_login", now))
            .await?;
        let mut user = User::from(model.clone());
        user.last_login = Some(now);
        Ok(user)
    }
}

fn validate_new_user(user: &NewUser) -> Result<(), ServiceError> {
    let email = user.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(ServiceError::validation("a valid email is required"));
    }
    if user.first_name.trim().is_empty() {
        return Err(ServiceError::validation("first name is required"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_needs_an_email_and_a_name() {
        let mut user = NewUser {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            phone_number: None,
        };
        assert!(validate_new_user(&user).is_ok());

        user.email = "not-an-email".into();
        assert!(matches!(
            validate_new_user(&user),
            Err(ServiceError::Validation { .. })
        ));

        user.email = "ada@example.com".into();
        user.first_name = "  ".into();
        assert!(validate_new_user(&user).is_err());
    }
}
