//! Registration and actor resolution against an external identity provider

use super::user::UserService;
use crate::contract::{Registration, ServiceError, User};
use crate::infra::storage::repositories::UserRepository;
use async_trait::async_trait;
use std::sync::Arc;

/// External identity provider (hosted auth, SSO, ...).
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create credentials for `email`, returning the provider's uid.
    async fn create_identity(&self, email: &str, password: &str) -> anyhow::Result<String>;

    /// Verify a bearer token, returning the uid it was issued for.
    async fn verify_token(&self, token: &str) -> anyhow::Result<String>;
}

#[derive(Clone)]
pub struct AuthService {
    identity: Arc<dyn IdentityProvider>,
    users: UserRepository,
    accounts: UserService,
}

impl AuthService {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        users: UserRepository,
        accounts: UserService,
    ) -> Self {
        Self {
            identity,
            users,
            accounts,
        }
    }

    pub async fn register(&self, registration: Registration) -> Result<User, ServiceError> {
        if registration.password.len() < 6 {
            return Err(ServiceError::validation(
                "password must be at least 6 characters",
            ));
        }
        // Checked before the identity exists so a duplicate leaves nothing behind.
        self.accounts
            .ensure_email_free(&registration.user.email)
            .await?;

        let uid = self
            .identity
            .create_identity(&registration.user.email, &registration.password)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "identity provider rejected registration");
                ServiceError::Internal
            })?;

        self.accounts
            .create_with_uid(&registration.user, Some(uid))
            .await
    }

    pub async fn resolve_actor(&self, token: &str) -> Result<User, ServiceError> {
        let uid = self.identity.verify_token(token).await.map_err(|e| {
            tracing::debug!(error = %e, "token verification failed");
            ServiceError::forbidden("invalid or expired token")
        })?;

        let model = match self.users.find_first_by("uid", uid.as_str()).await {
            Ok(model) => model,
            Err(err) if err.is_not_found() => {
                tracing::warn!(uid = %uid, "verified identity has no user record");
                return Err(ServiceError::forbidden("no user for this identity"));
            }
            Err(err) => return Err(err.into()),
        };
        self.accounts.record_login(&model).await
    }
}
