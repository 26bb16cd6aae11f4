//! Repository error to service error mapping

use crate::contract::ServiceError;
use crudkit::{ErrorKind, RepoError};

impl From<RepoError> for ServiceError {
    fn from(err: RepoError) -> Self {
        match err.kind() {
            ErrorKind::NotFound => ServiceError::NotFound {
                resource: "record".to_string(),
                id: err.context().to_string(),
            },
            ErrorKind::Cancelled => ServiceError::Cancelled,
            ErrorKind::InvalidInput => ServiceError::Validation {
                message: err.to_string(),
            },
            ErrorKind::Database => {
                tracing::error!(error = %err, "repository failure");
                ServiceError::Internal
            }
        }
    }
}

/// Map a repository error, naming the missing resource on `NotFound`.
pub(crate) fn or_not_found(resource: &'static str, id: &str) -> impl FnOnce(RepoError) -> ServiceError {
    let id = id.to_string();
    move |err| {
        if err.is_not_found() {
            ServiceError::not_found(resource, id)
        } else {
            err.into()
        }
    }
}
