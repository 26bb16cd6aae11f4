//! Repository error taxonomy

use sea_orm::DbErr;

/// Coarse error category, stable across wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    Database,
    Cancelled,
}

/// Errors produced by repositories and query execution.
///
/// Every variant carries the operation context ("find by id in `teams`") so
/// callers can log a useful message without re-wrapping.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("{context}: record not found")]
    NotFound { context: String },

    #[error("{context}: invalid input: {message}")]
    InvalidInput { context: String, message: String },

    #[error("{context}: {source}")]
    Database {
        context: String,
        #[source]
        source: DbErr,
    },

    #[error("{context}: operation cancelled")]
    Cancelled { context: String },
}

impl RepoError {
    pub fn not_found(context: impl Into<String>) -> Self {
        Self::NotFound {
            context: context.into(),
        }
    }

    pub fn invalid_input(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            context: context.into(),
            message: message.into(),
        }
    }

    pub fn cancelled(context: impl Into<String>) -> Self {
        Self::Cancelled {
            context: context.into(),
        }
    }

    /// Wrap a driver error with call-site context. Missing-row errors stay
    /// distinguishable as [`ErrorKind::NotFound`].
    pub fn wrap(source: DbErr, context: impl Into<String>) -> Self {
        let context = context.into();
        match source {
            DbErr::RecordNotFound(_) | DbErr::RecordNotUpdated => Self::NotFound { context },
            source => Self::Database { context, source },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::Database { .. } => ErrorKind::Database,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn context(&self) -> &str {
        match self {
            Self::NotFound { context }
            | Self::InvalidInput { context, .. }
            | Self::Database { context, .. }
            | Self::Cancelled { context } => context,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_not_found_stays_not_found_after_wrap() {
        let err = RepoError::wrap(DbErr::RecordNotFound("teams".into()), "find by id in `teams`");
        assert!(err.is_not_found());
        assert_eq!(err.context(), "find by id in `teams`");
    }

    #[test]
    fn other_driver_errors_are_database_kind() {
        let err = RepoError::wrap(DbErr::Custom("boom".into()), "save in `teams`");
        assert_eq!(err.kind(), ErrorKind::Database);
        assert!(err.to_string().contains("save in `teams`"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
