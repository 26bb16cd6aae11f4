//! Contract error types for the konsultn service
//!
//! Transport-agnostic; callers map these onto their own surface.

/// Konsultn service domain errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Record not found
    NotFound {
        /// Resource type (user, team, invitation, ...)
        resource: String,
        /// Resource identifier
        id: String,
    },
    /// Conflicting state (duplicate email, invitation already answered)
    Conflict { reason: String },
    /// Malformed or inconsistent input
    Validation { message: String },
    /// Acting user may not perform the operation
    Forbidden { reason: String },
    /// The caller cancelled the request
    Cancelled,
    /// Internal error
    Internal,
}

impl ServiceError {
    pub fn not_found(resource: &str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.to_string(),
            id: id.into(),
        }
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden {
            reason: reason.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict {
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { resource, id } => {
                write!(f, "{} not found: {}", resource, id)
            }
            Self::Conflict { reason } => {
                write!(f, "Conflict: {}", reason)
            }
            Self::Validation { message } => {
                write!(f, "Validation error: {}", message)
            }
            Self::Forbidden { reason } => {
                write!(f, "Forbidden: {}", reason)
            }
            Self::Cancelled => {
                write!(f, "Request cancelled")
            }
            Self::Internal => {
                write!(f, "Internal error")
            }
        }
    }
}

impl std::error::Error for ServiceError {}
