use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Coarse classification of a [`DomainError`], used by callers that need to
/// map failures onto transport status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    Unauthorized,
    InvalidState,
    Validation,
    Conflict,
    Infrastructure,
}

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Organization not found: {0}")]
    OrganizationNotFound(String),

    #[error("Organization already exists: {0}")]
    OrganizationAlreadyExists(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("User already exists: {0}")]
    UserAlreadyExists(String),

    #[error("Request not found: {0}")]
    RequestNotFound(String),

    #[error("Request already exists: {0}")]
    RequestAlreadyExists(String),

    #[error("Unknown permission: {0}")]
    UnknownPermission(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid request state: {0}")]
    InvalidRequestState(String),

    #[error("Version conflict on {entity} {id}: expected {expected}, found {actual}")]
    Conflict {
        entity: &'static str,
        id: String,
        expected: u64,
        actual: u64,
    },

    #[error("Repository error: {0}")]
    RepositoryError(#[from] anyhow::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::OrganizationNotFound(_)
            | DomainError::UserNotFound(_)
            | DomainError::RequestNotFound(_) => ErrorKind::NotFound,

            DomainError::OrganizationAlreadyExists(_)
            | DomainError::UserAlreadyExists(_)
            | DomainError::RequestAlreadyExists(_)
            | DomainError::Conflict { .. } => ErrorKind::Conflict,

            DomainError::UnknownPermission(_) | DomainError::ValidationError(_) => {
                ErrorKind::Validation
            }

            DomainError::PermissionDenied(_) => ErrorKind::Forbidden,

            DomainError::Unauthorized(_) => ErrorKind::Unauthorized,

            DomainError::InvalidRequestState(_) => ErrorKind::InvalidState,

            DomainError::RepositoryError(_) => ErrorKind::Infrastructure,
        }
    }
}
