use std::error::Error as StdError;

use thiserror::Error;

use crate::{
    application::{criteria::CriteriaError, repos::RepoError},
    cache::InvalidationError,
    domain::error::DomainError,
    infra::error::InfraError,
};

/// Closed failure taxonomy returned by every catalog operation.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("infrastructure failure: {0}")]
    Infrastructure(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        Self::Infrastructure(message.into())
    }

    /// Convert a repository error, naming the missing entity on `NotFound`.
    pub fn from_repo(err: RepoError, entity: &'static str) -> Self {
        match err {
            RepoError::NotFound => AppError::not_found(entity),
            other => other.into(),
        }
    }

    /// Stable label for logs and exit reporting.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::NotFound { .. } => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::Infrastructure(_) => "infrastructure",
        }
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<CriteriaError> for AppError {
    fn from(err: CriteriaError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => AppError::not_found("record"),
            RepoError::MissingReference { entity } => AppError::not_found(entity),
            RepoError::Duplicate { constraint } => {
                AppError::conflict(format!("unique constraint `{constraint}` violated"))
            }
            RepoError::InvalidInput { message } => AppError::Validation(message),
            other => AppError::Infrastructure(error_chain(&other)),
        }
    }
}

impl From<InvalidationError> for AppError {
    fn from(err: InvalidationError) -> Self {
        AppError::Infrastructure(error_chain(&err))
    }
}

impl From<InfraError> for AppError {
    fn from(err: InfraError) -> Self {
        AppError::Infrastructure(error_chain(&err))
    }
}

fn error_chain(error: &dyn StdError) -> String {
    let mut message = error.to_string();
    let mut current = error.source();
    while let Some(inner) = current {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        current = inner.source();
    }
    message
}
