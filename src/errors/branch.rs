//! Branch registry error types

use thiserror::Error;
use uuid::Uuid;

/// Branch registry errors
#[derive(Error, Debug)]
pub enum BranchError {
    /// Branch name already taken in the project (case-sensitive)
    #[error("Branch '{0}' already exists in this project")]
    DuplicateName(String),

    /// Branch not found in the project
    #[error("Branch {0} not found")]
    NotFound(Uuid),

    /// Referenced parent branch does not exist in the project
    #[error("Parent branch {0} not found")]
    ParentNotFound(Uuid),

    /// Validation failed
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl BranchError {
    /// Check if this is a not found error (404)
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            BranchError::NotFound(_) | BranchError::ParentNotFound(_)
        )
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            BranchError::DuplicateName(_) => "DUPLICATE_NAME",
            BranchError::NotFound(_) | BranchError::ParentNotFound(_) => "NOT_FOUND",
            BranchError::Validation(_) => "VALIDATION_FAILED",
            BranchError::Database(_) => "DATABASE_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_name() {
        let err = BranchError::DuplicateName("feature-x".to_string());
        assert_eq!(
            err.to_string(),
            "Branch 'feature-x' already exists in this project"
        );
        assert_eq!(err.error_code(), "DUPLICATE_NAME");
    }

    #[test]
    fn test_parent_not_found() {
        let err = BranchError::ParentNotFound(Uuid::nil());
        assert!(err.is_not_found());
        assert_eq!(err.error_code(), "NOT_FOUND");
    }
}
