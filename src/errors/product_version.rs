//! Product version (release snapshot) error types
//!
//! Snapshot creation failures must come back typed: a unique-constraint race
//! that slips past the creation lock is still surfaced as `NameExists`,
//! never as a raw database error.

use thiserror::Error;
use uuid::Uuid;

/// Product version errors
#[derive(Error, Debug)]
pub enum ProductVersionError {
    /// Snapshot name already taken in the project (case-insensitive)
    #[error("Product version '{0}' already exists in this project")]
    NameExists(String),

    /// Snapshot id does not exist or belongs to another project
    #[error("Product version {0} not found")]
    NotFound(Uuid),

    /// Validation failed
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl ProductVersionError {
    /// Check if this is a not found error (404)
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProductVersionError::NotFound(_))
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            ProductVersionError::NameExists(_) => "NAME_EXISTS",
            ProductVersionError::NotFound(_) => "NOT_FOUND",
            ProductVersionError::Validation(_) => "VALIDATION_FAILED",
            ProductVersionError::Database(_) => "DATABASE_ERROR",
        }
    }
}
