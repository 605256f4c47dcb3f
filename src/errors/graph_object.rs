//! Graph object store error types
//!
//! Structured errors for versioned graph object operations: creation,
//! patching, soft deletion, restore, and search.

use thiserror::Error;
use uuid::Uuid;

/// Graph object store errors
#[derive(Error, Debug)]
pub enum GraphStoreError {
    /// An enabled object already holds the key tuple on this branch
    #[error("Object '{object_type}/{object_key}' already exists on this branch")]
    KeyConflict {
        /// Logical type name
        object_type: String,
        /// External-facing key within the scope
        object_key: String,
    },

    /// Version or canonical identity not found in the scope
    #[error("Graph object {0} not found")]
    NotFound(Uuid),

    /// Validation failed
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl GraphStoreError {
    /// Check if this is a client error (400-series)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            GraphStoreError::KeyConflict { .. } | GraphStoreError::Validation(_)
        )
    }

    /// Check if this is a not found error (404)
    pub fn is_not_found(&self) -> bool {
        matches!(self, GraphStoreError::NotFound(_))
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            GraphStoreError::KeyConflict { .. } => "KEY_CONFLICT",
            GraphStoreError::NotFound(_) => "NOT_FOUND",
            GraphStoreError::Validation(_) => "VALIDATION_FAILED",
            GraphStoreError::Database(_) => "DATABASE_ERROR",
        }
    }
}
