//! Domain-specific error types for the graph object store.
//!
//! Each storage domain gets its own structured error enum so callers receive
//! a single typed outcome per operation instead of raw storage-engine
//! errors.
//!
//! # Error Categories
//!
//! - **GraphStoreError**: graph object operations (create, patch, delete,
//!   search)
//! - **BranchError**: branch registry operations
//! - **ProductVersionError**: release snapshot creation, lookup, and diff

pub mod branch;
pub mod graph_object;
pub mod product_version;

// Re-export all error types
pub use branch::BranchError;
pub use graph_object::GraphStoreError;
pub use product_version::ProductVersionError;

/// Result type alias for graph object operations
pub type GraphStoreResult<T> = Result<T, GraphStoreError>;

/// Result type alias for branch operations
pub type BranchResult<T> = Result<T, BranchError>;

/// Result type alias for product version operations
pub type ProductVersionResult<T> = Result<T, ProductVersionError>;

/// True when a database error is a unique-constraint violation.
///
/// sea-orm does not expose a typed variant for this, so the check matches on
/// the driver's message text.
pub(crate) fn is_unique_violation(err: &sea_orm::DbErr) -> bool {
    let message = err.to_string();
    message.contains("UNIQUE constraint failed") || message.contains("unique constraint")
}
