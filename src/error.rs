//! Error types for pageperm

use thiserror::Error;

/// The main error type for pageperm operations
#[derive(Debug, Error)]
pub enum PermError {
    #[error("Page not found: {0}")]
    PageNotFound(String),

    #[error("Permission not found: {0}")]
    PermissionNotFound(String),

    /// Ids become key parts, so they must be 1..=255 bytes
    #[error("Invalid id: {0:?}")]
    InvalidId(String),

    #[error("Invalid grantee: {0}")]
    InvalidGrantee(String),

    #[error("A permission cannot inherit from a permission on its own page")]
    SelfInheritance,

    #[error("Page {target_page} cannot inherit from page {source_page} outside its tree")]
    CannotInheritOutsideTree { source_page: String, target_page: String },

    #[error("Moving {page} under {parent} would create a cycle")]
    CircularReference { page: String, parent: String },

    #[error("Page {page} cannot sit under {parent} in another space")]
    CrossSpaceParent { page: String, parent: String },

    #[error("Page already exists: {0}")]
    PageExists(String),

    #[error("Corrupt store: {0}")]
    Corrupt(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(#[from] heed::Error),

    #[error("Encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PermError {
    /// True for the not-found conditions callers abort an operation on
    pub fn is_not_found(&self) -> bool {
        matches!(self, PermError::PageNotFound(_) | PermError::PermissionNotFound(_))
    }
}

/// Result type alias for pageperm operations
pub type Result<T> = std::result::Result<T, PermError>;
