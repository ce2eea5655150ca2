//! Error types for Grantmap

use thiserror::Error;

/// The main error type for Grantmap operations.
///
/// Only role lifecycle operations and the stores return errors. Resolution and
/// mutation are total.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrantmapError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("role not found: {0}")]
    NotFound(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Result type alias for Grantmap operations
pub type Result<T> = std::result::Result<T, GrantmapError>;

/// Convert any backend error to a storage error
pub(crate) fn err<E: std::error::Error>(e: E) -> GrantmapError {
    GrantmapError::Storage(e.to_string())
}
