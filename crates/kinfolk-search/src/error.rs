//! Search error types

use thiserror::Error;

/// Result type alias for search operations
pub type SearchResult<T> = std::result::Result<T, SearchError>;

/// Search-specific error types
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Query error: {0}")]
    Query(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<SearchError> for kinfolk_core::Error {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::Query(message) => kinfolk_core::Error::Validation(message),
            SearchError::Internal(message) => kinfolk_core::Error::Internal(message),
        }
    }
}
