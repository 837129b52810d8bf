//! crates/bookmark_search_core/src/error.rs
//!
//! Errors surfaced by the search engine to its caller.

use crate::ports::PortError;

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// A saved search the caller referred to is not in the user's history.
    #[error("Saved search not found: {0}")]
    NotFound(String),

    /// The auth provider could not answer; the session is treated as logged out.
    #[error("Authentication provider unavailable: {0}")]
    AuthUnavailable(String),

    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),
}

pub type SearchResult<T> = Result<T, SearchError>;
