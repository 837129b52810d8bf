//! crates/bookmark_search_core/src/ports.rs
//!
//! Defines the service contracts (traits) the search engine depends on.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the auth provider, the bookmark stores and the router.

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::domain::{Bookmark, UserInfo, UserSearchProfile};
use crate::url_sync::QueryParamsUpdate;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// A lazy, restartable stream of result pages. Nothing runs until it is polled.
pub type BookmarkStream = Pin<Box<dyn Stream<Item = PortResult<Vec<Bookmark>>> + Send>>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait AuthService: Send + Sync {
    async fn is_logged_in(&self) -> PortResult<bool>;

    /// Only meaningful once `is_logged_in` answered `true`.
    async fn user_info(&self) -> PortResult<UserInfo>;
}

pub trait PersonalBookmarksService: Send + Sync {
    /// Searches the user's own and favorited bookmarks.
    fn search_personal(
        &self,
        text: &str,
        page_size: u32,
        page: u32,
        user_id: &str,
    ) -> BookmarkStream;
}

pub trait PublicBookmarksService: Send + Sync {
    fn search_public(&self, text: &str, page_size: u32, page: u32) -> BookmarkStream;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// `Ok(None)` means the user has never saved a search.
    async fn load_profile(&self, user_id: &str) -> PortResult<Option<UserSearchProfile>>;

    async fn update_profile(&self, profile: &UserSearchProfile) -> PortResult<()>;
}

/// Applies query parameter changes to the current location.
///
/// Every call is one navigation; implementations must not coalesce calls.
pub trait Navigator: Send {
    fn navigate(&mut self, update: &QueryParamsUpdate);
}
