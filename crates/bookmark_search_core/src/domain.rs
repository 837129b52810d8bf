//! crates/bookmark_search_core/src/domain.rs
//!
//! Defines the pure, core data structures for the search engine.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

//=========================================================================================
// Search Query
//=========================================================================================

/// Which corpus a query searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchDomain {
    /// The user's own bookmarks plus the ones they favorited.
    Personal,
    /// The shared corpus.
    Public,
}

impl SearchDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchDomain::Personal => "personal",
            SearchDomain::Public => "public",
        }
    }

    /// Parses the `sd` URL value. Returns `None` for anything unrecognised.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "personal" => Some(SearchDomain::Personal),
            "public" => Some(SearchDomain::Public),
            _ => None,
        }
    }
}

impl fmt::Display for SearchDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The canonical (text, domain, page) triple of the active search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: String,
    pub domain: SearchDomain,
    /// 1-indexed, never zero.
    pub page: u32,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>, domain: SearchDomain, page: u32) -> Self {
        Self {
            text: text.into(),
            domain,
            page: page.max(1),
        }
    }

    /// The "no active search" state.
    pub fn idle(domain: SearchDomain) -> Self {
        Self::new(String::new(), domain, 1)
    }

    /// True when the text holds something other than whitespace.
    pub fn is_active(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

//=========================================================================================
// Saved Searches and Profiles
//=========================================================================================

/// A search the user explicitly saved, offered back as an autocomplete candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedSearch {
    pub text: String,
    /// Stored as the raw domain string, the way it was written when saved.
    pub domain: String,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    /// `None` for entries persisted before counting existed.
    pub count: Option<u32>,
}

/// The ordered (most-recent-first) list of saved searches for one user.
#[derive(Debug, Clone, PartialEq)]
pub struct UserSearchProfile {
    pub user_id: String,
    pub searches: Vec<SavedSearch>,
}

impl UserSearchProfile {
    pub fn empty(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            searches: Vec::new(),
        }
    }
}

/// Whether the working copy of the profile has arrived yet.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ProfileState {
    #[default]
    NotLoaded,
    Loaded(UserSearchProfile),
}

impl ProfileState {
    pub fn as_loaded(&self) -> Option<&UserSearchProfile> {
        match self {
            ProfileState::Loaded(profile) => Some(profile),
            ProfileState::NotLoaded => None,
        }
    }
}

//=========================================================================================
// Session and URL State
//=========================================================================================

/// Authentication status as reported once by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionAuthState {
    pub is_logged_in: bool,
    pub user_id: Option<String>,
}

impl SessionAuthState {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn logged_in(user_id: impl Into<String>) -> Self {
        Self {
            is_logged_in: true,
            user_id: Some(user_id.into()),
        }
    }
}

/// Identity claims returned by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub sub: String,
}

/// The raw `q`, `sd` and `page` query parameters, exactly as found in the URL.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UrlParams {
    pub q: Option<String>,
    pub sd: Option<String>,
    pub page: Option<String>,
}

impl UrlParams {
    /// The page number carried by the URL; absent, malformed or zero means page 1.
    pub fn page_number(&self) -> u32 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse::<u32>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(1)
    }

    /// The search text, if the URL carries a non-blank one.
    pub fn text(&self) -> Option<&str> {
        self.q.as_deref().filter(|q| !q.trim().is_empty())
    }

    /// Reconstructs the query these params describe, or `None` for "no active search".
    ///
    /// A missing `sd` next to a present `q` means public, matching how a shared link
    /// is resolved on load.
    pub fn to_query(&self) -> Option<SearchQuery> {
        let text = self.text()?;
        let domain = self
            .sd
            .as_deref()
            .and_then(SearchDomain::parse)
            .unwrap_or(SearchDomain::Public);
        Some(SearchQuery::new(text, domain, self.page_number()))
    }
}

//=========================================================================================
// Results and Notifications
//=========================================================================================

/// A bookmark returned by one of the fetch collaborators.
#[derive(Debug, Clone, PartialEq)]
pub struct Bookmark {
    pub id: Uuid,
    pub title: String,
    pub location: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub user_id: String,
    pub public: bool,
    pub created_at: DateTime<Utc>,
}

/// A "page navigation clicked" notification from an external paginator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationAction {
    /// Tag naming which consumer the paginator belongs to.
    pub caller: String,
    pub page: u32,
}

/// Signals the engine exposes to the view hosting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchSignal {
    SearchTriggered,
    SearchTextCleared,
    /// The caller must send the user through the login flow.
    LoginRequired,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_number_defaults_to_one() {
        let mut params = UrlParams::default();
        assert_eq!(params.page_number(), 1);

        params.page = Some("abc".to_string());
        assert_eq!(params.page_number(), 1);

        params.page = Some("0".to_string());
        assert_eq!(params.page_number(), 1);

        params.page = Some("7".to_string());
        assert_eq!(params.page_number(), 7);
    }

    #[test]
    fn blank_q_is_no_active_search() {
        let params = UrlParams {
            q: Some("   ".to_string()),
            sd: Some("public".to_string()),
            page: Some("3".to_string()),
        };
        assert_eq!(params.text(), None);
        assert_eq!(params.to_query(), None);
    }

    #[test]
    fn to_query_defaults_missing_domain_to_public() {
        let params = UrlParams {
            q: Some("rust".to_string()),
            sd: None,
            page: None,
        };
        assert_eq!(
            params.to_query(),
            Some(SearchQuery::new("rust", SearchDomain::Public, 1))
        );
    }

    #[test]
    fn search_query_clamps_page() {
        assert_eq!(SearchQuery::new("x", SearchDomain::Public, 0).page, 1);
    }
}
