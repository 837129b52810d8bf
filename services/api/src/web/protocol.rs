//! services/api/src/web/protocol.rs
//!
//! Defines the JSON protocol between the browser client and the search API.

use bookmark_search_core::domain::{Bookmark, SearchDomain, SearchQuery, SearchSignal};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Search domain as it appears on the wire.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DomainDto {
    Personal,
    Public,
}

impl From<DomainDto> for SearchDomain {
    fn from(dto: DomainDto) -> Self {
        match dto {
            DomainDto::Personal => SearchDomain::Personal,
            DomainDto::Public => SearchDomain::Public,
        }
    }
}

impl From<SearchDomain> for DomainDto {
    fn from(domain: SearchDomain) -> Self {
        match domain {
            SearchDomain::Personal => DomainDto::Personal,
            SearchDomain::Public => DomainDto::Public,
        }
    }
}

/// One user interaction, applied after the page state is restored from the URL.
#[derive(Deserialize, Debug, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SearchEvent {
    /// The search box value changed. Updates the URL but does not search.
    TextChanged { text: String },

    /// The search box was submitted. Searches from page 1.
    Submit { text: String },

    /// The domain selector changed.
    DomainChanged { domain: DomainDto },

    /// A paginator was clicked. Ignored unless `caller` is the results paginator.
    PageNavigation { caller: String, page: u32 },

    /// The clear button was pressed.
    Clear,

    /// Save the active search to the user's history.
    SaveSearch,

    /// A saved search was picked from the autocomplete list.
    AutocompleteSelected { text: String },
}

/// Query parameters for the suggestions endpoint.
#[derive(Deserialize, Debug)]
pub struct SuggestionParams {
    pub typed: Option<String>,
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SignalDto {
    SearchTriggered,
    SearchTextCleared,
    LoginRequired,
}

impl From<SearchSignal> for SignalDto {
    fn from(signal: SearchSignal) -> Self {
        match signal {
            SearchSignal::SearchTriggered => SignalDto::SearchTriggered,
            SearchSignal::SearchTextCleared => SignalDto::SearchTextCleared,
            SearchSignal::LoginRequired => SignalDto::LoginRequired,
        }
    }
}

/// The active search after the request was handled.
#[derive(Serialize, Debug, ToSchema)]
pub struct QueryView {
    pub text: String,
    pub domain: DomainDto,
    pub page: u32,
    pub active: bool,
    pub show_results: bool,
}

impl QueryView {
    pub fn new(query: &SearchQuery, show_results: bool) -> Self {
        Self {
            text: query.text.clone(),
            domain: query.domain.into(),
            page: query.page,
            active: query.is_active(),
            show_results,
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct BookmarkView {
    pub id: Uuid,
    pub title: String,
    pub location: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub public: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Bookmark> for BookmarkView {
    fn from(bookmark: Bookmark) -> Self {
        Self {
            id: bookmark.id,
            title: bookmark.title,
            location: bookmark.location,
            description: bookmark.description,
            tags: bookmark.tags,
            public: bookmark.public,
            created_at: bookmark.created_at,
        }
    }
}

/// The response to every search request.
#[derive(Serialize, Debug, ToSchema)]
pub struct SearchResponse {
    pub query: QueryView,
    /// The query string the browser should show, without the leading `?`.
    pub location: String,
    /// How many URL writes the request caused.
    pub navigations: usize,
    /// Set when the client must send the user through the login flow.
    pub login_redirect: Option<String>,
    pub signals: Vec<SignalDto>,
    pub results: Vec<BookmarkView>,
    /// Only present for `save_search` events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved: Option<bool>,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct SuggestionsResponse {
    pub candidates: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_use_snake_case_tags() {
        let event: SearchEvent =
            serde_json::from_str(r#"{"type":"domain_changed","domain":"personal"}"#).unwrap();
        assert!(matches!(
            event,
            SearchEvent::DomainChanged {
                domain: DomainDto::Personal
            }
        ));

        let event: SearchEvent =
            serde_json::from_str(r#"{"type":"page_navigation","caller":"search-results","page":2}"#)
                .unwrap();
        assert!(matches!(event, SearchEvent::PageNavigation { page: 2, .. }));

        let event: SearchEvent = serde_json::from_str(r#"{"type":"clear"}"#).unwrap();
        assert!(matches!(event, SearchEvent::Clear));
    }

    #[test]
    fn unknown_domain_is_rejected() {
        let parsed =
            serde_json::from_str::<SearchEvent>(r#"{"type":"domain_changed","domain":"all"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn signals_serialize_as_snake_case() {
        let json = serde_json::to_string(&SignalDto::from(SearchSignal::SearchTextCleared)).unwrap();
        assert_eq!(json, r#""search_text_cleared""#);
    }
}
