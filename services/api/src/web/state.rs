//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the per-request search controller.

use crate::adapters::auth::{CookieAuthAdapter, SessionLookup};
use crate::config::Config;
use bookmark_search_core::ports::{PersonalBookmarksService, ProfileStore, PublicBookmarksService};
use bookmark_search_core::{InMemoryLocation, SearchController, SearchPorts, UrlSync};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: Arc<dyn SessionLookup>,
    pub personal: Arc<dyn PersonalBookmarksService>,
    pub public: Arc<dyn PublicBookmarksService>,
    pub profiles: Arc<dyn ProfileStore>,
}

/// The session cookie of the current request, if any.
#[derive(Clone, Debug, Default)]
pub struct SessionCookie(pub Option<String>);

//=========================================================================================
// Per-Request Controller
//=========================================================================================

impl AppState {
    /// Builds a controller for one request, seeded from its raw query string.
    pub fn search_controller(
        &self,
        session: SessionCookie,
        raw_query: &str,
    ) -> SearchController<InMemoryLocation> {
        let ports = SearchPorts {
            auth: Arc::new(CookieAuthAdapter::new(self.sessions.clone(), session.0)),
            personal: self.personal.clone(),
            public: self.public.clone(),
            profiles: self.profiles.clone(),
        };
        SearchController::new(
            ports,
            self.config.search_settings(),
            UrlSync::from_query_string(raw_query),
            InMemoryLocation::new(raw_query),
        )
    }

    /// Where to send a user who needs to log in, returning to `raw_query` afterwards.
    pub fn login_redirect(&self, raw_query: &str) -> String {
        let back = format!("/search?{}", raw_query);
        format!(
            "{}?redirect={}",
            self.config.login_url,
            urlencoding::encode(&back)
        )
    }
}
