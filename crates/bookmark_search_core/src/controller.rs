//! crates/bookmark_search_core/src/controller.rs
//!
//! The orchestration layer. Wires the auth provider, the recent-search history,
//! the state machine, URL sync and the two fetch collaborators together, and is
//! the only place where a `FetchRequest` is turned into a live result stream.
//!
//! Every event handler runs to completion (including its URL write) before it
//! returns, so two events never interleave their writes.

use chrono::Utc;
use futures::{Stream, StreamExt};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::domain::{
    PaginationAction, ProfileState, SearchDomain, SearchQuery, SearchSignal, SessionAuthState,
    UserSearchProfile,
};
use crate::error::{SearchError, SearchResult};
use crate::ports::{
    AuthService, BookmarkStream, Navigator, PersonalBookmarksService, PortError, PortResult,
    ProfileStore, PublicBookmarksService,
};
use crate::recent_search_index;
use crate::state_machine::{FetchRequest, FetchRoute, SearchPhase, SearchStateMachine};
use crate::url_sync::UrlSync;

/// Caller tag the result paginator attaches to its notifications.
pub const DEFAULT_PAGINATION_CALLER: &str = "search-results";

pub const DEFAULT_PAGE_SIZE: u32 = 10;

//=========================================================================================
// Settings and Ports
//=========================================================================================

#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub page_size: u32,
    /// Only pagination notifications carrying this tag are acted on.
    pub pagination_caller: String,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            pagination_caller: DEFAULT_PAGINATION_CALLER.to_string(),
        }
    }
}

/// The external collaborators a controller talks to.
#[derive(Clone)]
pub struct SearchPorts {
    pub auth: Arc<dyn AuthService>,
    pub personal: Arc<dyn PersonalBookmarksService>,
    pub public: Arc<dyn PublicBookmarksService>,
    pub profiles: Arc<dyn ProfileStore>,
}

/// What happened during `SearchController::start`.
#[derive(Debug, Default)]
pub struct StartupReport {
    pub auth: SessionAuthState,
    pub login_required: bool,
    pub fetched: Option<FetchRoute>,
    /// Set when the auth provider failed and the session was treated as logged out.
    pub degraded: Option<SearchError>,
}

//=========================================================================================
// SearchController
//=========================================================================================

pub struct SearchController<N: Navigator> {
    ports: SearchPorts,
    settings: SearchSettings,
    navigator: N,
    url: UrlSync,
    machine: SearchStateMachine,
    profile: ProfileState,
    candidates: Vec<String>,
    results: Option<BookmarkStream>,
    signals: Vec<SearchSignal>,
}

impl<N: Navigator> SearchController<N> {
    pub fn new(ports: SearchPorts, settings: SearchSettings, url: UrlSync, navigator: N) -> Self {
        Self {
            ports,
            settings,
            navigator,
            url,
            machine: SearchStateMachine::new(),
            profile: ProfileState::NotLoaded,
            candidates: Vec::new(),
            results: None,
            signals: Vec::new(),
        }
    }

    //=====================================================================================
    // Startup
    //=====================================================================================

    /// Resolves the session once, seeds the search from the load-time URL and
    /// fires the initial fetch if the URL carried text.
    pub async fn start(&mut self) -> StartupReport {
        let (auth, degraded) = match resolve_auth(self.ports.auth.as_ref()).await {
            Ok(auth) => (auth, None),
            Err(e) => {
                warn!("Auth check failed, continuing as logged out: {}", e);
                (SessionAuthState::anonymous(), Some(e))
            }
        };

        let params = self.url.read().clone();
        let init = self.machine.initialize(&params, &auth);
        let fetched = init.fetch.map(|request| self.dispatch(request));
        self.signals.extend(self.machine.take_signals());

        if let Some(user_id) = auth.user_id.as_deref() {
            if let Err(e) = self.load_profile(user_id).await {
                warn!("Failed to load search profile for {}: {}", user_id, e);
            }
        }

        StartupReport {
            auth,
            login_required: init.login_required,
            fetched,
            degraded,
        }
    }

    /// Only an answer from the store moves the profile to `Loaded`; a failure
    /// leaves it as it was.
    async fn load_profile(&mut self, user_id: &str) -> PortResult<()> {
        let profile = self
            .ports
            .profiles
            .load_profile(user_id)
            .await?
            .unwrap_or_else(|| UserSearchProfile::empty(user_id));
        self.set_profile(ProfileState::Loaded(profile));
        Ok(())
    }

    //=====================================================================================
    // Search Box Events
    //=====================================================================================

    pub fn on_text_changed(&mut self, text: impl Into<String>) {
        self.machine.set_text(text);
        self.finish_event();
    }

    pub fn clear_search_text(&mut self) {
        self.on_text_changed(String::new());
    }

    /// An explicit search from the box. Starts over at page 1.
    pub fn submit_search(&mut self, text: impl Into<String>) -> Option<FetchRoute> {
        let route = self.machine.submit(text).map(|request| self.dispatch(request));
        self.finish_event();
        route
    }

    pub fn on_domain_changed(&mut self, domain: SearchDomain) -> Option<FetchRoute> {
        let route = self
            .machine
            .set_domain(domain)
            .map(|request| self.dispatch(request));
        self.finish_event();
        route
    }

    //=====================================================================================
    // Pagination
    //=====================================================================================

    /// Applies a paginator click if it is addressed to this controller.
    pub fn on_page_navigation(&mut self, action: &PaginationAction) -> Option<FetchRoute> {
        if action.caller != self.settings.pagination_caller {
            debug!("Ignoring pagination from caller '{}'", action.caller);
            return None;
        }
        let route = self
            .machine
            .set_page(action.page)
            .map(|request| self.dispatch(request));
        self.finish_event();
        route
    }

    /// Applies every notification from `actions` in order until the stream ends.
    /// Returns how many of them triggered a fetch.
    pub async fn pump_pagination<S>(&mut self, mut actions: S) -> usize
    where
        S: Stream<Item = PaginationAction> + Unpin,
    {
        let mut fetched = 0;
        while let Some(action) = actions.next().await {
            if self.on_page_navigation(&action).is_some() {
                fetched += 1;
            }
        }
        fetched
    }

    //=====================================================================================
    // Saved Searches
    //=====================================================================================

    /// Replaces the working copy of the profile and rebuilds the candidates.
    pub fn set_profile(&mut self, profile: ProfileState) {
        self.profile = profile;
        self.candidates = recent_search_index::build_candidates(&self.profile);
    }

    pub fn profile(&self) -> &ProfileState {
        &self.profile
    }

    pub fn suggestions(&self, typed: Option<&str>) -> Vec<String> {
        recent_search_index::filter_candidates(&self.candidates, typed)
    }

    /// Saves the active search at the front of the user's history.
    ///
    /// Returns `Ok(false)` when there is no active search to save.
    pub async fn save_current_search(&mut self) -> SearchResult<bool> {
        let query = self.machine.query().clone();
        if !query.is_active() {
            debug!("Nothing to save, no active search");
            return Ok(false);
        }
        let user_id = self
            .machine
            .user_id()
            .ok_or(PortError::Unauthorized)?
            .to_string();

        // Saves rewrite the whole stored history and must build on a loaded one.
        if self.profile.as_loaded().is_none() {
            if let Err(e) = self.load_profile(&user_id).await {
                error!("Search profile unavailable, not saving: {:?}", e);
                return Err(e.into());
            }
        }

        let profile = recent_search_index::record_save(
            std::mem::take(&mut self.profile),
            &user_id,
            &query,
            Utc::now(),
        );
        let persisted = self.ports.profiles.update_profile(&profile).await;
        self.set_profile(ProfileState::Loaded(profile));

        if let Err(e) = persisted {
            error!("Failed to persist saved search: {:?}", e);
            return Err(e.into());
        }
        info!("Saved search for user {}", user_id);
        Ok(true)
    }

    /// Re-runs a saved search picked from the autocomplete list.
    pub async fn on_autocomplete_selected(&mut self, text: &str) -> SearchResult<Option<FetchRoute>> {
        let known = self
            .profile
            .as_loaded()
            .is_some_and(|p| p.searches.iter().any(|s| s.text == text));
        let profile = match std::mem::take(&mut self.profile) {
            ProfileState::Loaded(profile) if known => profile,
            other => {
                self.profile = other;
                return Err(SearchError::NotFound(text.to_string()));
            }
        };

        let profile = recent_search_index::record_reselect(profile, text, Utc::now())?;
        let persisted = self.ports.profiles.update_profile(&profile).await;
        self.set_profile(ProfileState::Loaded(profile));

        self.machine.set_text(text);
        let route = self
            .machine
            .trigger_fetch()
            .map(|request| self.dispatch(request));
        self.finish_event();

        if let Err(e) = persisted {
            error!("Failed to persist reselected search: {:?}", e);
            return Err(e.into());
        }
        Ok(route)
    }

    //=====================================================================================
    // Outputs
    //=====================================================================================

    pub fn query(&self) -> &SearchQuery {
        self.machine.query()
    }

    pub fn phase(&self) -> SearchPhase {
        self.machine.phase()
    }

    pub fn show_results(&self) -> bool {
        self.machine.show_results()
    }

    /// Hands out the most recently assigned result stream.
    pub fn take_results(&mut self) -> Option<BookmarkStream> {
        self.results.take()
    }

    pub fn take_signals(&mut self) -> Vec<SearchSignal> {
        std::mem::take(&mut self.signals)
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    //=====================================================================================
    // Internals
    //=====================================================================================

    /// Starts the fetch described by `request`, replacing any previous result stream.
    fn dispatch(&mut self, request: FetchRequest) -> FetchRoute {
        let page_size = self.settings.page_size;
        let stream = match &request.route {
            FetchRoute::Personal { user_id } => {
                self.ports
                    .personal
                    .search_personal(&request.text, page_size, request.page, user_id)
            }
            FetchRoute::Public | FetchRoute::PublicFallback => {
                self.ports
                    .public
                    .search_public(&request.text, page_size, request.page)
            }
        };
        debug!("Dispatched {:?} search, page {}", request.route, request.page);
        self.results = Some(stream);
        request.route
    }

    /// Collects the machine's signals and writes the URL if the event changed state.
    fn finish_event(&mut self) {
        self.signals.extend(self.machine.take_signals());
        if self.machine.take_dirty() {
            let outcome = self.url.write(&mut self.navigator, self.machine.query());
            self.signals.extend(outcome.signal());
        }
    }
}

/// Asks the auth provider once for the session state.
async fn resolve_auth(auth: &dyn AuthService) -> SearchResult<SessionAuthState> {
    let logged_in = auth
        .is_logged_in()
        .await
        .map_err(|e| SearchError::AuthUnavailable(e.to_string()))?;
    if !logged_in {
        return Ok(SessionAuthState::anonymous());
    }

    let info = auth
        .user_info()
        .await
        .map_err(|e| SearchError::AuthUnavailable(e.to_string()))?;
    Ok(SessionAuthState::logged_in(info.sub))
}
