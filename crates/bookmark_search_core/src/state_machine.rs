//! crates/bookmark_search_core/src/state_machine.rs
//!
//! Owns the canonical (text, domain, page) triple and decides when results are
//! (re)computed and which collaborator computes them. The machine itself performs
//! no I/O: a triggered fetch comes back as a `FetchRequest` for the caller to run.

use tracing::{debug, info, warn};

use crate::domain::{SearchDomain, SearchQuery, SearchSignal, SessionAuthState, UrlParams};

/// Coarse state of the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    /// No query text.
    Idle,
    /// Text, domain and page are resolved.
    Searching,
}

/// Which collaborator serves a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchRoute {
    Personal { user_id: String },
    Public,
    /// Domain says personal but no user id is known yet, so the public
    /// collaborator answers instead.
    PublicFallback,
}

impl FetchRoute {
    pub fn is_personal(&self) -> bool {
        matches!(self, FetchRoute::Personal { .. })
    }
}

/// A fetch the caller must dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub route: FetchRoute,
    pub text: String,
    pub page: u32,
}

/// Result of seeding the machine from the URL.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Initialized {
    /// The caller must redirect to the login flow.
    pub login_required: bool,
    pub fetch: Option<FetchRequest>,
}

#[derive(Debug, Clone)]
pub struct SearchStateMachine {
    query: SearchQuery,
    user_id: Option<String>,
    show_results: bool,
    dirty: bool,
    signals: Vec<SearchSignal>,
}

impl Default for SearchStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchStateMachine {
    pub fn new() -> Self {
        Self {
            query: SearchQuery::idle(SearchDomain::Public),
            user_id: None,
            show_results: false,
            dirty: false,
            signals: Vec::new(),
        }
    }

    //=====================================================================================
    // Accessors
    //=====================================================================================

    pub fn query(&self) -> &SearchQuery {
        &self.query
    }

    pub fn phase(&self) -> SearchPhase {
        if self.query.is_active() {
            SearchPhase::Searching
        } else {
            SearchPhase::Idle
        }
    }

    pub fn show_results(&self) -> bool {
        self.show_results
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Returns whether state changed since the last URL write, and resets the flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Drains the signals emitted so far, oldest first.
    pub fn take_signals(&mut self) -> Vec<SearchSignal> {
        std::mem::take(&mut self.signals)
    }

    //=====================================================================================
    // Transitions
    //=====================================================================================

    /// Seeds the machine from the load-time URL and the resolved auth state.
    ///
    /// The URL is the source here, so nothing is marked dirty.
    pub fn initialize(&mut self, params: &UrlParams, auth: &SessionAuthState) -> Initialized {
        self.user_id = if auth.is_logged_in {
            auth.user_id.clone()
        } else {
            None
        };
        self.query.text = params.q.clone().unwrap_or_default();
        self.query.page = params.page_number();
        self.show_results = false;
        self.dirty = false;

        let has_text = params.text().is_some();
        let explicit = params.sd.as_deref().map(|sd| {
            SearchDomain::parse(sd).unwrap_or_else(|| {
                warn!("Unknown search domain '{}' in URL, using public", sd);
                SearchDomain::Public
            })
        });
        self.query.domain = match explicit {
            Some(domain) => domain,
            // Without a query an authenticated user lands on their own bookmarks.
            None if auth.is_logged_in && !has_text => SearchDomain::Personal,
            None => SearchDomain::Public,
        };
        debug!(
            "Search initialised: domain={} page={} has_text={}",
            self.query.domain, self.query.page, has_text
        );

        let login_required = self.query.domain == SearchDomain::Personal && !auth.is_logged_in;
        if login_required {
            info!("Personal search requested without a session, login required");
            self.signals.push(SearchSignal::LoginRequired);
        }

        let fetch = if has_text { self.trigger_fetch() } else { None };

        Initialized {
            login_required,
            fetch,
        }
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.query.text = text.into();
        if self.query.text.trim().is_empty() {
            self.show_results = false;
        }
        self.dirty = true;
    }

    /// Switches domain, re-fetching when there is text. The page is kept.
    pub fn set_domain(&mut self, domain: SearchDomain) -> Option<FetchRequest> {
        self.query.domain = domain;
        self.dirty = true;
        if self.query.is_active() {
            self.trigger_fetch()
        } else {
            None
        }
    }

    /// Moves to page `page` (1-indexed; zero is treated as 1) and re-fetches.
    /// Without an active search there is nothing to page through, and nothing changes.
    pub fn set_page(&mut self, page: u32) -> Option<FetchRequest> {
        if !self.query.is_active() {
            debug!("No active search, ignoring move to page {}", page);
            return None;
        }
        self.query.page = page.max(1);
        self.dirty = true;
        self.trigger_fetch()
    }

    /// An explicit search from the box: back to the first page, then fetch.
    pub fn submit(&mut self, text: impl Into<String>) -> Option<FetchRequest> {
        self.set_text(text);
        self.query.page = 1;
        self.trigger_fetch()
    }

    /// Picks the collaborator for the current query, or does nothing for blank text.
    pub fn trigger_fetch(&mut self) -> Option<FetchRequest> {
        if !self.query.is_active() {
            self.show_results = false;
            return None;
        }

        let route = match self.query.domain {
            SearchDomain::Public => FetchRoute::Public,
            SearchDomain::Personal => match &self.user_id {
                Some(user_id) => FetchRoute::Personal {
                    user_id: user_id.clone(),
                },
                None => {
                    debug!("No user id yet, personal search falls back to public");
                    FetchRoute::PublicFallback
                }
            },
        };

        self.show_results = true;
        self.signals.push(SearchSignal::SearchTriggered);

        Some(FetchRequest {
            route,
            text: self.query.text.clone(),
            page: self.query.page,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(q: Option<&str>, sd: Option<&str>, page: Option<&str>) -> UrlParams {
        UrlParams {
            q: q.map(str::to_string),
            sd: sd.map(str::to_string),
            page: page.map(str::to_string),
        }
    }

    fn searching(text: &str, domain: SearchDomain, user: Option<&str>) -> SearchStateMachine {
        let mut machine = SearchStateMachine::new();
        let auth = match user {
            Some(user) => SessionAuthState::logged_in(user),
            None => SessionAuthState::anonymous(),
        };
        machine.initialize(&params(None, Some(domain.as_str()), None), &auth);
        machine.set_text(text);
        machine.take_dirty();
        machine.take_signals();
        machine
    }

    #[test]
    fn shared_link_logged_out_searches_public() {
        let mut machine = SearchStateMachine::new();
        let init = machine.initialize(
            &params(Some("rust"), Some("public"), Some("2")),
            &SessionAuthState::anonymous(),
        );

        assert!(!init.login_required);
        assert_eq!(
            init.fetch,
            Some(FetchRequest {
                route: FetchRoute::Public,
                text: "rust".to_string(),
                page: 2,
            })
        );
        assert_eq!(machine.phase(), SearchPhase::Searching);
        assert_eq!(machine.query(), &SearchQuery::new("rust", SearchDomain::Public, 2));
        assert_eq!(machine.take_signals(), vec![SearchSignal::SearchTriggered]);
        assert!(!machine.take_dirty());
    }

    #[test]
    fn personal_domain_logged_out_requires_login() {
        let mut machine = SearchStateMachine::new();
        let init = machine.initialize(
            &params(None, Some("personal"), None),
            &SessionAuthState::anonymous(),
        );

        assert!(init.login_required);
        assert_eq!(init.fetch, None);
        assert_eq!(machine.phase(), SearchPhase::Idle);
        assert_eq!(machine.take_signals(), vec![SearchSignal::LoginRequired]);
    }

    #[test]
    fn personal_with_text_logged_out_still_fetches_public() {
        let mut machine = SearchStateMachine::new();
        let init = machine.initialize(
            &params(Some("rust"), Some("personal"), None),
            &SessionAuthState::anonymous(),
        );

        assert!(init.login_required);
        assert_eq!(init.fetch.map(|f| f.route), Some(FetchRoute::PublicFallback));
        assert_eq!(machine.query().domain, SearchDomain::Personal);
        assert_eq!(
            machine.take_signals(),
            vec![SearchSignal::LoginRequired, SearchSignal::SearchTriggered]
        );
    }

    #[test]
    fn empty_url_logged_in_defaults_to_personal() {
        let mut machine = SearchStateMachine::new();
        let init = machine.initialize(&UrlParams::default(), &SessionAuthState::logged_in("u1"));

        assert_eq!(init, Initialized::default());
        assert_eq!(machine.query().domain, SearchDomain::Personal);
        assert_eq!(machine.query().page, 1);
        assert!(machine.take_signals().is_empty());
    }

    #[test]
    fn empty_url_logged_out_defaults_to_public() {
        let mut machine = SearchStateMachine::new();
        let init = machine.initialize(&UrlParams::default(), &SessionAuthState::anonymous());

        assert!(!init.login_required);
        assert_eq!(machine.query().domain, SearchDomain::Public);
    }

    #[test]
    fn text_without_domain_logged_in_searches_public() {
        let mut machine = SearchStateMachine::new();
        let init = machine.initialize(
            &params(Some("tokio"), None, None),
            &SessionAuthState::logged_in("u1"),
        );

        assert_eq!(machine.query().domain, SearchDomain::Public);
        assert_eq!(init.fetch.map(|f| f.route), Some(FetchRoute::Public));
    }

    #[test]
    fn explicit_personal_domain_logged_in_routes_personal() {
        let mut machine = SearchStateMachine::new();
        let init = machine.initialize(
            &params(Some("tokio"), Some("personal"), Some("3")),
            &SessionAuthState::logged_in("u1"),
        );

        assert_eq!(
            init.fetch,
            Some(FetchRequest {
                route: FetchRoute::Personal {
                    user_id: "u1".to_string()
                },
                text: "tokio".to_string(),
                page: 3,
            })
        );
    }

    #[test]
    fn unknown_domain_resolves_to_public() {
        let mut machine = SearchStateMachine::new();
        let init = machine.initialize(
            &params(Some("x"), Some("everything"), None),
            &SessionAuthState::logged_in("u1"),
        );
        assert_eq!(machine.query().domain, SearchDomain::Public);
        assert_eq!(init.fetch.map(|f| f.route), Some(FetchRoute::Public));
    }

    #[test]
    fn blank_text_never_fetches() {
        for text in ["", " ", "\t\n "] {
            let mut machine = searching("rust", SearchDomain::Public, None);
            assert!(machine.trigger_fetch().is_some());
            machine.take_signals();

            machine.set_text(text);
            assert_eq!(machine.trigger_fetch(), None);
            assert!(!machine.show_results());
            assert_eq!(machine.phase(), SearchPhase::Idle);
            assert!(machine.take_signals().is_empty());
        }
    }

    #[test]
    fn trigger_emits_one_signal_per_route() {
        let mut machine = searching("rust", SearchDomain::Personal, Some("u1"));
        let request = machine.trigger_fetch().unwrap();

        assert!(request.route.is_personal());
        assert!(machine.show_results());
        assert_eq!(machine.take_signals(), vec![SearchSignal::SearchTriggered]);
    }

    #[test]
    fn domain_switch_refetches_without_resetting_page() {
        let mut machine = searching("foo", SearchDomain::Public, Some("u1"));
        machine.set_page(4);
        machine.take_signals();

        let request = machine.set_domain(SearchDomain::Personal).unwrap();
        assert_eq!(
            request,
            FetchRequest {
                route: FetchRoute::Personal {
                    user_id: "u1".to_string()
                },
                text: "foo".to_string(),
                page: 4,
            }
        );
        assert!(machine.take_dirty());
        assert_eq!(machine.take_signals(), vec![SearchSignal::SearchTriggered]);
    }

    #[test]
    fn domain_switch_without_text_only_marks_dirty() {
        let mut machine = searching("", SearchDomain::Public, Some("u1"));
        assert_eq!(machine.set_domain(SearchDomain::Personal), None);
        assert!(machine.take_dirty());
        assert!(machine.take_signals().is_empty());
    }

    #[test]
    fn set_page_keeps_text_and_domain() {
        let mut machine = searching("foo", SearchDomain::Public, None);
        let request = machine.set_page(0).unwrap();

        assert_eq!(request.page, 1);
        assert_eq!(request.text, "foo");
        assert_eq!(request.route, FetchRoute::Public);
    }

    #[test]
    fn set_page_without_text_changes_nothing() {
        let mut machine = searching("", SearchDomain::Public, None);
        assert_eq!(machine.set_page(3), None);
        assert_eq!(machine.query().page, 1);
        assert!(!machine.take_dirty());
        assert!(machine.take_signals().is_empty());
    }

    #[test]
    fn submit_resets_page() {
        let mut machine = searching("foo", SearchDomain::Public, None);
        machine.set_page(5);

        let request = machine.submit("bar").unwrap();
        assert_eq!(request.page, 1);
        assert_eq!(machine.query().text, "bar");
        assert!(machine.take_dirty());
    }

    #[test]
    fn set_text_marks_dirty_once() {
        let mut machine = SearchStateMachine::new();
        machine.set_text("a");
        assert!(machine.take_dirty());
        assert!(!machine.take_dirty());
    }
}
