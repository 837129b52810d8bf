pub mod controller;
pub mod domain;
pub mod error;
pub mod ports;
pub mod recent_search_index;
pub mod state_machine;
pub mod url_sync;

pub use controller::{SearchController, SearchPorts, SearchSettings, StartupReport};
pub use domain::{
    Bookmark, PaginationAction, ProfileState, SavedSearch, SearchDomain, SearchQuery,
    SearchSignal, SessionAuthState, UrlParams, UserInfo, UserSearchProfile,
};
pub use error::{SearchError, SearchResult};
pub use ports::{
    AuthService, BookmarkStream, Navigator, PersonalBookmarksService, PortError, PortResult,
    ProfileStore, PublicBookmarksService,
};
pub use state_machine::{FetchRequest, FetchRoute, SearchPhase, SearchStateMachine};
pub use url_sync::{InMemoryLocation, QueryParamsUpdate, QueryString, UrlSync, UrlWrite};
