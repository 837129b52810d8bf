//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the search endpoints and the master
//! definition for the OpenAPI specification.
//!
//! Each request restores the page from its URL (`start`), applies at most one
//! event, and answers with the resulting URL, signals and first page of results.

use crate::web::protocol::{
    BookmarkView, DomainDto, QueryView, SearchEvent, SearchResponse, SignalDto, SuggestionParams,
    SuggestionsResponse,
};
use crate::web::state::{AppState, SessionCookie};
use axum::{
    extract::{Query, RawQuery, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use bookmark_search_core::domain::PaginationAction;
use bookmark_search_core::ports::PortError;
use bookmark_search_core::{InMemoryLocation, SearchController, SearchError};
use futures::StreamExt;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::OpenApi;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        search_handler,
        search_event_handler,
        suggestions_handler,
    ),
    components(
        schemas(SearchResponse, SearchEvent, SuggestionsResponse, QueryView, BookmarkView, SignalDto, DomainDto)
    ),
    tags(
        (name = "Bookmark Search API", description = "Search state, URL sync and saved searches.")
    )
)]
pub struct ApiDoc;

type HandlerError = (StatusCode, String);

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Restore a search from its URL.
///
/// The query string is the shareable search URL (`q`, `sd`, `page`). A personal
/// search without a valid session answers with a `login_redirect`.
#[utoipa::path(
    get,
    path = "/search",
    params(
        ("q" = Option<String>, Query, description = "Search text."),
        ("sd" = Option<String>, Query, description = "Search domain: personal or public."),
        ("page" = Option<u32>, Query, description = "1-indexed page.")
    ),
    responses(
        (status = 200, description = "Search state restored", body = SearchResponse),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn search_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionCookie>,
    RawQuery(raw_query): RawQuery,
) -> Result<Json<SearchResponse>, HandlerError> {
    let raw_query = raw_query.unwrap_or_default();
    let mut controller = state.search_controller(session, &raw_query);
    let report = controller.start().await;

    let login_redirect = report
        .login_required
        .then(|| state.login_redirect(&raw_query));
    respond(controller, login_redirect, None).await.map(Json)
}

/// Restore a search from its URL, then apply one user event.
#[utoipa::path(
    post,
    path = "/search/events",
    request_body = SearchEvent,
    responses(
        (status = 200, description = "Event applied", body = SearchResponse),
        (status = 401, description = "The event needs a logged-in user"),
        (status = 404, description = "The selected saved search does not exist"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn search_event_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionCookie>,
    RawQuery(raw_query): RawQuery,
    Json(event): Json<SearchEvent>,
) -> Result<Json<SearchResponse>, HandlerError> {
    let raw_query = raw_query.unwrap_or_default();
    let mut controller = state.search_controller(session, &raw_query);
    let report = controller.start().await;
    let login_redirect = report
        .login_required
        .then(|| state.login_redirect(&raw_query));

    let mut saved = None;
    match event {
        SearchEvent::TextChanged { text } => controller.on_text_changed(text),
        SearchEvent::Submit { text } => {
            controller.submit_search(text);
        }
        SearchEvent::DomainChanged { domain } => {
            controller.on_domain_changed(domain.into());
        }
        SearchEvent::PageNavigation { caller, page } => {
            controller.on_page_navigation(&PaginationAction { caller, page });
        }
        SearchEvent::Clear => controller.clear_search_text(),
        SearchEvent::SaveSearch => {
            saved = Some(
                controller
                    .save_current_search()
                    .await
                    .map_err(search_error_response)?,
            );
        }
        SearchEvent::AutocompleteSelected { text } => {
            controller
                .on_autocomplete_selected(&text)
                .await
                .map_err(search_error_response)?;
        }
    }

    respond(controller, login_redirect, saved).await.map(Json)
}

/// Autocomplete candidates from the user's saved searches.
#[utoipa::path(
    get,
    path = "/search/suggestions",
    params(
        ("typed" = Option<String>, Query, description = "Text typed so far; matched anywhere, ignoring case.")
    ),
    responses(
        (status = 200, description = "Matching saved searches, most recent first", body = SuggestionsResponse),
        (status = 401, description = "No valid session")
    )
)]
pub async fn suggestions_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionCookie>,
    Query(params): Query<SuggestionParams>,
) -> Result<Json<SuggestionsResponse>, HandlerError> {
    let mut controller = state.search_controller(session, "");
    let report = controller.start().await;
    if !report.auth.is_logged_in {
        return Err((StatusCode::UNAUTHORIZED, "Login required".to_string()));
    }

    let candidates = controller.suggestions(params.typed.as_deref());
    Ok(Json(SuggestionsResponse { candidates }))
}

//=========================================================================================
// Helpers
//=========================================================================================

/// Polls the held result stream for its first page and assembles the response.
async fn respond(
    mut controller: SearchController<InMemoryLocation>,
    login_redirect: Option<String>,
    saved: Option<bool>,
) -> Result<SearchResponse, HandlerError> {
    // A cleared search keeps its last stream around; it is not shown.
    let shown = controller.show_results();
    let stream = controller.take_results().filter(|_| shown);
    let results = match stream {
        Some(mut stream) => match stream.next().await {
            Some(Ok(bookmarks)) => bookmarks.into_iter().map(BookmarkView::from).collect(),
            Some(Err(e)) => {
                error!("Failed to fetch search results: {:?}", e);
                return Err((
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to fetch search results".to_string(),
                ));
            }
            None => Vec::new(),
        },
        None => Vec::new(),
    };

    let query = QueryView::new(controller.query(), controller.show_results());
    let signals = controller
        .take_signals()
        .into_iter()
        .map(SignalDto::from)
        .collect();
    let location = controller.navigator();
    info!(
        "Search handled: active={} navigations={} results={}",
        query.active,
        location.navigations(),
        results.len()
    );

    Ok(SearchResponse {
        query,
        location: location.query_string().encode(),
        navigations: location.navigations(),
        login_redirect,
        signals,
        results,
        saved,
    })
}

fn search_error_response(e: SearchError) -> HandlerError {
    match e {
        SearchError::NotFound(text) => (
            StatusCode::NOT_FOUND,
            format!("Saved search not found: {}", text),
        ),
        SearchError::Port(PortError::Unauthorized) => {
            (StatusCode::UNAUTHORIZED, "Login required".to_string())
        }
        other => {
            error!("Search event failed: {:?}", other);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Search event failed".to_string(),
            )
        }
    }
}
