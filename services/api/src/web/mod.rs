pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod state;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub use middleware::attach_session;
pub use rest::{search_event_handler, search_handler, suggestions_handler};

/// The search API routes, with the session middleware applied.
pub fn router(app_state: Arc<state::AppState>) -> Router {
    Router::new()
        .route("/search", get(search_handler))
        .route("/search/events", post(search_event_handler))
        .route("/search/suggestions", get(suggestions_handler))
        .layer(axum_middleware::from_fn(attach_session))
        .with_state(app_state)
}
