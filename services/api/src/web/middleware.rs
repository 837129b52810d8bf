//! services/api/src/web/middleware.rs
//!
//! Session middleware. Search pages are public, so a missing or unknown cookie
//! is not rejected here; the auth adapter decides what it means.

use axum::{
    extract::Request,
    http::header,
    middleware::Next,
    response::Response,
};

use crate::adapters::auth::session_from_cookie_header;
use crate::web::state::SessionCookie;

/// Middleware that extracts the session cookie into a `SessionCookie` extension.
pub async fn attach_session(mut req: Request, next: Next) -> Response {
    let session_id = req
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(session_from_cookie_header);

    req.extensions_mut().insert(SessionCookie(session_id));

    next.run(req).await
}
