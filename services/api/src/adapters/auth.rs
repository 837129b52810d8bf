//! services/api/src/adapters/auth.rs
//!
//! This module contains the cookie-session auth adapter. It implements the
//! `AuthService` port from the `core` crate on top of a session lookup, so the
//! search engine sees the same "is logged in / who is it" answers it would get
//! from any other identity provider.

use async_trait::async_trait;
use bookmark_search_core::domain::UserInfo;
use bookmark_search_core::ports::{AuthService, PortError, PortResult};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Resolves a session cookie to the user it belongs to.
#[async_trait]
pub trait SessionLookup: Send + Sync {
    /// `Ok(None)` for unknown or expired sessions.
    async fn user_for_session(&self, session_id: &str) -> PortResult<Option<String>>;
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `AuthService` for one request's session cookie.
pub struct CookieAuthAdapter {
    sessions: Arc<dyn SessionLookup>,
    session_id: Option<String>,
    // The lookup runs at most once per request.
    resolved: OnceCell<Option<String>>,
}

impl CookieAuthAdapter {
    /// Creates a new `CookieAuthAdapter`.
    pub fn new(sessions: Arc<dyn SessionLookup>, session_id: Option<String>) -> Self {
        Self {
            sessions,
            session_id,
            resolved: OnceCell::new(),
        }
    }

    async fn user_id(&self) -> PortResult<Option<String>> {
        let Some(session_id) = self.session_id.as_deref() else {
            return Ok(None);
        };
        let user_id = self
            .resolved
            .get_or_try_init(|| self.sessions.user_for_session(session_id))
            .await?;
        Ok(user_id.clone())
    }
}

//=========================================================================================
// `AuthService` Trait Implementation
//=========================================================================================

#[async_trait]
impl AuthService for CookieAuthAdapter {
    async fn is_logged_in(&self) -> PortResult<bool> {
        Ok(self.user_id().await?.is_some())
    }

    async fn user_info(&self) -> PortResult<UserInfo> {
        self.user_id()
            .await?
            .map(|sub| UserInfo { sub })
            .ok_or(PortError::Unauthorized)
    }
}

/// Extracts the `session=` value from a `Cookie` header.
pub fn session_from_cookie_header(cookie_header: &str) -> Option<String> {
    cookie_header
        .split(';')
        .find_map(|c| {
            let c = c.trim();
            c.strip_prefix("session=")
        })
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSessions {
        lookups: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl SessionLookup for CountingSessions {
        async fn user_for_session(&self, session_id: &str) -> PortResult<Option<String>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(PortError::Unexpected("db down".to_string()));
            }
            Ok((session_id == "good").then(|| "user-1".to_string()))
        }
    }

    fn sessions(fail: bool) -> Arc<CountingSessions> {
        Arc::new(CountingSessions {
            lookups: AtomicUsize::new(0),
            fail,
        })
    }

    #[test]
    fn cookie_header_parsing() {
        assert_eq!(
            session_from_cookie_header("theme=dark; session=abc123; lang=en"),
            Some("abc123".to_string())
        );
        assert_eq!(session_from_cookie_header("session="), None);
        assert_eq!(session_from_cookie_header("theme=dark"), None);
    }

    #[tokio::test]
    async fn valid_session_is_looked_up_once() {
        let lookup = sessions(false);
        let adapter = CookieAuthAdapter::new(lookup.clone(), Some("good".to_string()));

        assert!(adapter.is_logged_in().await.unwrap());
        assert_eq!(adapter.user_info().await.unwrap().sub, "user-1");
        assert_eq!(lookup.lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_cookie_is_logged_out_without_lookup() {
        let lookup = sessions(false);
        let adapter = CookieAuthAdapter::new(lookup.clone(), None);

        assert!(!adapter.is_logged_in().await.unwrap());
        assert!(matches!(adapter.user_info().await, Err(PortError::Unauthorized)));
        assert_eq!(lookup.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_session_is_logged_out() {
        let adapter = CookieAuthAdapter::new(sessions(false), Some("stale".to_string()));
        assert!(!adapter.is_logged_in().await.unwrap());
    }

    #[tokio::test]
    async fn lookup_failure_propagates() {
        let adapter = CookieAuthAdapter::new(sessions(true), Some("good".to_string()));
        assert!(matches!(
            adapter.is_logged_in().await,
            Err(PortError::Unexpected(_))
        ));
    }
}
