//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the bookmark search, profile and session ports. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use bookmark_search_core::domain::{Bookmark, SavedSearch, UserSearchProfile};
use bookmark_search_core::ports::{
    BookmarkStream, PersonalBookmarksService, PortError, PortResult, ProfileStore,
    PublicBookmarksService,
};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::debug;
use uuid::Uuid;

use crate::adapters::auth::SessionLookup;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the search, profile and session ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct BookmarkRecord {
    id: Uuid,
    title: String,
    location: String,
    description: Option<String>,
    tags: Vec<String>,
    user_id: String,
    public: bool,
    created_at: DateTime<Utc>,
}
impl BookmarkRecord {
    fn to_domain(self) -> Bookmark {
        Bookmark {
            id: self.id,
            title: self.title,
            location: self.location,
            description: self.description,
            tags: self.tags,
            user_id: self.user_id,
            public: self.public,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct SavedSearchRecord {
    text: String,
    domain: String,
    created_at: DateTime<Utc>,
    last_accessed_at: DateTime<Utc>,
    count: Option<i32>,
}
impl SavedSearchRecord {
    fn to_domain(self) -> SavedSearch {
        SavedSearch {
            text: self.text,
            domain: self.domain,
            created_at: self.created_at,
            last_accessed_at: self.last_accessed_at,
            count: self.count.and_then(|c| u32::try_from(c).ok()),
        }
    }
}

//=========================================================================================
// Queries
//=========================================================================================

const PUBLIC_SEARCH_SQL: &str = r#"
    SELECT b.id, b.title, b.location, b.description, b.tags, b.user_id, b.public, b.created_at
    FROM bookmarks b
    WHERE b.public
      AND (b.title ILIKE $1 OR b.description ILIKE $1 OR $2 = ANY(b.tags))
    ORDER BY b.created_at DESC
    LIMIT $3 OFFSET $4
"#;

const PERSONAL_SEARCH_SQL: &str = r#"
    SELECT b.id, b.title, b.location, b.description, b.tags, b.user_id, b.public, b.created_at
    FROM bookmarks b
    WHERE (b.user_id = $5
           OR b.id IN (SELECT f.bookmark_id FROM favorites f WHERE f.user_id = $5))
      AND (b.title ILIKE $1 OR b.description ILIKE $1 OR $2 = ANY(b.tags))
    ORDER BY b.created_at DESC
    LIMIT $3 OFFSET $4
"#;

/// Bind values shared by both search queries.
struct SearchBinds {
    pattern: String,
    tag: String,
    limit: i64,
    offset: i64,
}

impl SearchBinds {
    fn new(text: &str, page_size: u32, page: u32) -> Self {
        let limit = i64::from(page_size);
        Self {
            pattern: like_pattern(text),
            tag: text.trim().to_lowercase(),
            limit,
            offset: i64::from(page.saturating_sub(1)) * limit,
        }
    }
}

/// `%text%` with LIKE wildcards in the user's text escaped.
fn like_pattern(text: &str) -> String {
    let escaped = text
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Runs one search query lazily: nothing touches the pool until the stream is polled.
fn search_stream(pool: PgPool, sql: &'static str, binds: SearchBinds, user_id: Option<String>) -> BookmarkStream {
    Box::pin(async_stream::stream! {
        let mut query = sqlx::query_as::<_, BookmarkRecord>(sql)
            .bind(binds.pattern)
            .bind(binds.tag)
            .bind(binds.limit)
            .bind(binds.offset);
        if let Some(user_id) = user_id {
            query = query.bind(user_id);
        }
        let page = query
            .fetch_all(&pool)
            .await
            .map(|rows| rows.into_iter().map(BookmarkRecord::to_domain).collect::<Vec<_>>())
            .map_err(|e| PortError::Unexpected(e.to_string()));
        yield page;
    })
}

//=========================================================================================
// Bookmark Search Port Implementations
//=========================================================================================

impl PublicBookmarksService for DbAdapter {
    fn search_public(&self, text: &str, page_size: u32, page: u32) -> BookmarkStream {
        debug!("Public bookmark search, page {}", page);
        search_stream(
            self.pool.clone(),
            PUBLIC_SEARCH_SQL,
            SearchBinds::new(text, page_size, page),
            None,
        )
    }
}

impl PersonalBookmarksService for DbAdapter {
    fn search_personal(
        &self,
        text: &str,
        page_size: u32,
        page: u32,
        user_id: &str,
    ) -> BookmarkStream {
        debug!("Personal bookmark search for {}, page {}", user_id, page);
        search_stream(
            self.pool.clone(),
            PERSONAL_SEARCH_SQL,
            SearchBinds::new(text, page_size, page),
            Some(user_id.to_string()),
        )
    }
}

//=========================================================================================
// `ProfileStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl ProfileStore for DbAdapter {
    async fn load_profile(&self, user_id: &str) -> PortResult<Option<UserSearchProfile>> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM search_profiles WHERE user_id = $1)",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        if !exists {
            return Ok(None);
        }

        let records = sqlx::query_as::<_, SavedSearchRecord>(
            "SELECT text, domain, created_at, last_accessed_at, count
             FROM user_searches WHERE user_id = $1 ORDER BY position",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(Some(UserSearchProfile {
            user_id: user_id.to_string(),
            searches: records.into_iter().map(SavedSearchRecord::to_domain).collect(),
        }))
    }

    /// Replaces the stored list with `profile`, keeping its order.
    async fn update_profile(&self, profile: &UserSearchProfile) -> PortResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        sqlx::query(
            "INSERT INTO search_profiles (user_id, updated_at) VALUES ($1, NOW())
             ON CONFLICT (user_id) DO UPDATE SET updated_at = NOW()",
        )
        .bind(&profile.user_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        sqlx::query("DELETE FROM user_searches WHERE user_id = $1")
            .bind(&profile.user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        for (position, search) in profile.searches.iter().enumerate() {
            sqlx::query(
                "INSERT INTO user_searches
                    (user_id, position, text, domain, created_at, last_accessed_at, count)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(&profile.user_id)
            .bind(position as i32)
            .bind(&search.text)
            .bind(&search.domain)
            .bind(search.created_at)
            .bind(search.last_accessed_at)
            .bind(search.count.map(|c| i32::try_from(c).unwrap_or(i32::MAX)))
            .execute(&mut *tx)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }
}

//=========================================================================================
// `SessionLookup` Trait Implementation
//=========================================================================================

#[async_trait]
impl SessionLookup for DbAdapter {
    async fn user_for_session(&self, session_id: &str) -> PortResult<Option<String>> {
        sqlx::query_scalar::<_, String>(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" rust "), "%rust%");
        assert_eq!(like_pattern("100%_done"), "%100\\%\\_done%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn binds_page_to_offset() {
        let binds = SearchBinds::new("Rust", 10, 3);
        assert_eq!(binds.limit, 10);
        assert_eq!(binds.offset, 20);
        assert_eq!(binds.tag, "rust");

        assert_eq!(SearchBinds::new("x", 10, 1).offset, 0);
        assert_eq!(SearchBinds::new("x", 10, 0).offset, 0);
    }
}
