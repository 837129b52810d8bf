//! crates/bookmark_search_core/src/recent_search_index.rs
//!
//! The user's history of saved searches and the autocomplete candidates derived
//! from it. Every operation takes the profile by value and hands back the updated
//! one, so the caller always holds the only copy.

use chrono::{DateTime, Utc};

use crate::domain::{ProfileState, SavedSearch, SearchQuery, UserSearchProfile};
use crate::error::{SearchError, SearchResult};

/// Autocomplete candidates, most-recent-first.
pub fn build_candidates(profile: &ProfileState) -> Vec<String> {
    match profile {
        ProfileState::Loaded(profile) => profile
            .searches
            .iter()
            .map(|search| search.text.clone())
            .collect(),
        ProfileState::NotLoaded => Vec::new(),
    }
}

/// Case-insensitive substring match of `typed` against every candidate.
///
/// A missing or empty `typed` value returns every candidate unchanged.
pub fn filter_candidates(candidates: &[String], typed: Option<&str>) -> Vec<String> {
    match typed.filter(|t| !t.is_empty()) {
        Some(typed) => {
            let needle = typed.to_lowercase();
            candidates
                .iter()
                .filter(|candidate| candidate.to_lowercase().contains(&needle))
                .cloned()
                .collect()
        }
        None => candidates.to_vec(),
    }
}

/// Prepends `query` as a new saved search. Identical texts are not merged here.
pub fn record_save(
    profile: ProfileState,
    user_id: &str,
    query: &SearchQuery,
    now: DateTime<Utc>,
) -> UserSearchProfile {
    let entry = SavedSearch {
        text: query.text.clone(),
        domain: query.domain.as_str().to_string(),
        created_at: now,
        last_accessed_at: now,
        count: Some(1),
    };

    match profile {
        ProfileState::NotLoaded => UserSearchProfile {
            user_id: user_id.to_string(),
            searches: vec![entry],
        },
        ProfileState::Loaded(mut profile) => {
            profile.searches.insert(0, entry);
            profile
        }
    }
}

/// Moves the first entry whose text equals `text` to the front, bumping its count
/// and access time.
pub fn record_reselect(
    mut profile: UserSearchProfile,
    text: &str,
    now: DateTime<Utc>,
) -> SearchResult<UserSearchProfile> {
    let index = profile
        .searches
        .iter()
        .position(|search| search.text == text)
        .ok_or_else(|| SearchError::NotFound(text.to_string()))?;

    let mut entry = profile.searches.remove(index);
    entry.last_accessed_at = now;
    entry.count = Some(entry.count.map_or(1, |count| count + 1));
    profile.searches.insert(0, entry);

    Ok(profile)
}
