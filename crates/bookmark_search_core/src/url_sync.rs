//! crates/bookmark_search_core/src/url_sync.rs
//!
//! Keeps the shareable URL in step with the active search.
//!
//! The URL is read exactly once, when the page loads. After that the flow is
//! one-directional: state changes are written to the URL and the URL is never
//! re-read, which rules out feedback loops between the two.

use tracing::debug;

use crate::domain::{SearchQuery, SearchSignal, UrlParams};
use crate::ports::Navigator;

pub const PARAM_TEXT: &str = "q";
pub const PARAM_DOMAIN: &str = "sd";
pub const PARAM_PAGE: &str = "page";

//=========================================================================================
// Query String Codec
//=========================================================================================

/// A set of parameter changes to merge into the current query string.
/// `None` removes the key; unrelated keys are left alone.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryParamsUpdate {
    pub entries: Vec<(String, Option<String>)>,
}

impl QueryParamsUpdate {
    pub fn set(mut self, key: &str, value: impl Into<String>) -> Self {
        self.entries.push((key.to_string(), Some(value.into())));
        self
    }

    pub fn remove(mut self, key: &str) -> Self {
        self.entries.push((key.to_string(), None));
        self
    }
}

/// A flat, ordered `key=value&...` query string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryString {
    pairs: Vec<(String, String)>,
}

impl QueryString {
    /// Parses a raw query string, with or without the leading `?`.
    /// `+` decodes to a space; malformed percent escapes are kept verbatim.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.strip_prefix('?').unwrap_or(raw);
        let pairs = raw
            .split('&')
            .filter(|part| !part.is_empty())
            .map(|part| {
                let (key, value) = part.split_once('=').unwrap_or((part, ""));
                (decode_component(key), decode_component(value))
            })
            .collect();
        Self { pairs }
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Merges `update` in place. Existing keys keep their position.
    pub fn merge(&mut self, update: &QueryParamsUpdate) {
        for (key, value) in &update.entries {
            match value {
                Some(value) => {
                    if let Some(slot) = self.pairs.iter_mut().find(|(k, _)| k == key) {
                        slot.1 = value.clone();
                    } else {
                        self.pairs.push((key.clone(), value.clone()));
                    }
                }
                None => self.pairs.retain(|(k, _)| k != key),
            }
        }
    }

    /// Encodes back to `key=value&...` without a leading `?`.
    pub fn encode(&self) -> String {
        self.pairs
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// The search parameters this query string carries.
    pub fn url_params(&self) -> UrlParams {
        UrlParams {
            q: self.get(PARAM_TEXT).map(str::to_string),
            sd: self.get(PARAM_DOMAIN).map(str::to_string),
            page: self.get(PARAM_PAGE).map(str::to_string),
        }
    }
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

//=========================================================================================
// In-Memory Location
//=========================================================================================

/// A `Navigator` over an owned query string that remembers every navigation.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLocation {
    current: QueryString,
    history: Vec<String>,
}

impl InMemoryLocation {
    pub fn new(raw_query: &str) -> Self {
        Self {
            current: QueryString::parse(raw_query),
            history: Vec::new(),
        }
    }

    pub fn query_string(&self) -> &QueryString {
        &self.current
    }

    /// The encoded query string after every navigation so far.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn navigations(&self) -> usize {
        self.history.len()
    }
}

impl Navigator for InMemoryLocation {
    fn navigate(&mut self, update: &QueryParamsUpdate) {
        self.current.merge(update);
        self.history.push(self.current.encode());
    }
}

//=========================================================================================
// UrlSync
//=========================================================================================

/// What a `UrlSync::write` did to the URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlWrite {
    Written,
    Cleared,
}

impl UrlWrite {
    /// The signal the host view expects once the navigation has happened.
    pub fn signal(&self) -> Option<SearchSignal> {
        match self {
            UrlWrite::Cleared => Some(SearchSignal::SearchTextCleared),
            UrlWrite::Written => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UrlSync {
    snapshot: UrlParams,
}

impl UrlSync {
    pub fn from_params(snapshot: UrlParams) -> Self {
        Self { snapshot }
    }

    pub fn from_query_string(raw: &str) -> Self {
        Self::from_params(QueryString::parse(raw).url_params())
    }

    /// The parameters captured at load time.
    pub fn read(&self) -> &UrlParams {
        &self.snapshot
    }

    /// Writes `query` to the URL through exactly one navigation.
    pub fn write<N: Navigator + ?Sized>(&self, navigator: &mut N, query: &SearchQuery) -> UrlWrite {
        let update = params_for(query);
        navigator.navigate(&update);

        if query.text.is_empty() {
            debug!("Search text empty, cleared search params from URL");
            UrlWrite::Cleared
        } else {
            debug!(
                "Wrote search to URL: sd={} page={}",
                query.domain, query.page
            );
            UrlWrite::Written
        }
    }
}

/// The `q`/`sd`/`page` changes describing `query`.
pub fn params_for(query: &SearchQuery) -> QueryParamsUpdate {
    if query.text.is_empty() {
        QueryParamsUpdate::default()
            .remove(PARAM_TEXT)
            .remove(PARAM_DOMAIN)
            .remove(PARAM_PAGE)
    } else {
        QueryParamsUpdate::default()
            .set(PARAM_TEXT, query.text.clone())
            .set(PARAM_DOMAIN, query.domain.as_str())
            .set(PARAM_PAGE, query.page.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SearchDomain;

    #[test]
    fn parse_decodes_percent_and_plus() {
        let qs = QueryString::parse("?q=rust+async%20io&sd=public&flag");
        assert_eq!(qs.get("q"), Some("rust async io"));
        assert_eq!(qs.get("sd"), Some("public"));
        assert_eq!(qs.get("flag"), Some(""));
        assert_eq!(qs.get("page"), None);
    }

    #[test]
    fn parse_keeps_malformed_escapes() {
        let qs = QueryString::parse("q=100%");
        assert_eq!(qs.get("q"), Some("100%"));
    }

    #[test]
    fn merge_preserves_unrelated_params() {
        let mut qs = QueryString::parse("tab=recent&q=old");
        qs.merge(&QueryParamsUpdate::default().set("q", "new").set("page", "2"));
        assert_eq!(qs.encode(), "tab=recent&q=new&page=2");

        qs.merge(&QueryParamsUpdate::default().remove("q").remove("page"));
        assert_eq!(qs.encode(), "tab=recent");
    }

    #[test]
    fn write_sets_all_three_params() {
        let sync = UrlSync::from_query_string("");
        let mut location = InMemoryLocation::new("lang=en");
        let query = SearchQuery::new("c++ & rust", SearchDomain::Personal, 3);

        assert_eq!(sync.write(&mut location, &query), UrlWrite::Written);
        let qs = location.query_string();
        assert_eq!(qs.get("lang"), Some("en"));
        assert_eq!(qs.get("q"), Some("c++ & rust"));
        assert_eq!(qs.get("sd"), Some("personal"));
        assert_eq!(qs.get("page"), Some("3"));
    }

    #[test]
    fn write_of_empty_text_clears() {
        let sync = UrlSync::from_query_string("q=rust&sd=public&page=2");
        let mut location = InMemoryLocation::new("q=rust&sd=public&page=2&lang=en");

        let outcome = sync.write(&mut location, &SearchQuery::idle(SearchDomain::Public));
        assert_eq!(outcome, UrlWrite::Cleared);
        assert_eq!(outcome.signal(), Some(SearchSignal::SearchTextCleared));
        assert_eq!(location.query_string().encode(), "lang=en");
    }

    #[test]
    fn every_write_is_one_navigation() {
        let sync = UrlSync::from_query_string("");
        let mut location = InMemoryLocation::default();
        let query = SearchQuery::new("rust", SearchDomain::Public, 1);

        sync.write(&mut location, &query);
        sync.write(&mut location, &query);
        sync.write(&mut location, &SearchQuery::idle(SearchDomain::Public));
        assert_eq!(location.navigations(), 3);
        assert_eq!(location.history()[0], location.history()[1]);
    }

    #[test]
    fn read_is_a_load_time_snapshot() {
        let sync = UrlSync::from_query_string("q=rust&page=4");
        let mut location = InMemoryLocation::new("q=rust&page=4");
        sync.write(&mut location, &SearchQuery::new("other", SearchDomain::Public, 1));

        assert_eq!(sync.read().q.as_deref(), Some("rust"));
        assert_eq!(sync.read().page.as_deref(), Some("4"));
    }

    #[test]
    fn write_then_read_round_trips() {
        let query = SearchQuery::new("50% off: naïve search", SearchDomain::Personal, 12);
        let mut location = InMemoryLocation::default();
        UrlSync::from_query_string("").write(&mut location, &query);

        let fresh = UrlSync::from_query_string(&location.query_string().encode());
        assert_eq!(fresh.read().to_query(), Some(query));
    }

    #[test]
    fn cleared_write_reads_back_as_no_search() {
        let mut location = InMemoryLocation::new("q=rust&sd=public&page=2");
        UrlSync::from_query_string("").write(&mut location, &SearchQuery::idle(SearchDomain::Public));

        let fresh = UrlSync::from_query_string(&location.query_string().encode());
        assert_eq!(fresh.read(), &UrlParams::default());
        assert_eq!(fresh.read().to_query(), None);
    }

    #[test]
    fn blank_text_is_written_verbatim_and_reads_back_as_no_search() {
        let query = SearchQuery::new("  ", SearchDomain::Public, 1);
        assert!(!query.is_active());

        let mut location = InMemoryLocation::new("lang=en");
        let outcome = UrlSync::from_query_string("").write(&mut location, &query);
        assert_eq!(outcome, UrlWrite::Written);
        assert_eq!(location.query_string().encode(), "lang=en&q=%20%20&sd=public&page=1");

        // Inactive before the write, inactive after the reload.
        let fresh = UrlSync::from_query_string(&location.query_string().encode());
        assert_eq!(fresh.read().q.as_deref(), Some("  "));
        assert_eq!(fresh.read().text(), None);
        assert_eq!(fresh.read().to_query(), None);
    }
}
