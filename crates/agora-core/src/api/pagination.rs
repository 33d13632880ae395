//! Sequential page walking for list endpoints.

use crate::{
    api::{Outcome, RequestExecutor, RequestOptions},
    types::{Page, SortOrder},
};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Items requested per page.
pub const PAGE_SIZE: usize = 100;

/// First page index sent to the API.
pub const FIRST_PAGE: usize = 1;

/// Limit, search and sort for a list request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Maximum number of items to return. `None` walks every page.
    pub limit: Option<usize>,
    pub search: Option<String>,
    pub sort: Option<SortOrder>,
}

impl ListQuery {
    /// Walks every page.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Interprets the API's signed convention where `-1` means unbounded.
    #[must_use]
    pub fn from_signed_limit(limit: i64) -> Self {
        Self { limit: usize::try_from(limit).ok(), ..Self::default() }
    }

    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    #[must_use]
    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = Some(sort);
        self
    }

    fn page_params(&self, page: usize) -> Vec<(&'static str, String)> {
        let mut params = vec![("page", page.to_string()), ("limit", PAGE_SIZE.to_string())];
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            params.push(("search", search.to_string()));
        }
        if let Some(sort) = self.sort {
            params.push(("sort", sort.as_str().to_string()));
        }
        params
    }

    fn slot_key(&self, prefix: &str, page: usize) -> String {
        format!(
            "{prefix}:{page}:{}:{}",
            self.search.as_deref().unwrap_or_default(),
            self.sort.map(|s| s.as_str()).unwrap_or_default()
        )
    }

    fn is_satisfied_by(&self, count: usize) -> bool {
        self.limit.is_some_and(|limit| count >= limit)
    }
}

/// Fetches every page of `segments` until a short page or the query's limit.
///
/// Pages are requested strictly one after another. Any failing page aborts the walk
/// and its failure is returned in place of the items gathered so far. The result
/// is truncated to the limit even when the last page overshoots it.
///
/// With a `cache_key_prefix`, each page is read from and written to its own
/// named slot on the executor.
pub async fn fetch_all<T>(
    executor: &RequestExecutor,
    cache_key_prefix: Option<&str>,
    segments: &[&str],
    token: Option<&str>,
    query: &ListQuery,
) -> Outcome<Vec<T>>
where
    T: DeserializeOwned,
{
    let mut items: Vec<T> = Vec::new();
    let mut page = FIRST_PAGE;

    loop {
        if query.limit == Some(0) {
            break;
        }

        let url = executor.api_url_with_query(segments, &query.page_params(page));
        let slot = cache_key_prefix.map(|prefix| query.slot_key(prefix, page));
        let outcome = executor
            .execute::<Page<T>>(slot.as_deref(), &url, token, RequestOptions::get())
            .await;

        let batch = match outcome {
            Outcome::Success(Some(batch)) => batch.items,
            Outcome::Success(None) => Vec::new(),
            failure => return failure.discard(),
        };

        let received = batch.len();
        items.extend(batch);
        debug!(page, received, accumulated = items.len(), "fetched list page");

        if received < PAGE_SIZE || query.is_satisfied_by(items.len()) {
            break;
        }
        page += 1;
    }

    if let Some(limit) = query.limit {
        items.truncate(limit);
    }
    Outcome::Success(Some(items))
}
