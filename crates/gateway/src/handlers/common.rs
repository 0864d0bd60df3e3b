//! Pieces shared by the list endpoints

use axum::http::Uri;
use serde::{Deserialize, Deserializer, Serialize};
use yamdb_common::{
    errors::Result,
    pagination::{Page, PageRequest},
};

use crate::AppState;

/// `?page=&search=` on the simple list endpoints
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<u64>,
    pub search: Option<String>,
}

/// Paginated list envelope
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Paginated<T> {
    /// Wrap a page, linking neighbours relative to the request URI
    pub fn new(page: Page<T>, uri: &Uri) -> Self {
        let next = page.has_next().then(|| page_link(uri, page.page + 1));
        let previous = page.has_previous().then(|| page_link(uri, page.page - 1));

        Self {
            count: page.total,
            next,
            previous,
            results: page.items,
        }
    }
}

/// Page request from the query and the configured page size
pub fn page_request(state: &AppState, page: Option<u64>) -> Result<PageRequest> {
    PageRequest::new(page, state.config.pagination.page_size)
}

/// For PATCH fields where `null` and absent differ: absent is `None`,
/// `null` is `Some(None)`. Pair with `#[serde(default)]`.
pub fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Same path and query with `page` replaced; page 1 drops the parameter
fn page_link(uri: &Uri, page: u64) -> String {
    let mut params: Vec<String> = uri
        .query()
        .unwrap_or_default()
        .split('&')
        .filter(|p| !p.is_empty() && *p != "page" && !p.starts_with("page="))
        .map(str::to_owned)
        .collect();

    if page > 1 {
        params.push(format!("page={}", page));
    }

    if params.is_empty() {
        uri.path().to_string()
    } else {
        format!("{}?{}", uri.path(), params.join("&"))
    }
}
