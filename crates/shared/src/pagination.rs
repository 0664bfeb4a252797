//! Offset-based pagination utilities.

use serde::Serialize;

/// Default page size when the client does not supply one.
pub const DEFAULT_PER_PAGE: i64 = 20;

/// Upper bound on the page size.
pub const MAX_PER_PAGE: i64 = 100;

/// Validated pagination parameters.
///
/// `page` defaults to 1, `per_page` is clamped to `[1, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    pub page: i64,
    pub per_page: i64,
}

impl PageParams {
    /// Builds parameters from raw query values, applying defaults and
    /// discarding out-of-range values.
    pub fn from_query(page: Option<i64>, per_page: Option<i64>) -> Self {
        let page = match page {
            Some(p) if p >= 1 => p,
            _ => 1,
        };
        let per_page = match per_page {
            Some(pp) if (1..=MAX_PER_PAGE).contains(&pp) => pp,
            _ => DEFAULT_PER_PAGE,
        };
        PageParams { page, per_page }
    }

    /// Row offset for the current page.
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }
}

/// Paginated response envelope.
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl<T> Paginated<T> {
    pub fn new(data: Vec<T>, params: PageParams, total: i64) -> Self {
        let total_pages = ((total + params.per_page - 1) / params.per_page).max(1);
        Paginated {
            data,
            page: params.page,
            per_page: params.per_page,
            total,
            total_pages,
        }
    }
}
