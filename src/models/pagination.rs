//! Pagination types for list queries

use serde::{Deserialize, Serialize};

use crate::db::Page;

/// Pagination parameters for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: i64,
    /// Number of items per page
    pub limit: i64,
}

impl Default for ListParams {
    fn default() -> Self {
        Self { page: 1, limit: 10 }
    }
}

impl ListParams {
    /// Largest page size any endpoint serves
    pub const MAX_LIMIT: i64 = 100;

    /// Create pagination parameters, clamping out-of-range values
    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, Self::MAX_LIMIT),
        }
    }

    /// Build from optional query values with an endpoint-specific default size
    pub fn from_query(page: Option<i64>, limit: Option<i64>, default_limit: i64) -> Self {
        Self::new(page.unwrap_or(1), limit.unwrap_or(default_limit))
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn as_page(&self) -> Page {
        Page {
            limit: self.limit,
            offset: self.offset(),
        }
    }
}

/// Pagination block returned next to list data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(params: &ListParams, total: i64) -> Self {
        let pages = if params.limit > 0 {
            (total + params.limit - 1) / params.limit
        } else {
            0
        };
        Self {
            page: params.page,
            limit: params.limit,
            total,
            pages,
        }
    }
}

/// Paginated result container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            pagination: Pagination::new(params, total),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedResult<U> {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_defaults_and_clamping() {
        let params = ListParams::from_query(None, None, 20);
        assert_eq!(params, ListParams { page: 1, limit: 20 });

        let params = ListParams::new(0, 1000);
        assert_eq!(params.page, 1);
        assert_eq!(params.limit, ListParams::MAX_LIMIT);
        assert_eq!(ListParams::new(-5, -1).limit, 1);
    }

    #[test]
    fn test_offset() {
        assert_eq!(ListParams::new(1, 10).offset(), 0);
        assert_eq!(ListParams::new(3, 10).offset(), 20);
    }

    #[test]
    fn test_pages_rounds_up() {
        let params = ListParams::new(1, 10);
        assert_eq!(Pagination::new(&params, 0).pages, 0);
        assert_eq!(Pagination::new(&params, 10).pages, 1);
        assert_eq!(Pagination::new(&params, 11).pages, 2);
    }

    proptest! {
        #[test]
        fn pages_cover_total(total in 0i64..100_000, limit in 1i64..=100) {
            let params = ListParams::new(1, limit);
            let pagination = Pagination::new(&params, total);
            prop_assert!(pagination.pages * limit >= total);
            prop_assert!((pagination.pages - 1).max(0) * limit < total.max(1));
        }
    }
}
