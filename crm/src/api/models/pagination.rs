//! Shared pagination types for API query parameters.
//!
//! Every list endpoint takes page-based pagination through `page` and `limit` and answers with
//! `{ <entities>, total, page, totalPages }`.

use serde::Deserialize;
use serde_with::{DisplayFromStr, serde_as};
use utoipa::{IntoParams, ToSchema};

/// Default number of items to return per page.
pub const DEFAULT_LIMIT: i64 = 10;

/// Maximum number of items that can be requested per page.
pub const MAX_LIMIT: i64 = 100;

/// Standard pagination parameters for list endpoints.
///
/// - `page`: 1-based page number (default: 1)
/// - `limit`: Maximum items to return (default: 10, max: 100)
///
/// Query structs flatten this in, which makes serde see every value as a string; hence
/// `DisplayFromStr`.
#[serde_as]
#[derive(Debug, Default, Clone, Deserialize, IntoParams, ToSchema)]
pub struct Pagination {
    /// Page number, starting at 1 (default: 1)
    #[param(default = 1, minimum = 1)]
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub page: Option<i64>,

    /// Maximum number of items to return (default: 10, max: 100)
    #[param(default = 10, minimum = 1, maximum = 100)]
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub limit: Option<i64>,
}

impl Pagination {
    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: Some(page),
            limit: Some(limit),
        }
    }

    /// Get the page, defaulting to 1 and never below it.
    #[inline]
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    /// Get the limit value, clamped between 1 and MAX_LIMIT.
    /// Defaults to DEFAULT_LIMIT if not specified.
    #[inline]
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    /// Number of rows to skip for the requested page.
    #[inline]
    pub fn skip(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.limit())
    }

    /// `(skip, limit)`, the shape repository filters take.
    #[inline]
    pub fn params(&self) -> (i64, i64) {
        (self.skip(), self.limit())
    }

    /// Pages needed to show `total` rows at the current limit.
    #[inline]
    pub fn total_pages(&self, total: i64) -> i64 {
        if total <= 0 {
            return 0;
        }
        let limit = self.limit();
        (total + limit - 1) / limit
    }
}

/// Declares a list response type whose items live under an entity-specific key, e.g.
/// `paginated_response!(ContactListResponse, ContactResponse, contacts)` serializes as
/// `{ "contacts": [...], "total": 42, "page": 1, "totalPages": 5 }`.
macro_rules! paginated_response {
    ($name:ident, $item:ty, $field:ident) => {
        #[derive(Debug, Clone, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
        #[serde(rename_all = "camelCase")]
        pub struct $name {
            pub $field: Vec<$item>,
            /// Total number of items matching the query (before pagination)
            pub total: i64,
            /// The page that was returned
            pub page: i64,
            /// `ceil(total / limit)`
            pub total_pages: i64,
        }

        impl $name {
            pub fn new(
                $field: Vec<$item>,
                total: i64,
                pagination: &$crate::api::models::pagination::Pagination,
            ) -> Self {
                Self {
                    $field,
                    total,
                    page: pagination.page(),
                    total_pages: pagination.total_pages(total),
                }
            }
        }
    };
}

pub(crate) use paginated_response;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let p = Pagination::default();
        assert_eq!(p.page(), 1);
        assert_eq!(p.limit(), DEFAULT_LIMIT);
        assert_eq!(p.skip(), 0);
    }

    #[test]
    fn test_limit_clamping() {
        assert_eq!(Pagination::new(1, 0).limit(), 1);
        assert_eq!(Pagination::new(1, -5).limit(), 1);
        assert_eq!(Pagination::new(1, 1000).limit(), MAX_LIMIT);
        assert_eq!(Pagination::new(1, 50).limit(), 50);
    }

    #[test]
    fn test_page_clamping_and_skip() {
        assert_eq!(Pagination::new(0, 10).page(), 1);
        assert_eq!(Pagination::new(-3, 10).skip(), 0);
        assert_eq!(Pagination::new(3, 20).params(), (40, 20));
    }

    #[test]
    fn test_total_pages() {
        let p = Pagination::new(1, 10);
        assert_eq!(p.total_pages(0), 0);
        assert_eq!(p.total_pages(1), 1);
        assert_eq!(p.total_pages(10), 1);
        assert_eq!(p.total_pages(11), 2);
        assert_eq!(Pagination::new(1, 3).total_pages(10), 4);
    }

    #[test]
    fn test_query_string_values_parse() {
        let p: Pagination = serde_json::from_value(serde_json::json!({ "page": "2", "limit": "25" })).unwrap();
        assert_eq!(p.params(), (25, 25));

        let p: Pagination = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(p.params(), (0, DEFAULT_LIMIT));
    }

    paginated_response!(NumberList, i32, numbers);

    #[test]
    fn test_paginated_response_shape() {
        let response = NumberList::new(vec![1, 2, 3], 7, &Pagination::new(1, 3));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "numbers": [1, 2, 3], "total": 7, "page": 1, "totalPages": 3 })
        );
    }
}
