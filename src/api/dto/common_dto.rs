//! Shared DTO types used across multiple endpoints.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::cache::CacheKey;
use crate::service::ListFilter;

/// Success envelope returned by every REST endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Always `true`; failures use [`crate::error::ErrorResponse`].
    pub success: bool,
    /// Endpoint payload.
    pub data: T,
    /// Present on paginated list responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationMeta>,
}

impl<T> ApiResponse<T> {
    /// Wraps a single payload.
    #[must_use]
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            pagination: None,
        }
    }
}

impl<T> From<Page<T>> for ApiResponse<Vec<T>> {
    fn from(page: Page<T>) -> Self {
        Self {
            success: true,
            data: page.items,
            pagination: Some(page.pagination),
        }
    }
}

/// Query parameters for list endpoints.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// Page number (1-indexed). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: u32,
    /// Items per page (max 100). Defaults to 20.
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    /// Case-insensitive substring filter.
    #[serde(default)]
    pub search: Option<String>,
    /// Exact status filter (e.g. `active`, `available`, `captured`).
    #[serde(default)]
    pub status: Option<String>,
    /// Skip the cached page and recompute it. The fresh page replaces the
    /// cached entry.
    #[serde(default)]
    pub fresh: bool,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    20
}

impl ListQuery {
    /// Clamps `page` to at least 1 and `per_page` to `1..=100`, and drops
    /// blank filters.
    #[must_use]
    pub fn clamped(self) -> Self {
        let blank_to_none = |v: Option<String>| {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        };
        Self {
            page: self.page.max(1),
            per_page: self.per_page.clamp(1, 100),
            search: blank_to_none(self.search),
            status: blank_to_none(self.status),
            fresh: self.fresh,
        }
    }

    /// Cache key over the full query tuple. `fresh` does not take part: a
    /// fresh read refreshes the same entry a cached read would serve.
    #[must_use]
    pub fn cache_key(&self, scope: &'static str) -> String {
        CacheKey::new(scope)
            .param("page", self.page)
            .param("per_page", self.per_page)
            .opt_param("search", self.search.as_deref())
            .opt_param("status", self.status.as_deref())
            .build()
    }

    /// Service-level filter for this query.
    #[must_use]
    pub fn filter(&self) -> ListFilter {
        ListFilter {
            search: self.search.clone(),
            status: self.status.clone(),
        }
    }
}

/// Pagination metadata included in list responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PaginationMeta {
    /// Current page number.
    pub page: u32,
    /// Items per page.
    pub per_page: u32,
    /// Total number of items.
    pub total: u32,
    /// Total number of pages.
    pub total_pages: u32,
}

/// One page of a list, as stored in the read cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items on this page.
    pub items: Vec<T>,
    /// Position of this page in the full list.
    pub pagination: PaginationMeta,
}

impl<T> Page<T> {
    /// Slices `items` according to a clamped `query`.
    #[must_use]
    pub fn slice(items: Vec<T>, query: &ListQuery) -> Self {
        let total = u32::try_from(items.len()).unwrap_or(u32::MAX);
        let per_page = query.per_page.max(1);
        let total_pages = total.div_ceil(per_page);
        let start = query.page.saturating_sub(1).saturating_mul(per_page) as usize;
        let items = items
            .into_iter()
            .skip(start)
            .take(per_page as usize)
            .collect();
        Self {
            items,
            pagination: PaginationMeta {
                page: query.page,
                per_page,
                total,
                total_pages,
            },
        }
    }
}
