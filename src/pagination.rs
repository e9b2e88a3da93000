//! Pagination utilities for Yeti search responses.
//!
//! Page numbers exposed by this crate are always zero-based. The legacy API
//! counts pages from 1 and the v2 API from 0; the conversion happens in
//! [`ApiGeneration::wire_page`](crate::ApiGeneration::wire_page) and nowhere else.

use serde::Serialize;

/// A page of search results.
#[derive(Debug, Clone, Serialize)]
#[serde(bound = "T: Serialize")]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total number of matches across all pages, when the server reports it.
    pub total: Option<u64>,
    /// Logical page number (0-indexed).
    pub page: u32,
    /// Page size that was requested.
    pub count: u32,
    pub has_more: bool,
}

impl<T> Page<T> {
    /// Build a page, deciding `has_more` from `total` when the server sends
    /// one and from a full page otherwise.
    #[must_use]
    pub fn new(items: Vec<T>, page: u32, count: u32, total: Option<u64>) -> Self {
        let has_more = match total {
            Some(total) => (u64::from(page) + 1) * u64::from(count) < total,
            None => count > 0 && items.len() >= count as usize,
        };
        Self {
            items,
            total,
            page,
            count,
            has_more,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }
}
