//! Search query parameters shared by both API generations.

use serde_json::{Map, Value};

/// Default page size for search operations.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// A search over observables, entities or investigations.
///
/// `page` is zero-based regardless of the API generation.
///
/// # Example
///
/// ```
/// use yetiapi::SearchQuery;
///
/// let query = SearchQuery::new()
///     .filter("value", "^search-.*\\.com$")
///     .regex(true)
///     .count(10);
/// assert_eq!(query.page, 0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    /// Field filters, sent as the legacy `filter` object or the v2 `query` object.
    pub filter: Map<String, Value>,
    /// Restrict to one server-side type name.
    pub kind: Option<String>,
    /// Zero-based page index.
    pub page: u32,
    /// Items per page.
    pub count: u32,
    /// Interpret filter values as regular expressions (legacy only).
    pub regex: bool,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            filter: Map::new(),
            kind: None,
            page: 0,
            count: DEFAULT_PAGE_SIZE,
            regex: false,
        }
    }
}

impl SearchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one field filter.
    #[must_use]
    pub fn filter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    #[must_use]
    pub fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    #[must_use]
    pub fn count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    #[must_use]
    pub fn regex(mut self, regex: bool) -> Self {
        self.regex = regex;
        self
    }

    /// The same query one page further.
    #[must_use]
    pub fn next_page(&self) -> Self {
        let mut next = self.clone();
        next.page = next.page.saturating_add(1);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let query = SearchQuery::new();
        assert_eq!(query.page, 0);
        assert_eq!(query.count, DEFAULT_PAGE_SIZE);
        assert!(!query.regex);
        assert!(query.filter.is_empty());
    }

    #[test]
    fn test_next_page_keeps_filter() {
        let query = SearchQuery::new().filter("tags", "asd").page(3);
        let next = query.next_page();
        assert_eq!(next.page, 4);
        assert_eq!(next.filter["tags"], "asd");
    }
}
