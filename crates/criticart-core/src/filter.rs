//! Listing filters and pagination.

use serde::{Deserialize, Serialize};

use crate::review::{Review, ReviewStatus};
use crate::ValidationError;

/// Page size used by the listing pages.
pub const DEFAULT_PAGE_SIZE: u32 = 12;

/// Filters for review listings.
///
/// Field order is part of the cache key encoding; unset fields are omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ReviewFilters {
    /// Exact category match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Minimum rating, inclusive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    /// Case-insensitive substring over title and description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Moderation status; public listings use `approved`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ReviewStatus>,
}

impl ReviewFilters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by category.
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Filter by minimum rating.
    pub fn min_rating(mut self, rating: f64) -> Self {
        self.rating = Some(rating);
        self
    }

    /// Full-text search over title and description.
    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    /// Filter by moderation status.
    pub fn status(mut self, status: ReviewStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Published reviews only.
    pub fn published() -> Self {
        Self::new().status(ReviewStatus::Approved)
    }

    /// Drop blank and no-op values so equivalent requests share a shape.
    ///
    /// Blank strings and a rating of zero or less filter nothing.
    pub fn normalized(&self) -> Self {
        fn clean(value: &Option<String>) -> Option<String> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
        }

        Self {
            category: clean(&self.category),
            rating: self.rating.filter(|r| r.is_finite() && *r > 0.0),
            search: clean(&self.search),
            status: self.status,
        }
    }

    /// True when no filter is active.
    pub fn is_empty(&self) -> bool {
        self.normalized() == Self::default()
    }
}

/// A page request, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    /// Create a page request, rejecting page 0 and empty pages.
    pub fn new(page: u32, page_size: u32) -> Result<Self, ValidationError> {
        if page == 0 {
            return Err(ValidationError::InvalidPage);
        }
        if page_size == 0 {
            return Err(ValidationError::InvalidPageSize);
        }
        Ok(Self { page, page_size })
    }

    /// First page at the default size.
    pub fn first() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Inclusive row range `[(page-1)*size, page*size-1]`.
    pub fn range(&self) -> (u64, u64) {
        let size = u64::from(self.page_size);
        let start = u64::from(self.page.saturating_sub(1)) * size;
        (start, start + size.saturating_sub(1))
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first()
    }
}

/// One page of reviews plus the total match count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewPage {
    pub items: Vec<Review>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

impl ReviewPage {
    pub fn new(items: Vec<Review>, total: u64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            page: request.page,
            page_size: request.page_size,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of pages for the total count, at least 1.
    pub fn total_pages(&self) -> u64 {
        let size = u64::from(self.page_size.max(1));
        self.total.div_ceil(size).max(1)
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.page) < self.total_pages()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // === Range Tests ===

    #[test]
    fn test_second_page_range() {
        let page = PageRequest::new(2, 12).unwrap();
        assert_eq!(page.range(), (12, 23));
    }

    #[test]
    fn test_first_page_range() {
        assert_eq!(PageRequest::first().range(), (0, 11));
        assert_eq!(PageRequest::new(1, 1).unwrap().range(), (0, 0));
    }

    #[test]
    fn test_page_request_rejects_zero() {
        assert_eq!(PageRequest::new(0, 12), Err(ValidationError::InvalidPage));
        assert_eq!(PageRequest::new(1, 0), Err(ValidationError::InvalidPageSize));
    }

    // === Filter Tests ===

    #[test]
    fn test_normalized_drops_blank_values() {
        let filters = ReviewFilters::new()
            .category("  ")
            .search(" headphones ")
            .min_rating(0.0);
        let normalized = filters.normalized();
        assert_eq!(normalized.category, None);
        assert_eq!(normalized.search.as_deref(), Some("headphones"));
        assert_eq!(normalized.rating, None);
    }

    #[test]
    fn test_filters_serialize_without_unset_fields() {
        let filters = ReviewFilters::new().category("Electronics");
        assert_eq!(
            serde_json::to_string(&filters).unwrap(),
            r#"{"category":"Electronics"}"#
        );
        assert!(ReviewFilters::new().search("").is_empty());
        assert!(!ReviewFilters::published().is_empty());
    }

    // === Page Tests ===

    #[test]
    fn test_page_navigation() {
        let request = PageRequest::new(2, 12).unwrap();
        let page = ReviewPage::new(Vec::new(), 30, request);
        assert_eq!(page.total_pages(), 3);
        assert!(page.has_previous());
        assert!(page.has_next());

        let last = ReviewPage::new(Vec::new(), 24, request);
        assert!(!last.has_next());

        let empty = ReviewPage::new(Vec::new(), 0, PageRequest::first());
        assert_eq!(empty.total_pages(), 1);
        assert!(empty.is_empty());
        assert!(!empty.has_next());
    }
}
