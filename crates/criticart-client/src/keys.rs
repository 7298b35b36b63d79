//! Cache keys for every cached read.
//!
//! Keys are pure functions of the request. List keys embed the canonical
//! JSON of the normalized filters and the page, so equivalent requests share
//! an entry.

use criticart_cache::{cache_key, CacheKey, CacheKeyBuilder};
use criticart_core::{PageRequest, ReviewFilters, ReviewId};
use serde::Serialize;

pub const REVIEWS: &str = "reviews";
pub const REVIEW: &str = "review";
pub const FEATURED: &str = "featured";
pub const LOOKUP: &str = "lookup";

#[derive(Serialize)]
struct ListShape<'a> {
    filters: &'a ReviewFilters,
    page: u32,
    page_size: u32,
}

/// `reviews:{"filters":{..},"page":2,"page_size":12}`.
///
/// `filters` must already be normalized.
pub fn reviews(filters: &ReviewFilters, page: PageRequest) -> CacheKey {
    let shape = ListShape {
        filters,
        page: page.page,
        page_size: page.page_size,
    };
    match CacheKeyBuilder::new(REVIEWS).json(&shape) {
        Ok(builder) => builder.build(),
        // Strings and numbers always encode; kept total so the key stays infallible.
        Err(_) => cache_key!(REVIEWS, format!("{:?}", shape.filters), page.page, page.page_size),
    }
}

/// `review:<id>`.
pub fn review(id: &ReviewId) -> CacheKey {
    cache_key!(REVIEW, id)
}

/// `featured:<limit>`.
pub fn featured(limit: u32) -> CacheKey {
    cache_key!(FEATURED, limit)
}

pub fn categories() -> CacheKey {
    cache_key!(LOOKUP, "categories")
}

pub fn tags() -> CacheKey {
    cache_key!(LOOKUP, "tags")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_key_is_canonical() {
        let page = PageRequest::new(2, 12).unwrap();
        let filters = ReviewFilters::new().category("Electronics");
        assert_eq!(
            reviews(&filters, page).as_str(),
            r#"reviews:{"filters":{"category":"Electronics"},"page":2,"page_size":12}"#
        );
    }

    #[test]
    fn test_list_key_distinguishes_requests() {
        let first = PageRequest::first();
        let second = PageRequest::new(2, 12).unwrap();
        let books = ReviewFilters::new().category("Books");

        assert_eq!(reviews(&books, first), reviews(&books.clone(), first));
        assert_ne!(reviews(&books, first), reviews(&books, second));
        assert_ne!(reviews(&books, first), reviews(&ReviewFilters::new(), first));
    }

    #[test]
    fn test_entity_keys() {
        assert_eq!(review(&ReviewId::new("42")).as_str(), "review:42");
        assert_eq!(featured(6).as_str(), "featured:6");
        assert_eq!(categories().as_str(), "lookup:categories");
        assert_eq!(tags().as_str(), "lookup:tags");
    }

    #[test]
    fn test_review_key_is_not_a_list_key() {
        assert!(!review(&ReviewId::new("1")).has_prefix("reviews:"));
    }
}
