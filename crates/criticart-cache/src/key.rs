//! Cache key composition.

use serde::Serialize;

use crate::CacheError;

/// Separator between key segments.
pub const KEY_SEPARATOR: char = ':';

/// A cache key uniquely identifying a cached read.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Create a cache key from a string.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Get the key string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether the key lives under a prefix.
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Builder for namespaced cache keys.
///
/// Keys are a pure function of the parts pushed, so two builders fed the same
/// request produce the same key.
#[derive(Debug, Clone)]
pub struct CacheKeyBuilder {
    parts: Vec<String>,
}

impl CacheKeyBuilder {
    /// Start a key under a namespace such as `review` or `reviews`.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            parts: vec![namespace.into()],
        }
    }

    /// Append a plain segment.
    pub fn segment(mut self, part: impl std::fmt::Display) -> Self {
        self.parts.push(part.to_string());
        self
    }

    /// Append the canonical JSON encoding of a value.
    ///
    /// Struct fields encode in declaration order, which keeps the output
    /// stable for identical inputs.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self, CacheError> {
        self.parts.push(serde_json::to_string(value)?);
        Ok(self)
    }

    /// Build the key.
    pub fn build(self) -> CacheKey {
        let mut key = String::new();
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                key.push(KEY_SEPARATOR);
            }
            key.push_str(part);
        }
        CacheKey(key)
    }
}

/// Helper to build cache keys with namespacing.
///
/// # Example
///
/// ```rust
/// use criticart_cache::cache_key;
///
/// let key = cache_key!("review", 42);
/// assert_eq!(key.as_str(), "review:42");
/// ```
#[macro_export]
macro_rules! cache_key {
    ($prefix:expr, $($part:expr),+) => {{
        $crate::CacheKeyBuilder::new($prefix)
            $(.segment(&$part))+
            .build()
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Request<'a> {
        category: Option<&'a str>,
        page: u32,
    }

    #[test]
    fn test_segment_keys() {
        let key = CacheKeyBuilder::new("review").segment("abc").build();
        assert_eq!(key.as_str(), "review:abc");
        assert!(key.has_prefix("review:"));
        assert!(!key.has_prefix("reviews:"));
    }

    #[test]
    fn test_json_keys_are_stable() {
        let a = CacheKeyBuilder::new("reviews")
            .json(&Request { category: Some("Books"), page: 1 })
            .unwrap()
            .build();
        let b = CacheKeyBuilder::new("reviews")
            .json(&Request { category: Some("Books"), page: 1 })
            .unwrap()
            .build();
        let c = CacheKeyBuilder::new("reviews")
            .json(&Request { category: Some("Books"), page: 2 })
            .unwrap()
            .build();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.as_str(), r#"reviews:{"category":"Books","page":1}"#);
    }

    #[test]
    fn test_cache_key_macro() {
        let key = cache_key!("lookup", "categories");
        assert_eq!(key.as_str(), "lookup:categories");
        let key = cache_key!("featured", 6, "v");
        assert_eq!(key.as_str(), "featured:6:v");
    }
}
