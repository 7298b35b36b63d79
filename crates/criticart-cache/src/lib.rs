//! Caching for the CritiCart data-access layer.
//!
//! This crate provides:
//! - `TtlCache` - In-process read cache with lazy time-to-live expiry
//! - `CacheKey` / `CacheKeyBuilder` - Typed, deterministic key composition
//! - `KeyValueStore` - Persistent string storage (`MemoryStore`, `FileStore`)
//! - `JsonStore` - Serde wrapper over any key-value store
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use criticart_cache::{cache_key, TtlCache};
//!
//! let cache = TtlCache::new(Duration::from_secs(300));
//! cache.set(cache_key!("review", 42), "cached page".to_string());
//! assert_eq!(cache.get(&cache_key!("review", 42)).as_deref(), Some("cached page"));
//! ```

mod error;
mod key;
mod store;
mod ttl;

pub use error::CacheError;
pub use key::{CacheKey, CacheKeyBuilder, KEY_SEPARATOR};
pub use store::{FileStore, JsonStore, KeyValueStore, MemoryStore};
pub use ttl::{CacheEntry, CacheStatus, TtlCache, DEFAULT_TTL};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{CacheError, CacheKey, JsonStore, KeyValueStore, TtlCache};
}
