//! Transport to the hosted backend.
//!
//! This crate provides:
//! - `Query` - Chained filter/select/range builder for the relational API
//! - `QueryApi`, `StorageApi`, `IdentityApi` - Service traits, bundled as `Backend`
//! - `HttpBackend` - reqwest implementation of all three services
//! - `ProviderError` / `FetchError` - Raw failure shapes, normalized by callers
//! - `RetryPolicy` - Attempt budget and backoff for flaky operations
//!
//! # Example
//!
//! ```rust
//! use criticart_data::Query;
//!
//! let query = Query::from("reviews")
//!     .eq("category", "Electronics")
//!     .order("created_at", false)
//!     .range(12, 23)
//!     .count_exact();
//! assert_eq!(query.row_range(), Some((12, 23)));
//! ```

pub mod backend;
pub mod error;
pub mod http;
pub mod identity;
pub mod query;
pub mod retry;

pub use backend::{Backend, BackendResult, IdentityApi, QueryApi, Rows, StorageApi};
pub use error::{BackendError, FetchError, ProviderError};
pub use http::HttpBackend;
pub use identity::{AuthSession, AuthUser, SignUpOutcome};
pub use query::{Condition, Op, Query};
pub use retry::{BackoffStrategy, RetryError, RetryPolicy};
