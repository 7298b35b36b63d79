//! Domain types for CritiCart.
//!
//! Provides the shapes the data-access layer reads and writes:
//!
//! - Reviews, their moderation lifecycle, drafts and patches
//! - Profiles, including the defaults used for lazy creation
//! - Comments and abuse reports
//! - Listing filters and 1-based pagination
//! - Local validation run before any remote call
//!
//! # Example
//!
//! ```rust
//! use criticart_core::{PageRequest, ReviewFilters};
//!
//! let filters = ReviewFilters::published().category("Electronics");
//! let page = PageRequest::new(2, 12).unwrap();
//! assert_eq!(page.range(), (12, 23));
//! assert_eq!(filters.normalized().category.as_deref(), Some("Electronics"));
//! ```

mod de;
mod error;

pub mod comment;
pub mod filter;
pub mod ids;
pub mod lookup;
pub mod profile;
pub mod review;
pub mod validate;

pub use comment::{Comment, CommentDraft, CommentInsert, ReportInsert};
pub use error::ValidationError;
pub use filter::{PageRequest, ReviewFilters, ReviewPage, DEFAULT_PAGE_SIZE};
pub use ids::{CommentId, ProfileId, ReviewId, UserId};
pub use lookup::{Category, Tag};
pub use profile::{NewProfile, Profile, ProfilePatch};
pub use review::{
    AppealStatus, Decision, Review, ReviewDetail, ReviewDraft, ReviewInsert, ReviewPatch,
    ReviewStatus,
};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        Comment, PageRequest, Profile, Review, ReviewDetail, ReviewDraft, ReviewFilters,
        ReviewId, ReviewPage, ReviewPatch, ReviewStatus, UserId, ValidationError,
    };
}
