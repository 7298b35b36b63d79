//! Client-side data access for CritiCart.
//!
//! This crate provides:
//! - `DataAccess` - Cached reads and validated writes for reviews, comments,
//!   profiles and media
//! - `DataError` - The four-kind error taxonomy every operation returns
//! - `AuthClient` / `SessionHandle` - Sign-in state shared with the data layer
//! - `Preferences` - Theme preference in the key-value store
//! - `ClientConfig` - File and environment configuration
//! - `render_review_grid` - Listing markup, including the empty-result state
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use criticart_cache::FileStore;
//! use criticart_client::{ClientConfig, CritiCart};
//! use criticart_core::{PageRequest, ReviewFilters};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = ClientConfig::from_env()?;
//! let storage = Arc::new(FileStore::open("storage.json")?);
//! let client = CritiCart::connect(config, storage)?;
//!
//! let filters = ReviewFilters::published().category("Electronics");
//! match client.data.list_reviews(&filters, PageRequest::new(2, 12)?).await {
//!     Ok(page) => println!("{}", criticart_client::render_review_grid(&page)),
//!     Err(e) => eprintln!("{}", e.user_message()),
//! }
//! # Ok(())
//! # }
//! ```

mod access;
mod client;
mod community;
mod profiles;

pub mod auth;
pub mod config;
pub mod error;
pub mod keys;
pub mod preferences;
pub mod render;

pub use access::DataAccess;
pub use auth::{AuthClient, SessionHandle};
pub use client::CritiCart;
pub use config::ClientConfig;
pub use error::{DataError, DataResult, Presentation};
pub use preferences::{Preferences, Theme};
pub use profiles::{MediaFile, AVATAR_BUCKET};
pub use render::render_review_grid;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        AuthClient, ClientConfig, CritiCart, DataAccess, DataError, DataResult, MediaFile,
        Presentation, SessionHandle,
    };
}
