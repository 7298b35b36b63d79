//! The data-access layer.
//!
//! `DataAccess` is the one object the site talks to for reviews, comments,
//! profiles and media. Reads listed below are cached for a TTL; everything
//! else goes straight to the backend.
//!
//! | read                | key                   | evicted by                         |
//! |---------------------|-----------------------|------------------------------------|
//! | `list_reviews`      | `reviews:<json>`      | `create_review` (whole cache)      |
//! | `get_review`        | `review:<id>`         | any write to that review or its comments |
//! | `featured_reviews`  | `featured:<limit>`    | `create_review`                    |
//! | `categories`/`tags` | `lookup:*`            | `create_review`                    |
//!
//! List entries are not evicted by updates or deletes; they may serve stale
//! rows until their TTL runs out.
//!
//! Cached reads are scoped to one session: signing in or out drops the whole
//! cache, and a fetch that straddles a session change is not stored. Writes
//! invalidate as soon as the backend accepts them, before the response is
//! decoded.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use criticart_cache::{CacheKey, TtlCache, DEFAULT_TTL};
use criticart_core::{
    Category, PageRequest, Review, ReviewDetail, ReviewDraft, ReviewFilters, ReviewId,
    ReviewInsert, ReviewPage, ReviewPatch, Tag, ValidationError,
};
use criticart_data::query::contains_pattern;
use criticart_data::{Backend, Condition, Op, Query, RetryPolicy};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::auth::SessionHandle;
use crate::config::ClientConfig;
use crate::error::{DataError, DataResult};
use crate::keys;

pub(crate) const REVIEWS_TABLE: &str = "reviews";
const CATEGORIES_TABLE: &str = "categories";
const TAGS_TABLE: &str = "tags";

/// Columns for listing cards: the row plus its author.
pub(crate) const LIST_SELECT: &str = "*, author:profiles(*)";
/// Columns for the review page: author and comments in one read.
const DETAIL_SELECT: &str = "*, author:profiles(*), comments(*)";

/// Values held by the read cache.
#[derive(Debug, Clone)]
pub(crate) enum Cached {
    Page(ReviewPage),
    Detail(ReviewDetail),
    Reviews(Vec<Review>),
    Categories(Vec<Category>),
    Tags(Vec<Tag>),
}

/// Conversion in and out of the cache's value enum.
pub(crate) trait Cacheable: Clone + Sized {
    fn into_cached(self) -> Cached;
    fn from_cached(cached: Cached) -> Option<Self>;
}

macro_rules! cacheable {
    ($variant:ident, $ty:ty) => {
        impl Cacheable for $ty {
            fn into_cached(self) -> Cached {
                Cached::$variant(self)
            }

            fn from_cached(cached: Cached) -> Option<Self> {
                match cached {
                    Cached::$variant(value) => Some(value),
                    _ => None,
                }
            }
        }
    };
}

cacheable!(Page, ReviewPage);
cacheable!(Detail, ReviewDetail);
cacheable!(Reviews, Vec<Review>);
cacheable!(Categories, Vec<Category>);
cacheable!(Tags, Vec<Tag>);

/// Client-side data access for the review site.
///
/// Construct one per process and share it; cloning the `Arc` around it is
/// the intended way to hand it to tasks.
pub struct DataAccess<B> {
    pub(crate) backend: Arc<B>,
    pub(crate) cache: TtlCache<Cached>,
    pub(crate) session: SessionHandle,
    pub(crate) upload_retry: RetryPolicy,
    pub(crate) media_bucket: String,
    cache_generation: AtomicU64,
}

impl<B: Backend> DataAccess<B> {
    /// Create a data-access layer with default TTL, retry and bucket.
    pub fn new(backend: Arc<B>, session: SessionHandle) -> Self {
        let cache_generation = AtomicU64::new(session.generation());
        Self {
            backend,
            cache: TtlCache::new(DEFAULT_TTL),
            cache_generation,
            session,
            upload_retry: RetryPolicy::default(),
            media_bucket: "media".to_string(),
        }
    }

    pub fn from_config(backend: Arc<B>, session: SessionHandle, config: &ClientConfig) -> Self {
        Self::new(backend, session)
            .with_cache_ttl(config.cache_ttl())
            .with_upload_retry(RetryPolicy::linear(
                config.upload_max_attempts,
                config.upload_backoff(),
            ))
            .with_media_bucket(config.media_bucket.clone())
    }

    /// Set the cache TTL. Drops anything cached so far.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache = TtlCache::new(ttl);
        self
    }

    pub fn with_upload_retry(mut self, policy: RetryPolicy) -> Self {
        self.upload_retry = policy;
        self
    }

    pub fn with_media_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.media_bucket = bucket.into();
        self
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn cache_ttl(&self) -> Duration {
        self.cache.ttl()
    }

    /// Number of cache entries, fresh or not yet swept.
    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    /// Drop every cached read.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub(crate) fn bearer(&self) -> Option<String> {
        self.session.token()
    }

    /// Drop the cache if the session changed since it was filled. Returns
    /// the generation the cache now belongs to.
    fn sync_session(&self) -> u64 {
        let current = self.session.generation();
        let previous = self.cache_generation.swap(current, Ordering::SeqCst);
        if previous != current {
            let removed = self.cache.clear();
            debug!(removed, "session changed, dropped cached reads");
        }
        current
    }

    /// Serve `key` from the cache, or run `fetch` and cache its result.
    pub(crate) async fn read_through<T, F, Fut>(&self, key: CacheKey, fetch: F) -> DataResult<T>
    where
        T: Cacheable,
        F: FnOnce() -> Fut,
        Fut: Future<Output = DataResult<T>>,
    {
        let generation = self.sync_session();
        if let Some(value) = self.cache.get(&key).and_then(T::from_cached) {
            return Ok(value);
        }

        let value = fetch().await?;
        if self.session.generation() == generation {
            self.cache.set(key, value.clone().into_cached());
        }
        Ok(value)
    }

    pub(crate) fn evict_review(&self, id: &ReviewId) {
        if self.cache.invalidate(&keys::review(id)) {
            debug!(review = %id, "evicted cached review");
        }
    }

    // === Reviews ===

    /// One page of reviews matching `filters`.
    pub async fn list_reviews(
        &self,
        filters: &ReviewFilters,
        page: PageRequest,
    ) -> DataResult<ReviewPage> {
        PageRequest::new(page.page, page.page_size)?;
        let filters = filters.normalized();
        let key = keys::reviews(&filters, page);
        self.read_through(key, || self.fetch_page(&filters, page))
            .await
    }

    /// Uncached listing read.
    pub(crate) async fn fetch_page(
        &self,
        filters: &ReviewFilters,
        page: PageRequest,
    ) -> DataResult<ReviewPage> {
        let (from, to) = page.range();
        let query = list_query(filters)
            .order("created_at", false)
            .range(from, to)
            .count_exact();

        let rows = self
            .backend
            .select(&query, self.bearer().as_deref())
            .await?;
        let count = rows.count;
        let items: Vec<Review> = rows.decode()?;
        let total = count.unwrap_or(items.len() as u64);
        Ok(ReviewPage::new(items, total, page))
    }

    /// A review with its author and comments.
    pub async fn get_review(&self, id: &ReviewId) -> DataResult<ReviewDetail> {
        self.read_through(keys::review(id), || async {
            let query = Query::from(REVIEWS_TABLE)
                .select(DETAIL_SELECT)
                .eq("id", id)
                .single();
            let rows = self
                .backend
                .select(&query, self.bearer().as_deref())
                .await?;
            let mut detail: ReviewDetail = rows.decode()?;
            detail
                .comments
                .sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(detail)
        })
        .await
    }

    /// Uncached single-row read of a review, for checks before a write.
    pub(crate) async fn fetch_review(&self, id: &ReviewId) -> DataResult<Review> {
        let query = Query::from(REVIEWS_TABLE).eq("id", id).single();
        let rows = self
            .backend
            .select(&query, self.bearer().as_deref())
            .await?;
        Ok(rows.decode()?)
    }

    /// Submit a review for moderation. Clears the whole cache.
    pub async fn create_review(&self, draft: &ReviewDraft) -> DataResult<Review> {
        let session = self.session.require()?;
        draft.validate()?;

        let row = to_row(&ReviewInsert::pending(draft, session.user_id()))?;
        let stored = self
            .backend
            .insert(REVIEWS_TABLE, row, Some(&session.access_token))
            .await?;
        self.clear_cache();

        let review: Review = decode(stored)?;
        info!(review = %review.id, user = %session.user_id(), "review submitted");
        Ok(review)
    }

    /// Write `patch` to a review. Evicts only `review:<id>`.
    pub async fn update_review(&self, id: &ReviewId, patch: &ReviewPatch) -> DataResult<Review> {
        let session = self.session.require()?;
        if patch.is_empty() {
            return Err(ValidationError::MissingField("Changes").into());
        }
        patch.validate()?;

        let query = Query::from(REVIEWS_TABLE).eq("id", id);
        let updated = self
            .backend
            .update(&query, to_row(patch)?, Some(&session.access_token))
            .await?;
        self.evict_review(id);

        let review: Review = decode(first_row(updated)?)?;
        info!(review = %id, "review updated");
        Ok(review)
    }

    /// Owner edit: only the author, and only while the review is pending.
    pub async fn edit_own_review(&self, id: &ReviewId, patch: &ReviewPatch) -> DataResult<Review> {
        let session = self.session.require()?;
        if patch.status.is_some() || patch.appeal_status.is_some() {
            return Err(DataError::permission_denied());
        }
        let current = self.fetch_review(id).await?;
        if !current.is_owned_by(session.user_id()) {
            return Err(DataError::permission_denied());
        }
        if !current.is_editable_by_owner() {
            return Err(ValidationError::NotEditable.into());
        }
        self.update_review(id, patch).await
    }

    /// Delete a review. Evicts only `review:<id>`.
    pub async fn delete_review(&self, id: &ReviewId) -> DataResult<()> {
        let session = self.session.require()?;
        let query = Query::from(REVIEWS_TABLE).eq("id", id);
        self.backend
            .delete(&query, Some(&session.access_token))
            .await?;

        self.evict_review(id);
        info!(review = %id, "review deleted");
        Ok(())
    }

    /// The latest approved reviews, for the home page.
    pub async fn featured_reviews(&self, limit: u32) -> DataResult<Vec<Review>> {
        if limit == 0 {
            return Err(ValidationError::InvalidPageSize.into());
        }
        self.read_through(keys::featured(limit), || async {
            let query = list_query(&ReviewFilters::published())
                .order("created_at", false)
                .limit(u64::from(limit));
            let rows = self
                .backend
                .select(&query, self.bearer().as_deref())
                .await?;
            Ok(rows.decode()?)
        })
        .await
    }

    // === Lookups ===

    pub async fn categories(&self) -> DataResult<Vec<Category>> {
        self.read_through(keys::categories(), || self.lookup(CATEGORIES_TABLE))
            .await
    }

    pub async fn tags(&self) -> DataResult<Vec<Tag>> {
        self.read_through(keys::tags(), || self.lookup(TAGS_TABLE))
            .await
    }

    async fn lookup<T: DeserializeOwned>(&self, table: &str) -> DataResult<T> {
        let query = Query::from(table).order("name", true);
        let rows = self.backend.select(&query, None).await?;
        Ok(rows.decode()?)
    }
}

/// Listing query for already-normalized filters.
pub(crate) fn list_query(filters: &ReviewFilters) -> Query {
    let mut query = Query::from(REVIEWS_TABLE).select(LIST_SELECT);
    if let Some(category) = &filters.category {
        query = query.eq("category", category);
    }
    if let Some(rating) = filters.rating {
        query = query.gte("rating", rating);
    }
    if let Some(term) = &filters.search {
        let pattern = contains_pattern(term);
        query = query.or(vec![
            Condition::new("product_name", Op::ILike, &pattern),
            Condition::new("description", Op::ILike, &pattern),
        ]);
    }
    if let Some(status) = filters.status {
        query = query.eq("status", status);
    }
    query
}

pub(crate) fn to_row<T: Serialize>(value: &T) -> DataResult<Value> {
    Ok(serde_json::to_value(value)?)
}

pub(crate) fn decode<T: DeserializeOwned>(value: Value) -> DataResult<T> {
    Ok(serde_json::from_value(value)?)
}

/// The single row a write returned; an empty result means nothing matched.
pub(crate) fn first_row(value: Value) -> DataResult<Value> {
    match value {
        Value::Array(mut rows) if !rows.is_empty() => Ok(rows.swap_remove(0)),
        Value::Object(_) => Ok(value),
        _ => Err(DataError::not_found()),
    }
}
