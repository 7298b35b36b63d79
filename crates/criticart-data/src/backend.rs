//! Service traits for the hosted backend.
//!
//! The relational, storage and identity services are separate traits so
//! tests can fake each one independently. `Backend` bundles all three.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::BackendError;
use crate::identity::{AuthSession, AuthUser, SignUpOutcome};
use crate::query::Query;

/// Result type for backend calls.
pub type BackendResult<T> = Result<T, BackendError>;

/// Rows returned by a read, with the exact total when it was requested.
#[derive(Debug, Clone, PartialEq)]
pub struct Rows {
    /// An array, or a single object for `single()` queries.
    pub data: Value,
    pub count: Option<u64>,
}

impl Rows {
    pub fn new(data: Value) -> Self {
        Self { data, count: None }
    }

    pub fn with_count(mut self, count: u64) -> Self {
        self.count = Some(count);
        self
    }

    /// Deserialize the payload.
    pub fn decode<T: DeserializeOwned>(self) -> BackendResult<T> {
        Ok(serde_json::from_value(self.data)?)
    }
}

/// Relational query service.
///
/// `bearer` is the signed-in user's access token; `None` sends the anonymous
/// key so row-level security applies the public policies.
#[async_trait]
pub trait QueryApi: Send + Sync {
    async fn select(&self, query: &Query, bearer: Option<&str>) -> BackendResult<Rows>;

    /// Insert one row and return its stored representation.
    async fn insert(&self, table: &str, row: Value, bearer: Option<&str>) -> BackendResult<Value>;

    /// Patch the rows matched by `query` and return them.
    async fn update(&self, query: &Query, patch: Value, bearer: Option<&str>)
        -> BackendResult<Value>;

    async fn delete(&self, query: &Query, bearer: Option<&str>) -> BackendResult<()>;
}

/// Object storage service.
#[async_trait]
pub trait StorageApi: Send + Sync {
    /// Store `bytes` at `path` in `bucket`. Returns the stored object key.
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        bearer: Option<&str>,
    ) -> BackendResult<String>;

    async fn remove(&self, bucket: &str, paths: &[String], bearer: Option<&str>)
        -> BackendResult<()>;

    /// Publicly resolvable URL of an object. Computed locally.
    fn public_url(&self, bucket: &str, path: &str) -> String;
}

/// Identity service.
#[async_trait]
pub trait IdentityApi: Send + Sync {
    async fn sign_in_with_password(&self, email: &str, password: &str)
        -> BackendResult<AuthSession>;

    /// `metadata` lands in the new user's `user_metadata`.
    async fn sign_up(&self, email: &str, password: &str, metadata: Value)
        -> BackendResult<SignUpOutcome>;

    async fn sign_out(&self, access_token: &str) -> BackendResult<()>;

    async fn get_user(&self, access_token: &str) -> BackendResult<AuthUser>;
}

/// Everything the data-access layer needs from the provider.
pub trait Backend: QueryApi + StorageApi + IdentityApi {}

impl<T: QueryApi + StorageApi + IdentityApi> Backend for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rows_decode() {
        let rows = Rows::new(json!([{"name": "Books"}, {"name": "Toys"}])).with_count(2);
        assert_eq!(rows.count, Some(2));

        #[derive(serde::Deserialize)]
        struct Named {
            name: String,
        }
        let names: Vec<Named> = rows.decode().unwrap();
        assert_eq!(names[1].name, "Toys");
    }

    #[test]
    fn test_rows_decode_shape_mismatch() {
        let rows = Rows::new(json!({"name": "Books"}));
        let result: BackendResult<Vec<Value>> = rows.decode();
        assert!(matches!(result, Err(BackendError::Fetch(_))));
    }
}
