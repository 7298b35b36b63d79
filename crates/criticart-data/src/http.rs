//! HTTP implementation of the backend services.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::backend::{BackendResult, IdentityApi, QueryApi, Rows, StorageApi};
use crate::error::{FetchError, ProviderError};
use crate::identity::{AuthSession, AuthUser, SignUpOutcome};
use crate::query::Query;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Talks to the hosted backend over HTTPS.
///
/// Every request carries the project's anonymous key as `apikey`, and as the
/// bearer token unless a user access token is supplied.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Result<Self, FetchError> {
        Self::with_timeout(base_url, anon_key, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        anon_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let base_url = base_url.into();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(FetchError::InvalidUrl(base_url));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::RequestError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn object_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url,
            bucket,
            encode_path(path)
        )
    }

    fn auth_url(&self, endpoint: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, endpoint)
    }

    fn authorized(&self, builder: RequestBuilder, bearer: Option<&str>) -> RequestBuilder {
        builder
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer.unwrap_or(self.anon_key.as_str()))
    }

    /// Send a request; non-2xx responses become `ProviderError`.
    async fn send(&self, builder: RequestBuilder, what: &str) -> BackendResult<Response> {
        let response = builder.send().await.map_err(|e| {
            warn!(request = what, error = %e, "backend request failed");
            FetchError::from(e)
        })?;

        let status = response.status();
        if status.is_success() {
            debug!(request = what, status = status.as_u16(), "backend request ok");
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = ProviderError::from_body(status.as_u16(), &body);
        warn!(
            request = what,
            status = err.status,
            code = err.code().unwrap_or("-"),
            "backend rejected request"
        );
        Err(err.into())
    }

    async fn json_body(response: Response) -> BackendResult<Value> {
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

/// Total row count from a `Content-Range` header (`0-11/42`, `*/0`).
pub fn parse_content_range(value: &str) -> Option<u64> {
    value.rsplit_once('/')?.1.trim().parse().ok()
}

fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn first_row(value: Value) -> Value {
    match value {
        Value::Array(mut rows) if !rows.is_empty() => rows.swap_remove(0),
        other => other,
    }
}

#[async_trait]
impl QueryApi for HttpBackend {
    async fn select(&self, query: &Query, bearer: Option<&str>) -> BackendResult<Rows> {
        let mut builder = self
            .client
            .get(self.rest_url(query.table()))
            .query(&query.params());
        for (name, value) in query.headers() {
            builder = builder.header(name, value);
        }
        let builder = self.authorized(builder, bearer);

        let response = self.send(builder, query.table()).await?;
        let count = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range);
        let data = Self::json_body(response).await?;

        Ok(Rows { data, count })
    }

    async fn insert(&self, table: &str, row: Value, bearer: Option<&str>) -> BackendResult<Value> {
        let builder = self
            .client
            .post(self.rest_url(table))
            .header("Prefer", "return=representation")
            .json(&row);
        let response = self.send(self.authorized(builder, bearer), table).await?;
        Ok(first_row(Self::json_body(response).await?))
    }

    async fn update(
        &self,
        query: &Query,
        patch: Value,
        bearer: Option<&str>,
    ) -> BackendResult<Value> {
        let builder = self
            .client
            .patch(self.rest_url(query.table()))
            .query(&query.filter_params())
            .header("Prefer", "return=representation")
            .json(&patch);
        let response = self
            .send(self.authorized(builder, bearer), query.table())
            .await?;
        Self::json_body(response).await
    }

    async fn delete(&self, query: &Query, bearer: Option<&str>) -> BackendResult<()> {
        let builder = self
            .client
            .delete(self.rest_url(query.table()))
            .query(&query.filter_params());
        self.send(self.authorized(builder, bearer), query.table())
            .await?;
        Ok(())
    }
}

#[async_trait]
impl StorageApi for HttpBackend {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        bearer: Option<&str>,
    ) -> BackendResult<String> {
        let builder = self
            .client
            .post(self.object_url(bucket, path))
            .header("Content-Type", content_type)
            .header("Cache-Control", "max-age=3600")
            .header("x-upsert", "false")
            .body(bytes);
        let response = self.send(self.authorized(builder, bearer), "storage upload").await?;

        let body = Self::json_body(response).await?;
        let key = body
            .get("Key")
            .and_then(Value::as_str)
            .map(String::from)
            .unwrap_or_else(|| format!("{}/{}", bucket, path));
        Ok(key)
    }

    async fn remove(&self, bucket: &str, paths: &[String], bearer: Option<&str>) -> BackendResult<()> {
        let builder = self
            .client
            .delete(format!("{}/storage/v1/object/{}", self.base_url, bucket))
            .json(&json!({ "prefixes": paths }));
        self.send(self.authorized(builder, bearer), "storage remove")
            .await?;
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url,
            bucket,
            encode_path(path)
        )
    }
}

#[async_trait]
impl IdentityApi for HttpBackend {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> BackendResult<AuthSession> {
        let builder = self
            .client
            .post(self.auth_url("token"))
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }));
        let response = self.send(self.authorized(builder, None), "sign in").await?;
        Ok(response.json().await?)
    }

    async fn sign_up(&self, email: &str, password: &str, metadata: Value) -> BackendResult<SignUpOutcome> {
        let builder = self.client.post(self.auth_url("signup")).json(&json!({
            "email": email,
            "password": password,
            "data": metadata,
        }));
        let response = self.send(self.authorized(builder, None), "sign up").await?;
        Ok(SignUpOutcome::from_value(Self::json_body(response).await?)?)
    }

    async fn sign_out(&self, access_token: &str) -> BackendResult<()> {
        let builder = self.client.post(self.auth_url("logout"));
        self.send(self.authorized(builder, Some(access_token)), "sign out")
            .await?;
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> BackendResult<AuthUser> {
        let builder = self.client.get(self.auth_url("user"));
        let response = self
            .send(self.authorized(builder, Some(access_token)), "get user")
            .await?;
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn backend(server: &MockServer) -> HttpBackend {
        HttpBackend::new(server.uri(), "anon-key").unwrap()
    }

    // === Parsing ===

    #[test]
    fn test_parse_content_range() {
        assert_eq!(parse_content_range("0-11/42"), Some(42));
        assert_eq!(parse_content_range("*/0"), Some(0));
        assert_eq!(parse_content_range("0-11/*"), None);
        assert_eq!(parse_content_range("garbage"), None);
    }

    #[test]
    fn test_rejects_base_url_without_scheme() {
        assert!(matches!(
            HttpBackend::new("example.supabase.co", "k"),
            Err(FetchError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_public_url_encodes_segments() {
        let backend = HttpBackend::new("https://proj.supabase.co/", "k").unwrap();
        assert_eq!(
            backend.public_url("media", "reviews/a b.png"),
            "https://proj.supabase.co/storage/v1/object/public/media/reviews/a%20b.png"
        );
    }

    // === Query service ===

    #[tokio::test]
    async fn test_select_sends_range_and_reads_count() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/reviews"))
            .and(query_param("category", "eq.Electronics"))
            .and(header("Range", "12-23"))
            .and(header("Prefer", "count=exact"))
            .and(header("apikey", "anon-key"))
            .and(header("Authorization", "Bearer anon-key"))
            .respond_with(
                ResponseTemplate::new(206)
                    .insert_header("Content-Range", "12-12/13")
                    .set_body_json(json!([{"id": 13}])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let query = Query::from("reviews")
            .eq("category", "Electronics")
            .range(12, 23)
            .count_exact();
        let rows = backend(&server).await.select(&query, None).await.unwrap();

        assert_eq!(rows.count, Some(13));
        assert_eq!(rows.data, json!([{"id": 13}]));
    }

    #[tokio::test]
    async fn test_provider_error_is_parsed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/reviews"))
            .and(header("Authorization", "Bearer user-jwt"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "code": "23505",
                "message": "duplicate key value violates unique constraint",
                "details": null,
                "hint": null
            })))
            .mount(&server)
            .await;

        let err = backend(&server)
            .await
            .insert("reviews", json!({"product_name": "x"}), Some("user-jwt"))
            .await
            .unwrap_err();

        assert_eq!(err.code(), Some("23505"));
        assert_eq!(err.status(), Some(409));
    }

    #[tokio::test]
    async fn test_insert_returns_first_row() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/comments"))
            .and(header("Prefer", "return=representation"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([{"id": 5}])))
            .mount(&server)
            .await;

        let row = backend(&server)
            .await
            .insert("comments", json!({"content": "hi"}), None)
            .await
            .unwrap();
        assert_eq!(row, json!({"id": 5}));
    }

    #[tokio::test]
    async fn test_delete_uses_filters() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/reviews"))
            .and(query_param("id", "eq.7"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        backend(&server)
            .await
            .delete(&Query::from("reviews").eq("id", 7), Some("jwt"))
            .await
            .unwrap();
    }

    // === Storage service ===

    #[tokio::test]
    async fn test_upload_returns_object_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/storage/v1/object/media/abc.png"))
            .and(header("Content-Type", "image/png"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Key": "media/abc.png"})))
            .mount(&server)
            .await;

        let key = backend(&server)
            .await
            .upload("media", "abc.png", vec![1, 2, 3], "image/png", None)
            .await
            .unwrap();
        assert_eq!(key, "media/abc.png");
    }

    #[tokio::test]
    async fn test_remove_sends_prefixes() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/storage/v1/object/media"))
            .and(body_json(json!({"prefixes": ["a.png"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        backend(&server)
            .await
            .remove("media", &["a.png".to_string()], None)
            .await
            .unwrap();
    }

    // === Identity service ===

    #[tokio::test]
    async fn test_sign_in_with_password() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "jwt",
                "token_type": "bearer",
                "user": {"id": "u1", "email": "ana@example.com"}
            })))
            .mount(&server)
            .await;

        let session = backend(&server)
            .await
            .sign_in_with_password("ana@example.com", "Secret123")
            .await
            .unwrap();
        assert_eq!(session.access_token, "jwt");
        assert_eq!(session.user.id.as_str(), "u1");
    }

    #[tokio::test]
    async fn test_bad_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid login credentials"
            })))
            .mount(&server)
            .await;

        let err = backend(&server)
            .await
            .sign_in_with_password("ana@example.com", "Wrong1234")
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Provider(ref e) if e.code() == Some("invalid_grant")));
    }

    #[tokio::test]
    async fn test_connection_refused_is_fetch_error() {
        let backend = HttpBackend::new("http://127.0.0.1:1", "k").unwrap();
        let err = backend.get_user("jwt").await.unwrap_err();
        assert!(matches!(err, BackendError::Fetch(_)));
    }
}
