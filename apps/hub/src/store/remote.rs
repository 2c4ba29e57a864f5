//! Remote backend: a hosted document database and a separate credential
//! service, both spoken to over JSON/HTTP.
//!
//! Two wire-format quirks live here and nowhere else: incoming records carry
//! timestamps as `{seconds, nanoseconds}` pairs that must become RFC 3339
//! strings before model deserialization, and outgoing writes must not contain
//! the document id or any missing field (unset options go out as explicit
//! nulls; the models serialize that way already).

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::errors::StoreError;
use crate::store::{AuthService, Collection, Document, DocumentStore, Principal};

const API_KEY_HEADER: &str = "x-api-key";
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
struct ListResponse {
    documents: Vec<WireDocument>,
}

#[derive(Debug, Deserialize)]
struct WireDocument {
    id: String,
    fields: Value,
}

#[derive(Debug, Deserialize)]
struct InsertResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Converts the store's native timestamp representation to RFC 3339 strings,
/// depth-first and recursively, including inside nested arrays and objects.
/// Builds a new value; the input is never mutated.
pub fn revive_timestamps(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            if let Some(ts) = as_timestamp_pair(map) {
                return Value::String(ts);
            }
            Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), revive_timestamps(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(revive_timestamps).collect()),
        other => other.clone(),
    }
}

fn as_timestamp_pair(map: &serde_json::Map<String, Value>) -> Option<String> {
    let seconds = map.get("seconds")?.as_i64()?;
    let nanos = map.get("nanoseconds")?.as_i64()?;
    let datetime = Utc.timestamp_opt(seconds, nanos.clamp(0, 999_999_999) as u32).single()?;
    Some(datetime.to_rfc3339())
}

/// Strips the document id from an outgoing field map. Explicit nulls are kept
/// as-is — the store rejects missing values, not null ones.
pub fn sanitize_fields(mut fields: Value) -> Value {
    if let Value::Object(map) = &mut fields {
        map.remove("id");
    }
    fields
}

fn map_status(status: StatusCode, body: String) -> StoreError {
    // Service errors carry {"error": {"message": ...}}; fall back to the raw
    // body when they don't.
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);
    match status {
        StatusCode::UNAUTHORIZED => StoreError::Unauthorized(message),
        StatusCode::FORBIDDEN => StoreError::PermissionDenied(message),
        StatusCode::NOT_FOUND => StoreError::NotFound(message),
        StatusCode::CONFLICT => StoreError::AlreadyExists(message),
        other => StoreError::Service {
            status: other.as_u16(),
            message,
        },
    }
}

/// Document-database client. One instance is shared by the whole app.
#[derive(Debug, Clone)]
pub struct RemoteStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RemoteStore {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        RemoteStore {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
            base_url: trim_trailing_slash(base_url.into()),
            api_key: api_key.into(),
        }
    }

    fn collection_url(&self, collection: Collection) -> String {
        format!("{}/v1/{}", self.base_url, collection.name())
    }

    fn document_url(&self, collection: Collection, id: &str) -> String {
        format!("{}/v1/{}/{id}", self.base_url, collection.name())
    }

    async fn expect_success(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(map_status(status, body))
    }
}

#[async_trait]
impl DocumentStore for RemoteStore {
    async fn list(&self, collection: Collection) -> Result<Vec<Document>, StoreError> {
        let response = self
            .client
            .get(self.collection_url(collection))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;
        let response = Self::expect_success(response).await?;
        let listed: ListResponse = response.json().await?;
        debug!(
            "listed {} documents from '{}'",
            listed.documents.len(),
            collection.name()
        );
        Ok(listed
            .documents
            .into_iter()
            .map(|doc| Document {
                id: doc.id,
                fields: revive_timestamps(&doc.fields),
            })
            .collect())
    }

    async fn get(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<Document>, StoreError> {
        let response = self
            .client
            .get(self.document_url(collection, id))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = Self::expect_success(response).await?;
        let doc: WireDocument = response.json().await?;
        Ok(Some(Document {
            id: doc.id,
            fields: revive_timestamps(&doc.fields),
        }))
    }

    async fn insert(&self, collection: Collection, fields: Value) -> Result<String, StoreError> {
        let response = self
            .client
            .post(self.collection_url(collection))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&json!({ "fields": sanitize_fields(fields) }))
            .send()
            .await?;
        let response = Self::expect_success(response).await?;
        let inserted: InsertResponse = response.json().await?;
        Ok(inserted.id)
    }

    async fn insert_with_id(
        &self,
        collection: Collection,
        id: &str,
        fields: Value,
    ) -> Result<(), StoreError> {
        let response = self
            .client
            .put(self.document_url(collection, id))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&json!({ "fields": sanitize_fields(fields) }))
            .send()
            .await?;
        Self::expect_success(response).await?;
        Ok(())
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        fields: Value,
    ) -> Result<(), StoreError> {
        let response = self
            .client
            .patch(self.document_url(collection, id))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&json!({ "fields": sanitize_fields(fields) }))
            .send()
            .await?;
        Self::expect_success(response).await?;
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError> {
        let response = self
            .client
            .delete(self.document_url(collection, id))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;
        Self::expect_success(response).await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct SignInResponse {
    uid: String,
    email: String,
    #[serde(rename = "displayName")]
    display_name: Option<String>,
}

/// Credential-service client. Sign-in yields the principal only; role and
/// status come from the `users` collection.
#[derive(Debug, Clone)]
pub struct RemoteAuth {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RemoteAuth {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        RemoteAuth {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
            base_url: trim_trailing_slash(base_url.into()),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl AuthService for RemoteAuth {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Principal, StoreError> {
        let response = self
            .client
            .post(format!("{}/v1/sign-in", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| "invalid email or password".to_string());
            return Err(StoreError::Unauthorized(message));
        }
        let response = RemoteStore::expect_success(response).await?;
        let signed_in: SignInResponse = response.json().await?;
        Ok(Principal {
            uid: signed_in.uid,
            email: signed_in.email,
            display_name: signed_in.display_name,
        })
    }

    async fn sign_out(&self) -> Result<(), StoreError> {
        let response = self
            .client
            .post(format!("{}/v1/sign-out", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;
        RemoteStore::expect_success(response).await?;
        Ok(())
    }
}

fn trim_trailing_slash(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_revive_timestamps_converts_nested_pairs() {
        let input = json!({
            "createdAt": { "seconds": 1_700_000_000, "nanoseconds": 0 },
            "comments": [
                { "id": "c1", "timestamp": { "seconds": 1_700_000_100, "nanoseconds": 500 } }
            ],
            "title": "unchanged"
        });
        let revived = revive_timestamps(&input);
        assert!(revived["createdAt"].is_string());
        assert!(revived["comments"][0]["timestamp"].is_string());
        assert_eq!(revived["title"], "unchanged");
        // Depth-first conversion must not touch the original.
        assert!(input["createdAt"].is_object());
    }

    #[test]
    fn test_revive_timestamps_ignores_partial_pairs() {
        let input = json!({ "seconds": 5 });
        assert_eq!(revive_timestamps(&input), input);
    }

    #[test]
    fn test_sanitize_fields_strips_id_and_keeps_nulls() {
        let fields = json!({ "id": "abc", "campaignId": null, "title": "t" });
        let sanitized = sanitize_fields(fields);
        assert!(sanitized.get("id").is_none());
        assert!(sanitized["campaignId"].is_null());
    }

    #[tokio::test]
    async fn test_list_revives_timestamps_in_documents() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/ideas"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "documents": [
                    { "id": "2", "fields": { "createdAt": { "seconds": 1_700_000_000, "nanoseconds": 0 } } }
                ]
            })))
            .mount(&server)
            .await;

        let store = RemoteStore::new(server.uri(), "key");
        let docs = store.list(Collection::Ideas).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert!(docs[0].fields["createdAt"].is_string());
    }

    #[tokio::test]
    async fn test_forbidden_maps_to_permission_denied() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/campaigns"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": { "message": "security rules rejected the read" }
            })))
            .mount(&server)
            .await;

        let store = RemoteStore::new(server.uri(), "key");
        let err = store.list(Collection::Campaigns).await.unwrap_err();
        assert!(err.is_permission_denied());
    }

    #[tokio::test]
    async fn test_get_missing_document_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/users/ghost@bloomhub.io"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let store = RemoteStore::new(server.uri(), "key");
        let doc = store.get(Collection::Users, "ghost@bloomhub.io").await.unwrap();
        assert!(doc.is_none());
    }

    #[tokio::test]
    async fn test_insert_returns_server_assigned_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/ideas"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "srv-9" })))
            .mount(&server)
            .await;

        let store = RemoteStore::new(server.uri(), "key");
        let id = store
            .insert(Collection::Ideas, json!({ "id": "tmp", "title": "Launch Teaser" }))
            .await
            .unwrap();
        assert_eq!(id, "srv-9");
    }

    #[tokio::test]
    async fn test_duplicate_provisioning_maps_to_already_exists() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/users/jason.k@bloomhub.io"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "error": { "message": "document already exists" }
            })))
            .mount(&server)
            .await;

        let store = RemoteStore::new(server.uri(), "key");
        let err = store
            .insert_with_id(Collection::Users, "jason.k@bloomhub.io", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_sign_in_rejection_is_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/sign-in"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": { "message": "INVALID_PASSWORD" }
            })))
            .mount(&server)
            .await;

        let auth = RemoteAuth::new(server.uri(), "key");
        let err = auth.sign_in("jason.k@bloomhub.io", "nope").await.unwrap_err();
        assert!(matches!(err, StoreError::Unauthorized(_)));
    }
}
