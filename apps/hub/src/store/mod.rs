//! Storage backends.
//!
//! The facade talks to exactly one `DocumentStore`/`AuthService` pair,
//! selected once at startup: `local` (on-disk key-value storage, demo
//! credentials) or `remote` (hosted document database plus a separate
//! credential service). Callers cannot tell which backend served a call —
//! the contracts are identical.

pub mod local;
pub mod remote;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::errors::StoreError;

/// The four server-side collections. `Config` holds exactly one singleton
/// document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Users,
    Config,
    Ideas,
    Campaigns,
}

impl Collection {
    pub fn name(self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Config => "config",
            Collection::Ideas => "ideas",
            Collection::Campaigns => "campaigns",
        }
    }
}

/// A stored record: the document key plus its field map. The id is never
/// duplicated inside `fields`; adapters strip it on write and the facade
/// reattaches it when deserializing into a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub fields: Value,
}

/// Reattaches the document key as the model's `id` field and deserializes.
pub fn from_document<T: DeserializeOwned>(doc: Document) -> Result<T, StoreError> {
    let mut fields = doc.fields;
    if let Value::Object(map) = &mut fields {
        map.insert("id".to_string(), Value::String(doc.id));
    }
    Ok(serde_json::from_value(fields)?)
}

/// Serializes a model into a document field map, dropping the `id` (it lives
/// in the document key). Optional fields stay present as explicit nulls.
pub fn to_fields<T: Serialize>(record: &T) -> Result<Value, StoreError> {
    let mut value = serde_json::to_value(record)?;
    if let Value::Object(map) = &mut value {
        map.remove("id");
    }
    Ok(value)
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn list(&self, collection: Collection) -> Result<Vec<Document>, StoreError>;

    async fn get(&self, collection: Collection, id: &str)
        -> Result<Option<Document>, StoreError>;

    /// Inserts a new document; the store assigns and returns the id.
    async fn insert(&self, collection: Collection, fields: Value) -> Result<String, StoreError>;

    /// Inserts under a caller-chosen id. Used for first-run seeding and for
    /// email-keyed user provisioning; fails with `AlreadyExists` if the id
    /// is taken.
    async fn insert_with_id(
        &self,
        collection: Collection,
        id: &str,
        fields: Value,
    ) -> Result<(), StoreError>;

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        fields: Value,
    ) -> Result<(), StoreError>;

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError>;
}

/// The signed-in identity returned by a credential service. Role and status
/// live in the `users` collection keyed by email, not here.
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
}

#[async_trait]
pub trait AuthService: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Principal, StoreError>;

    async fn sign_out(&self) -> Result<(), StoreError>;
}
