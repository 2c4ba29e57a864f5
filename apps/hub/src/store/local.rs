//! Local/demo backend: directory-backed key-value storage, one JSON file per
//! key, plus a credential check against the locally stored user records.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::StoreError;
use crate::models::User;
use crate::seed::DEFAULT_PASSWORD;
use crate::store::{from_document, AuthService, Collection, Document, DocumentStore, Principal};

/// Key-value persistence with the tolerance rules the UI depends on: reads
/// of absent or corrupt entries return the caller's fallback, and failed
/// writes are logged and swallowed, leaving the previous file intact.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    dir: PathBuf,
}

impl LocalStorage {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| StoreError::Storage(format!("cannot create {}: {e}", dir.display())))?;
        Ok(LocalStorage { dir })
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str, fallback: T) -> T {
        let path = self.path(key);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(_) => return fallback,
        };
        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                // Corrupt entries are treated as "no data"; never surfaced.
                debug!("ignoring corrupt entry for key '{key}': {e}");
                fallback
            }
        }
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) {
        let path = self.path(key);
        let serialized = match serde_json::to_string_pretty(value) {
            Ok(s) => s,
            Err(e) => {
                warn!("failed to serialize '{key}': {e}");
                return;
            }
        };
        if let Err(e) = fs::write(&path, serialized) {
            warn!("failed to write '{key}' to {}: {e}", path.display());
        }
    }

    pub fn remove(&self, key: &str) {
        if let Err(e) = fs::remove_file(self.path(key)) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("failed to remove '{key}': {e}");
            }
        }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// `DocumentStore` over `LocalStorage`: each collection is one key holding an
/// array of documents. Reads never fail for missing data.
#[derive(Debug, Clone)]
pub struct LocalStore {
    storage: LocalStorage,
}

impl LocalStore {
    pub fn new(storage: LocalStorage) -> Self {
        LocalStore { storage }
    }

    fn read(&self, collection: Collection) -> Vec<Document> {
        self.storage.get(collection.name(), Vec::new())
    }

    fn write(&self, collection: Collection, docs: &[Document]) {
        self.storage.set(collection.name(), &docs);
    }
}

#[async_trait]
impl DocumentStore for LocalStore {
    async fn list(&self, collection: Collection) -> Result<Vec<Document>, StoreError> {
        Ok(self.read(collection))
    }

    async fn get(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<Document>, StoreError> {
        Ok(self.read(collection).into_iter().find(|d| d.id == id))
    }

    async fn insert(&self, collection: Collection, fields: Value) -> Result<String, StoreError> {
        let id = Uuid::new_v4().simple().to_string();
        let mut docs = self.read(collection);
        docs.push(Document {
            id: id.clone(),
            fields,
        });
        self.write(collection, &docs);
        Ok(id)
    }

    async fn insert_with_id(
        &self,
        collection: Collection,
        id: &str,
        fields: Value,
    ) -> Result<(), StoreError> {
        let mut docs = self.read(collection);
        if docs.iter().any(|d| d.id == id) {
            return Err(StoreError::AlreadyExists(format!(
                "{}/{id}",
                collection.name()
            )));
        }
        docs.push(Document {
            id: id.to_string(),
            fields,
        });
        self.write(collection, &docs);
        Ok(())
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        fields: Value,
    ) -> Result<(), StoreError> {
        let mut docs = self.read(collection);
        match docs.iter_mut().find(|d| d.id == id) {
            Some(doc) => doc.fields = fields,
            None => {
                return Err(StoreError::NotFound(format!("{}/{id}", collection.name())));
            }
        }
        self.write(collection, &docs);
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError> {
        let mut docs = self.read(collection);
        let before = docs.len();
        docs.retain(|d| d.id != id);
        if docs.len() == before {
            return Err(StoreError::NotFound(format!("{}/{id}", collection.name())));
        }
        self.write(collection, &docs);
        Ok(())
    }
}

/// Demo-mode credentials: a stored per-user password or the fixed default
/// one unlocks any locally known account.
#[derive(Debug, Clone)]
pub struct LocalAuth {
    store: LocalStore,
}

impl LocalAuth {
    pub fn new(store: LocalStore) -> Self {
        LocalAuth { store }
    }
}

#[async_trait]
impl AuthService for LocalAuth {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Principal, StoreError> {
        let docs = self.store.list(Collection::Users).await?;
        for doc in docs {
            let uid = doc.id.clone();
            let user: User = match from_document(doc) {
                Ok(user) => user,
                Err(_) => continue,
            };
            if !user.email.eq_ignore_ascii_case(email) {
                continue;
            }
            let stored = user.password.as_deref();
            if stored == Some(password) || password == DEFAULT_PASSWORD {
                return Ok(Principal {
                    uid,
                    email: user.email,
                    display_name: Some(user.name),
                });
            }
            break;
        }
        Err(StoreError::Unauthorized("invalid email or password".into()))
    }

    async fn sign_out(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn storage() -> (TempDir, LocalStorage) {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::open(dir.path()).unwrap();
        (dir, storage)
    }

    #[test]
    fn test_get_returns_fallback_for_missing_key() {
        let (_dir, storage) = storage();
        let value: Vec<String> = storage.get("nothing", vec!["fallback".into()]);
        assert_eq!(value, vec!["fallback".to_string()]);
    }

    #[test]
    fn test_get_returns_fallback_for_corrupt_entry() {
        let (_dir, storage) = storage();
        std::fs::write(storage.dir().join("broken.json"), "{not json").unwrap();
        let value: Option<i64> = storage.get("broken", None);
        assert_eq!(value, None);
    }

    #[test]
    fn test_set_then_get_round_trips() {
        let (_dir, storage) = storage();
        storage.set("answer", &42i64);
        assert_eq!(storage.get("answer", 0i64), 42);
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_persists() {
        let (_dir, storage) = storage();
        let store = LocalStore::new(storage);
        let id = store
            .insert(Collection::Ideas, json!({"title": "Launch Teaser"}))
            .await
            .unwrap();
        let doc = store.get(Collection::Ideas, &id).await.unwrap().unwrap();
        assert_eq!(doc.fields["title"], "Launch Teaser");
    }

    #[tokio::test]
    async fn test_insert_with_id_rejects_duplicates() {
        let (_dir, storage) = storage();
        let store = LocalStore::new(storage);
        store
            .insert_with_id(Collection::Users, "a@b.io", json!({}))
            .await
            .unwrap();
        let err = store
            .insert_with_id(Collection::Users, "a@b.io", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_update_and_delete_of_missing_id_are_not_found() {
        let (_dir, storage) = storage();
        let store = LocalStore::new(storage);
        let err = store
            .update(Collection::Campaigns, "ghost", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        let err = store.delete(Collection::Campaigns, "ghost").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
