//! Data access facade: the single entry point for every read and write.
//!
//! The backend pair (document store + credential service) is chosen once at
//! construction from the configuration; every method has the same return
//! contract regardless of which backend serves it. Local-mode reads never
//! fail for missing data, and remote failures pass through untouched — the
//! only exception is the seeding existence check in `init`, which tolerates
//! read failures so an install whose rules block unauthenticated reads can
//! still reach the login screen.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Config;
use crate::errors::StoreError;
use crate::models::{AppConfig, Campaign, Idea, User, UserStatus};
use crate::seed;
use crate::store::local::{LocalAuth, LocalStorage, LocalStore};
use crate::store::remote::{RemoteAuth, RemoteStore};
use crate::store::{from_document, to_fields, AuthService, Collection, DocumentStore};

/// Local key holding the serialized signed-in User. Its presence is the sole
/// source of truth for "is logged in" at cold start.
pub const SESSION_KEY: &str = "session";
/// Document id of the singleton configuration record.
pub const CONFIG_DOC_ID: &str = "main";

#[derive(Clone)]
pub struct Db {
    store: Arc<dyn DocumentStore>,
    auth: Arc<dyn AuthService>,
    session: LocalStorage,
}

impl Db {
    /// Local/demo mode: datasets and session share one storage directory.
    pub fn local(storage: LocalStorage) -> Self {
        let store = LocalStore::new(storage.clone());
        Db {
            auth: Arc::new(LocalAuth::new(store.clone())),
            store: Arc::new(store),
            session: storage,
        }
    }

    /// Remote mode: hosted document store and credential service; the session
    /// token still lives in local storage.
    pub fn remote(
        store_url: impl Into<String>,
        auth_url: impl Into<String>,
        api_key: impl Into<String>,
        session: LocalStorage,
    ) -> Self {
        let api_key = api_key.into();
        Db {
            store: Arc::new(RemoteStore::new(store_url, api_key.clone())),
            auth: Arc::new(RemoteAuth::new(auth_url, api_key)),
            session,
        }
    }

    /// Selects the backend once, from the environment configuration.
    pub fn from_config(config: &Config) -> Result<Self, StoreError> {
        let storage = LocalStorage::open(&config.data_dir)?;
        if config.remote_enabled() {
            let (store_url, auth_url, api_key) = config
                .remote_settings()
                .map_err(|e| StoreError::Storage(e.to_string()))?;
            info!("using remote document store at {store_url}");
            Ok(Db::remote(store_url, auth_url, api_key, storage))
        } else {
            info!("no remote store configured; running in local/demo mode");
            Ok(Db::local(storage))
        }
    }

    /// Injection seam for tests and alternative backends.
    pub fn with_backends(
        store: Arc<dyn DocumentStore>,
        auth: Arc<dyn AuthService>,
        session: LocalStorage,
    ) -> Self {
        Db {
            store,
            auth,
            session,
        }
    }

    // --- INITIALIZATION ---

    /// One-time seeding, idempotent by config-document existence: a fresh
    /// store gets the default config plus the demo users/ideas/campaigns
    /// under their predefined ids. Never fails startup — a blocked existence
    /// check just means the user authenticates first.
    pub async fn init(&self) {
        let existing = match self.store.get(Collection::Config, CONFIG_DOC_ID).await {
            Ok(existing) => existing,
            Err(e) => {
                warn!("skipping seed check (store not readable yet): {e}");
                return;
            }
        };
        if existing.is_some() {
            return;
        }
        info!("seeding store with demo dataset");
        if let Err(e) = self.seed_all().await {
            warn!("seeding failed: {e}");
        }
    }

    async fn seed_all(&self) -> Result<(), StoreError> {
        self.store
            .insert_with_id(
                Collection::Config,
                CONFIG_DOC_ID,
                to_fields(&seed::seed_config())?,
            )
            .await?;
        for user in seed::seed_users() {
            self.store
                .insert_with_id(Collection::Users, &user.email, to_fields(&user)?)
                .await?;
        }
        for idea in seed::seed_ideas() {
            self.store
                .insert_with_id(Collection::Ideas, &idea.id, to_fields(&idea)?)
                .await?;
        }
        for campaign in seed::seed_campaigns() {
            self.store
                .insert_with_id(Collection::Campaigns, &campaign.id, to_fields(&campaign)?)
                .await?;
        }
        Ok(())
    }

    async fn list_all<T: serde::de::DeserializeOwned>(
        &self,
        collection: Collection,
    ) -> Result<Vec<T>, StoreError> {
        self.store
            .list(collection)
            .await?
            .into_iter()
            .map(from_document)
            .collect()
    }

    // --- IDEAS ---

    pub async fn list_ideas(&self) -> Result<Vec<Idea>, StoreError> {
        self.list_all(Collection::Ideas).await
    }

    /// Persists a new idea and returns it carrying the store-assigned id.
    pub async fn create_idea(&self, idea: &Idea) -> Result<Idea, StoreError> {
        let id = self
            .store
            .insert(Collection::Ideas, to_fields(idea)?)
            .await?;
        Ok(Idea {
            id,
            ..idea.clone()
        })
    }

    pub async fn update_idea(&self, idea: &Idea) -> Result<Idea, StoreError> {
        self.store
            .update(Collection::Ideas, &idea.id, to_fields(idea)?)
            .await?;
        Ok(idea.clone())
    }

    pub async fn delete_idea(&self, id: &str) -> Result<(), StoreError> {
        self.store.delete(Collection::Ideas, id).await
    }

    // --- CAMPAIGNS ---

    pub async fn list_campaigns(&self) -> Result<Vec<Campaign>, StoreError> {
        self.list_all(Collection::Campaigns).await
    }

    pub async fn create_campaign(&self, campaign: &Campaign) -> Result<Campaign, StoreError> {
        let id = self
            .store
            .insert(Collection::Campaigns, to_fields(campaign)?)
            .await?;
        Ok(Campaign {
            id,
            ..campaign.clone()
        })
    }

    pub async fn update_campaign(&self, campaign: &Campaign) -> Result<Campaign, StoreError> {
        self.store
            .update(Collection::Campaigns, &campaign.id, to_fields(campaign)?)
            .await?;
        Ok(campaign.clone())
    }

    pub async fn delete_campaign(&self, id: &str) -> Result<(), StoreError> {
        self.store.delete(Collection::Campaigns, id).await
    }

    // --- USERS ---

    pub async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        self.list_all(Collection::Users).await
    }

    /// Provisions a user document keyed by email (the natural key). Fails
    /// with `AlreadyExists` when the address is already provisioned.
    pub async fn create_user(&self, user: &User) -> Result<User, StoreError> {
        self.store
            .insert_with_id(Collection::Users, &user.email, to_fields(user)?)
            .await?;
        Ok(User {
            id: user.email.clone(),
            ..user.clone()
        })
    }

    pub async fn update_user(&self, user: &User) -> Result<User, StoreError> {
        self.store
            .update(Collection::Users, &user.id, to_fields(user)?)
            .await?;
        Ok(user.clone())
    }

    pub async fn delete_user(&self, id: &str) -> Result<(), StoreError> {
        self.store.delete(Collection::Users, id).await
    }

    /// Password resets are delegated to the credential service out of band;
    /// this only records the request. Demo accounts accept the default
    /// password regardless.
    pub async fn reset_user_password(&self, id: &str) -> Result<(), StoreError> {
        info!("password reset triggered for {id}");
        Ok(())
    }

    // --- CONFIG ---

    /// Reads the singleton config document; absent documents and empty lists
    /// fall back per-list to the built-in defaults.
    pub async fn get_config(&self) -> Result<AppConfig, StoreError> {
        let config = match self.store.get(Collection::Config, CONFIG_DOC_ID).await? {
            Some(doc) => from_document(doc)?,
            None => AppConfig::default(),
        };
        Ok(config.or_defaults())
    }

    pub async fn save_config(&self, config: &AppConfig) -> Result<(), StoreError> {
        let fields = to_fields(config)?;
        match self
            .store
            .update(Collection::Config, CONFIG_DOC_ID, fields.clone())
            .await
        {
            Err(StoreError::NotFound(_)) => {
                self.store
                    .insert_with_id(Collection::Config, CONFIG_DOC_ID, fields)
                    .await
            }
            other => other,
        }
    }

    // --- AUTH ---

    /// Signs in through the credential service, loads the email-keyed
    /// profile (inactive accounts are rejected), and persists the session
    /// token. A missing profile document falls back to a Contributor profile
    /// so a freshly provisioned account can still get in.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, StoreError> {
        let principal = self.auth.sign_in(email, password).await?;
        let user = match self.store.get(Collection::Users, &principal.email).await? {
            Some(doc) => {
                let mut user: User = from_document(doc)?;
                if user.status == UserStatus::Inactive {
                    return Err(StoreError::Unauthorized("account is inactive".into()));
                }
                user.id = principal.uid;
                user
            }
            None => User {
                id: principal.uid,
                name: principal.display_name.unwrap_or_else(|| "User".to_string()),
                email: principal.email,
                role: "Contributor".into(),
                status: UserStatus::Active,
                avatar_url: None,
                password: None,
            },
        };
        self.session.set(SESSION_KEY, &user);
        Ok(user)
    }

    /// Best-effort remote sign-out; the local session token is cleared
    /// unconditionally.
    pub async fn logout(&self) {
        if let Err(e) = self.auth.sign_out().await {
            warn!("remote sign-out failed: {e}");
        }
        self.session.remove(SESSION_KEY);
    }

    /// Synchronous, network-free session read; corrupt or missing tokens
    /// yield `None`. This is what lets the UI decide at cold start whether
    /// to show the login screen.
    pub fn get_session(&self) -> Option<User> {
        self.session.get(SESSION_KEY, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IdeaStatus, Priority};
    use chrono::Utc;
    use tempfile::TempDir;

    fn local_db() -> (TempDir, Db) {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::open(dir.path()).unwrap();
        (dir, Db::local(storage))
    }

    fn new_idea(title: &str) -> Idea {
        Idea {
            id: "tmp-1".into(),
            title: title.into(),
            description: "teaser".into(),
            status: IdeaStatus::New,
            priority: Priority::Medium,
            tags: vec!["#launch".into()],
            category: "Company Wide".into(),
            author: "Jason K.".into(),
            created_at: Utc::now(),
            comments: vec![],
            campaign_id: None,
        }
    }

    #[tokio::test]
    async fn test_init_seeds_once() {
        let (_dir, db) = local_db();
        db.init().await;
        db.init().await;
        let users = db.list_users().await.unwrap();
        assert_eq!(users.len(), seed::seed_users().len());
        let ideas = db.list_ideas().await.unwrap();
        assert_eq!(ideas.len(), seed::seed_ideas().len());
    }

    #[tokio::test]
    async fn test_create_then_read_back_differs_only_in_id() {
        let (_dir, db) = local_db();
        let idea = new_idea("Launch Teaser");
        let saved = db.create_idea(&idea).await.unwrap();
        assert_ne!(saved.id, idea.id);
        let listed = db.list_ideas().await.unwrap();
        assert_eq!(listed.len(), 1);
        let mut expected = idea.clone();
        expected.id = saved.id.clone();
        assert_eq!(listed[0], expected);
    }

    #[tokio::test]
    async fn test_login_accepts_default_password_and_persists_session() {
        let (_dir, db) = local_db();
        db.init().await;
        let user = db.login("jason.k@bloomhub.io", "welcome123").await.unwrap();
        assert_eq!(user.name, "Jason K.");
        assert_eq!(db.get_session().unwrap().email, user.email);
    }

    #[tokio::test]
    async fn test_login_rejects_wrong_password() {
        let (_dir, db) = local_db();
        db.init().await;
        let err = db.login("jason.k@bloomhub.io", "nope").await.unwrap_err();
        assert!(matches!(err, StoreError::Unauthorized(_)));
        assert!(db.get_session().is_none());
    }

    #[tokio::test]
    async fn test_logout_clears_session_token() {
        let (_dir, db) = local_db();
        db.init().await;
        db.login("sarah.m@bloomhub.io", "welcome123").await.unwrap();
        db.logout().await;
        assert!(db.get_session().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_session_token_reads_as_logged_out() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::open(dir.path()).unwrap();
        std::fs::write(dir.path().join("session.json"), "{oops").unwrap();
        let db = Db::local(storage);
        assert!(db.get_session().is_none());
    }

    #[tokio::test]
    async fn test_empty_config_lists_fall_back_to_defaults() {
        let (_dir, db) = local_db();
        db.save_config(&AppConfig {
            categories: vec![],
            roles: vec!["Admin".into()],
            channels: vec![],
        })
        .await
        .unwrap();
        let config = db.get_config().await.unwrap();
        assert_eq!(config.categories, AppConfig::default().categories);
        assert_eq!(config.roles, vec!["Admin".to_string()]);
    }

    #[tokio::test]
    async fn test_provisioning_duplicate_email_fails() {
        let (_dir, db) = local_db();
        db.init().await;
        let dup = User {
            id: "tmp".into(),
            name: "Jason Again".into(),
            email: "jason.k@bloomhub.io".into(),
            role: "Analyst".into(),
            status: UserStatus::Active,
            avatar_url: None,
            password: None,
        };
        let err = db.create_user(&dup).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }
}
