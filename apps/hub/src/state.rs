//! Application state controller.
//!
//! Owns the in-memory collections the presentation layer renders, and runs
//! every mutation through the same three-phase transaction: snapshot the
//! affected collection, apply the change optimistically, then persist —
//! committing id reconciliation on success or restoring the snapshot on
//! failure. Failures are classified here and nowhere else: permission
//! problems raise a sticky banner on top of the transient toast queue,
//! everything else is a toast the user can retry.
//!
//! State changes are published on a `tokio::sync::watch` channel; the
//! presentation layer subscribes instead of holding the collections itself.

use std::future::Future;
use std::sync::{Mutex, PoisonError};

use chrono::{Duration, Utc};
use tokio::sync::watch;
use tracing::debug;
use uuid::Uuid;

use crate::db::Db;
use crate::errors::StoreError;
use crate::models::{
    normalize_tag, AppConfig, Campaign, CampaignStatus, Idea, IdeaStatus, Priority, User,
    UserStatus,
};
use crate::seed::DEFAULT_PASSWORD;

/// Remediation guidance shown while a permission failure persists. Dismissed
/// manually, not on a timer — retrying cannot help until the store's access
/// rules change.
pub const PERMISSION_BANNER: &str =
    "The data store rejected the last change. Check your sign-in state and the \
     store's access rules; changes will not be saved until this is resolved.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
}

/// Everything the presentation layer needs to render one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppData {
    pub current_user: Option<User>,
    pub ideas: Vec<Idea>,
    pub campaigns: Vec<Campaign>,
    pub users: Vec<User>,
    pub config: AppConfig,
    pub selected_campaign_id: Option<String>,
    pub toasts: Vec<Toast>,
    pub banner: Option<String>,
    pub loading: bool,
}

/// Marker for collections the optimistic transaction can snapshot/restore.
trait Record: Clone + PartialEq + Send + 'static {
    fn slot(data: &mut AppData) -> &mut Vec<Self>;
}

impl Record for Idea {
    fn slot(data: &mut AppData) -> &mut Vec<Self> {
        &mut data.ideas
    }
}

impl Record for Campaign {
    fn slot(data: &mut AppData) -> &mut Vec<Self> {
        &mut data.campaigns
    }
}

impl Record for User {
    fn slot(data: &mut AppData) -> &mut Vec<Self> {
        &mut data.users
    }
}

/// Input for a new idea; unset fields take the same defaults the intake form
/// applies.
#[derive(Debug, Clone, Default)]
pub struct IdeaDraft {
    pub title: String,
    pub description: String,
    pub status: Option<IdeaStatus>,
    pub priority: Option<Priority>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub campaign_id: Option<String>,
}

pub struct AppController {
    db: Db,
    data: Mutex<AppData>,
    updates: watch::Sender<AppData>,
}

impl AppController {
    pub fn new(db: Db) -> Self {
        let (updates, _) = watch::channel(AppData::default());
        AppController {
            db,
            data: Mutex::new(AppData::default()),
            updates,
        }
    }

    /// Subscription point for the presentation layer; every state change is
    /// published as a fresh snapshot.
    pub fn subscribe(&self) -> watch::Receiver<AppData> {
        self.updates.subscribe()
    }

    pub fn snapshot(&self) -> AppData {
        self.data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn with_data<R>(&self, f: impl FnOnce(&mut AppData) -> R) -> R {
        let mut data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        let result = f(&mut data);
        self.updates.send_replace(data.clone());
        result
    }

    // --- SESSION & BOOTSTRAP ---

    /// Phase 1 of startup: a synchronous session check, no network. This
    /// alone decides whether the login screen shows.
    pub fn bootstrap(&self) {
        let user = self.db.get_session();
        self.with_data(|d| d.current_user = user);
    }

    /// Phase 2, gated on a present user: seed-if-empty, then fetch the four
    /// collections concurrently. A failure here toasts but does not log the
    /// user out.
    pub async fn load_data(&self) {
        if self.snapshot().current_user.is_none() {
            debug!("skipping data load: no user signed in");
            return;
        }
        self.with_data(|d| d.loading = true);
        self.db.init().await;
        let (users, config, ideas, campaigns) = tokio::join!(
            self.db.list_users(),
            self.db.get_config(),
            self.db.list_ideas(),
            self.db.list_campaigns(),
        );
        let loaded = (|| Ok::<_, StoreError>((users?, config?, ideas?, campaigns?)))();
        match loaded {
            Ok((users, config, ideas, campaigns)) => self.with_data(|d| {
                d.users = users;
                d.config = config;
                d.ideas = ideas;
                d.campaigns = campaigns;
                d.loading = false;
            }),
            Err(err) => {
                self.with_data(|d| d.loading = false);
                self.report_failure(&err);
            }
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(), StoreError> {
        // Seed-if-empty must run before the credential check: on a fresh
        // local install the demo accounts do not exist yet.
        self.db.init().await;
        match self.db.login(email, password).await {
            Ok(user) => {
                self.with_data(|d| d.current_user = Some(user));
                self.load_data().await;
                Ok(())
            }
            Err(err) => {
                self.report_failure(&err);
                Err(err)
            }
        }
    }

    /// Clears the in-memory collections along with the session so a later
    /// sign-in on the same instance never sees the previous user's data.
    pub async fn logout(&self) {
        self.with_data(|d| {
            d.current_user = None;
            d.ideas.clear();
            d.campaigns.clear();
            d.users.clear();
            d.config = AppConfig::default();
            d.selected_campaign_id = None;
        });
        self.db.logout().await;
    }

    // --- OPTIMISTIC TRANSACTION CORE ---

    /// Snapshot → optimistic apply → persist → commit or roll back. The
    /// snapshot covers the one collection `T` selects; `commit` runs only on
    /// success (id reconciliation lives there).
    async fn transact<T, R, Fut>(
        &self,
        apply: impl FnOnce(&mut AppData),
        persist: Fut,
        commit: impl FnOnce(&mut AppData, R),
        success: Option<&str>,
    ) -> Result<(), StoreError>
    where
        T: Record,
        Fut: Future<Output = Result<R, StoreError>>,
    {
        let snapshot = self.with_data(|d| {
            let snapshot = T::slot(d).clone();
            apply(d);
            snapshot
        });
        match persist.await {
            Ok(result) => {
                self.with_data(|d| {
                    commit(d, result);
                    if let Some(message) = success {
                        d.toasts.push(Toast {
                            kind: ToastKind::Success,
                            message: message.to_string(),
                        });
                    }
                });
                Ok(())
            }
            Err(err) => {
                self.with_data(|d| *T::slot(d) = snapshot);
                self.report_failure(&err);
                Err(err)
            }
        }
    }

    fn report_failure(&self, err: &StoreError) {
        let message = match err {
            StoreError::PermissionDenied(_) => {
                "Permission denied — the change was not saved.".to_string()
            }
            StoreError::NotFound(_) => "That record no longer exists.".to_string(),
            StoreError::AlreadyExists(_) => "A user with this email already exists.".to_string(),
            StoreError::Unauthorized(_) => "Invalid email or password.".to_string(),
            StoreError::Network(_) => "Network error — please try again.".to_string(),
            other => format!("Something went wrong: {other}"),
        };
        self.with_data(|d| {
            if err.is_permission_denied() {
                d.banner = Some(PERMISSION_BANNER.to_string());
            }
            d.toasts.push(Toast {
                kind: ToastKind::Error,
                message,
            });
        });
    }

    // --- NOTIFICATIONS ---

    pub fn drain_toasts(&self) -> Vec<Toast> {
        self.with_data(|d| std::mem::take(&mut d.toasts))
    }

    pub fn dismiss_banner(&self) {
        self.with_data(|d| d.banner = None);
    }

    pub fn select_campaign(&self, id: Option<String>) {
        self.with_data(|d| d.selected_campaign_id = id);
    }

    // --- IDEAS ---

    pub async fn add_idea(&self, draft: IdeaDraft) -> Result<(), StoreError> {
        let current = self.snapshot();
        let author = current
            .current_user
            .as_ref()
            .map(|u| u.name.clone())
            .unwrap_or_else(|| "Unknown".to_string());
        let category = draft.category.unwrap_or_else(|| {
            current
                .config
                .categories
                .first()
                .cloned()
                .unwrap_or_else(|| "General".to_string())
        });
        let idea = Idea {
            id: temp_id(),
            title: draft.title,
            description: draft.description,
            status: draft.status.unwrap_or(IdeaStatus::New),
            priority: draft.priority.unwrap_or(Priority::Medium),
            tags: draft.tags.iter().map(|t| normalize_tag(t)).collect(),
            category,
            author,
            created_at: Utc::now(),
            comments: vec![],
            campaign_id: draft.campaign_id,
        };
        let temp = idea.id.clone();
        let optimistic = idea.clone();
        self.transact::<Idea, Idea, _>(
            move |d| d.ideas.insert(0, optimistic),
            self.db.create_idea(&idea),
            move |d, saved| {
                if let Some(entry) = d.ideas.iter_mut().find(|i| i.id == temp) {
                    entry.id = saved.id;
                }
            },
            Some("Idea added"),
        )
        .await
    }

    pub async fn update_idea(&self, updated: Idea) -> Result<(), StoreError> {
        let optimistic = updated.clone();
        self.transact::<Idea, Idea, _>(
            move |d| {
                if let Some(entry) = d.ideas.iter_mut().find(|i| i.id == optimistic.id) {
                    *entry = optimistic;
                }
            },
            self.db.update_idea(&updated),
            |_, _| {},
            Some("Idea updated"),
        )
        .await
    }

    pub async fn delete_idea(&self, id: &str) -> Result<(), StoreError> {
        let id = id.to_string();
        let removed = id.clone();
        self.transact::<Idea, (), _>(
            move |d| d.ideas.retain(|i| i.id != removed),
            self.db.delete_idea(&id),
            |_, _| {},
            Some("Idea deleted"),
        )
        .await
    }

    // --- CAMPAIGNS ---

    /// Creates the blank "New Initiative" template and selects it so the
    /// detail view opens immediately.
    pub async fn add_campaign(&self) -> Result<(), StoreError> {
        let today = Utc::now().date_naive();
        let channel = self
            .snapshot()
            .config
            .channels
            .first()
            .cloned()
            .unwrap_or_else(|| "TBD".to_string());
        let campaign = Campaign {
            id: temp_id(),
            name: "New Initiative".into(),
            description: Some("Describe your new initiative here...".into()),
            start_date: today,
            end_date: today + Duration::days(30),
            status: CampaignStatus::Planning,
            channel,
            linked_campaign_ids: vec![],
            assets: vec![],
            notes: vec![],
            content_drafts: vec![],
        };
        let temp = campaign.id.clone();
        let optimistic = campaign.clone();
        let result = self
            .transact::<Campaign, Campaign, _>(
                {
                    let temp = temp.clone();
                    move |d| {
                        d.campaigns.insert(0, optimistic);
                        d.selected_campaign_id = Some(temp);
                    }
                },
                self.db.create_campaign(&campaign),
                {
                    let temp = temp.clone();
                    move |d, saved| reconcile_campaign_id(d, &temp, &saved.id)
                },
                Some("Initiative created"),
            )
            .await;
        if result.is_err() {
            // The rollback removed the optimistic record; drop the dangling
            // selection too.
            self.with_data(|d| {
                if d.selected_campaign_id.as_deref() == Some(temp.as_str()) {
                    d.selected_campaign_id = None;
                }
            });
        }
        result
    }

    /// Quiet on success: campaign fields are edited per keystroke and a toast
    /// per edit would be spam.
    pub async fn update_campaign(&self, updated: Campaign) -> Result<(), StoreError> {
        let optimistic = updated.clone();
        self.transact::<Campaign, Campaign, _>(
            move |d| {
                if let Some(entry) = d.campaigns.iter_mut().find(|c| c.id == optimistic.id) {
                    *entry = optimistic;
                }
            },
            self.db.update_campaign(&updated),
            |_, _| {},
            None,
        )
        .await
    }

    pub async fn delete_campaign(&self, id: &str) -> Result<(), StoreError> {
        let id = id.to_string();
        let removed = id.clone();
        self.transact::<Campaign, (), _>(
            move |d| {
                d.campaigns.retain(|c| c.id != removed);
                if d.selected_campaign_id.as_deref() == Some(removed.as_str()) {
                    d.selected_campaign_id = None;
                }
            },
            self.db.delete_campaign(&id),
            |_, _| {},
            Some("Initiative deleted"),
        )
        .await
    }

    /// Records the link on `from` only; `to` is not told about it.
    pub async fn link_campaigns(&self, from: &str, to: &str) -> Result<(), StoreError> {
        let Some(mut campaign) = self.find_campaign(from) else {
            return Ok(());
        };
        campaign.link(to);
        self.update_campaign(campaign).await
    }

    pub async fn unlink_campaigns(&self, from: &str, to: &str) -> Result<(), StoreError> {
        let Some(mut campaign) = self.find_campaign(from) else {
            return Ok(());
        };
        campaign.unlink(to);
        self.update_campaign(campaign).await
    }

    fn find_campaign(&self, id: &str) -> Option<Campaign> {
        self.snapshot().campaigns.iter().find(|c| c.id == id).cloned()
    }

    // --- USERS ---

    pub async fn add_user(&self, user: User) -> Result<(), StoreError> {
        let optimistic = user.clone();
        let temp = user.id.clone();
        self.transact::<User, User, _>(
            move |d| d.users.push(optimistic),
            self.db.create_user(&user),
            move |d, saved| {
                if let Some(entry) = d.users.iter_mut().find(|u| u.id == temp) {
                    entry.id = saved.id;
                }
            },
            Some("User added"),
        )
        .await
    }

    pub async fn update_user_status(
        &self,
        id: &str,
        status: UserStatus,
    ) -> Result<(), StoreError> {
        let Some(mut user) = self
            .snapshot()
            .users
            .iter()
            .find(|u| u.id == id)
            .cloned()
        else {
            return Ok(());
        };
        user.status = status;
        let optimistic = user.clone();
        self.transact::<User, User, _>(
            move |d| {
                if let Some(entry) = d.users.iter_mut().find(|u| u.id == optimistic.id) {
                    *entry = optimistic;
                }
            },
            self.db.update_user(&user),
            |_, _| {},
            Some("User updated"),
        )
        .await
    }

    pub async fn reset_user_password(&self, id: &str) -> Result<(), StoreError> {
        self.db.reset_user_password(id).await?;
        self.with_data(|d| {
            d.toasts.push(Toast {
                kind: ToastKind::Success,
                message: format!("Password has been reset to '{DEFAULT_PASSWORD}'"),
            })
        });
        Ok(())
    }

    // --- CONFIG ---

    /// The config is a singleton, not a collection, so its three-phase
    /// transaction is written out by hand.
    pub async fn update_config(&self, config: AppConfig) -> Result<(), StoreError> {
        let snapshot = self.with_data(|d| {
            let snapshot = d.config.clone();
            d.config = config.clone();
            snapshot
        });
        match self.db.save_config(&config).await {
            Ok(()) => {
                self.with_data(|d| {
                    d.toasts.push(Toast {
                        kind: ToastKind::Success,
                        message: "Settings saved".to_string(),
                    })
                });
                Ok(())
            }
            Err(err) => {
                self.with_data(|d| d.config = snapshot);
                self.report_failure(&err);
                Err(err)
            }
        }
    }
}

/// After a successful create, the temporary id is replaced everywhere state
/// can point at it: the campaign itself, the selection pointer, idea links,
/// and other campaigns' link lists.
fn reconcile_campaign_id(data: &mut AppData, temp: &str, new_id: &str) {
    if let Some(campaign) = data.campaigns.iter_mut().find(|c| c.id == temp) {
        campaign.id = new_id.to_string();
    }
    if data.selected_campaign_id.as_deref() == Some(temp) {
        data.selected_campaign_id = Some(new_id.to_string());
    }
    for idea in data.ideas.iter_mut() {
        if idea.campaign_id.as_deref() == Some(temp) {
            idea.campaign_id = Some(new_id.to_string());
        }
    }
    for campaign in data.campaigns.iter_mut() {
        for linked in campaign.linked_campaign_ids.iter_mut() {
            if linked == temp {
                *linked = new_id.to_string();
            }
        }
    }
}

/// Locally unique placeholder id, superseded by the store-assigned id after
/// the create round trip. Nothing may depend on its format.
fn temp_id() -> String {
    Uuid::new_v4().simple().to_string()
}
