//! Built-in demo dataset written into an empty store on first run.
//!
//! Seed records carry predefined ids (users are keyed by email in the remote
//! store) so that re-running the seed against a populated store is a no-op
//! and cross-references stay stable: the seed idea below points at the seed
//! campaign by id.

use chrono::{Duration, Utc};

use crate::models::{
    AppConfig, Campaign, CampaignStatus, Idea, IdeaStatus, Priority, User, UserStatus,
};

/// Password accepted for any seed account in local/demo mode, and the value
/// a password reset falls back to.
pub const DEFAULT_PASSWORD: &str = "welcome123";

pub const SEED_CAMPAIGN_ID: &str = "201";

pub fn seed_config() -> AppConfig {
    AppConfig::default()
}

pub fn seed_users() -> Vec<User> {
    vec![
        User {
            id: "u0".into(),
            name: "Admin User".into(),
            email: "admin@bloomhub.io".into(),
            role: "Admin".into(),
            status: UserStatus::Active,
            avatar_url: None,
            password: Some("admin123".into()),
        },
        User {
            id: "u1".into(),
            name: "Jason K.".into(),
            email: "jason.k@bloomhub.io".into(),
            role: "Marketing Lead".into(),
            status: UserStatus::Active,
            avatar_url: None,
            password: Some(DEFAULT_PASSWORD.into()),
        },
        User {
            id: "u2".into(),
            name: "Sarah M.".into(),
            email: "sarah.m@bloomhub.io".into(),
            role: "Content Strategist".into(),
            status: UserStatus::Active,
            avatar_url: None,
            password: Some(DEFAULT_PASSWORD.into()),
        },
    ]
}

pub fn seed_ideas() -> Vec<Idea> {
    vec![
        Idea {
            id: "2".into(),
            title: "CNY Deco in the Mall".into(),
            description: "Mall decorations for Chinese New Year.".into(),
            status: IdeaStatus::InProgress,
            priority: Priority::Medium,
            tags: vec!["#event".into(), "#seasonal".into(), "#cny".into()],
            category: "Bukit Bintang".into(),
            author: "Sarah M.".into(),
            created_at: Utc::now(),
            comments: vec![],
            campaign_id: None,
        },
        Idea {
            id: "4".into(),
            title: "Create XHS Account".into(),
            description: "Process to create the official Xiao Hong Shu account.".into(),
            status: IdeaStatus::New,
            priority: Priority::High,
            tags: vec!["#social-media".into(), "#xhs".into()],
            category: "Company Wide".into(),
            author: "Tom R.".into(),
            created_at: Utc::now(),
            comments: vec![],
            campaign_id: Some(SEED_CAMPAIGN_ID.into()),
        },
    ]
}

pub fn seed_campaigns() -> Vec<Campaign> {
    let today = Utc::now().date_naive();
    vec![Campaign {
        id: SEED_CAMPAIGN_ID.into(),
        name: "New XHS Accounts".into(),
        description: Some("Establish presence on Xiao Hong Shu (new XHS accounts).".into()),
        start_date: today,
        end_date: today + Duration::days(90),
        status: CampaignStatus::Active,
        channel: "Organic Social".into(),
        linked_campaign_ids: vec![],
        assets: vec![],
        notes: vec![],
        content_drafts: vec![],
    }]
}
