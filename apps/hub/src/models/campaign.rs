use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::idea::Comment;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CampaignStatus {
    Planning,
    Active,
    Completed,
    Archived,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Image,
    Video,
    File,
}

/// Promotional asset attached to a campaign. The payload is an inline data
/// URL produced by the upload form, not a blob-store reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CampaignAsset {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AssetKind,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CampaignNote {
    pub id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub author: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Platform {
    Instagram,
    TikTok,
    Email,
    LinkedIn,
    #[serde(rename = "XHS")]
    Xhs,
    Threads,
    #[serde(rename = "Website Content")]
    WebsiteContent,
}

/// Approval workflow: Draft → In Review → {Changes Requested | Approved} →
/// Scheduled. Transitions are not enforced here; the review UI moves drafts
/// freely (sending a reworked draft back to review, for example).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DraftStatus {
    Draft,
    #[serde(rename = "In Review")]
    InReview,
    #[serde(rename = "Changes Requested")]
    ChangesRequested,
    Approved,
    Scheduled,
}

/// A piece of platform content under review. Drafts have no persistence
/// identity of their own: every draft mutation rewrites the parent campaign's
/// whole `content_drafts` array and persists the campaign.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContentDraft {
    pub id: String,
    pub platform: Platform,
    pub caption: String,
    pub media_url: Option<String>,
    pub status: DraftStatus,
    pub author: String,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub feedback: Vec<Comment>,
}

/// A campaign ("initiative"): the unit the content team plans around.
///
/// `start_date`/`end_date` are calendar dates with no time component, stored
/// as ISO date strings. `linked_campaign_ids` is one-directional: linking A
/// to B records B on A only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: CampaignStatus,
    pub channel: String,
    #[serde(default)]
    pub linked_campaign_ids: Vec<String>,
    #[serde(default)]
    pub assets: Vec<CampaignAsset>,
    #[serde(default)]
    pub notes: Vec<CampaignNote>,
    #[serde(default)]
    pub content_drafts: Vec<ContentDraft>,
}

impl Campaign {
    /// Records a one-directional link to `other`. Self-links and duplicates
    /// are ignored; a campaign's link list never contains its own id.
    pub fn link(&mut self, other: &str) {
        if other == self.id || self.linked_campaign_ids.iter().any(|id| id == other) {
            return;
        }
        self.linked_campaign_ids.push(other.to_string());
    }

    /// Removes `other` from this campaign's link list. The other campaign's
    /// own list is untouched.
    pub fn unlink(&mut self, other: &str) {
        self.linked_campaign_ids.retain(|id| id != other);
    }

    /// Replaces the draft with a matching id, or appends it. Callers persist
    /// the whole campaign afterwards.
    pub fn upsert_draft(&mut self, draft: ContentDraft) {
        match self.content_drafts.iter_mut().find(|d| d.id == draft.id) {
            Some(existing) => *existing = draft,
            None => self.content_drafts.push(draft),
        }
    }

    pub fn remove_draft(&mut self, draft_id: &str) {
        self.content_drafts.retain(|d| d.id != draft_id);
    }
}
