use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pipeline stage of an idea. Variants serialize to the display strings the
/// stored documents use, so the wire format and the kanban column labels are
/// the same thing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum IdeaStatus {
    New,
    Validated,
    #[serde(rename = "In Progress")]
    InProgress,
    Live,
    Cancelled,
}

impl IdeaStatus {
    /// Column order of the pipeline board.
    pub const ALL: [IdeaStatus; 5] = [
        IdeaStatus::New,
        IdeaStatus::Validated,
        IdeaStatus::InProgress,
        IdeaStatus::Live,
        IdeaStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IdeaStatus::New => "New",
            IdeaStatus::Validated => "Validated",
            IdeaStatus::InProgress => "In Progress",
            IdeaStatus::Live => "Live",
            IdeaStatus::Cancelled => "Cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub id: String,
    pub author: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// A marketing idea moving through the intake pipeline.
///
/// Field names follow the stored document format (camelCase). `campaign_id`
/// is a soft reference: linking operations keep it pointing at an existing
/// campaign, but the store itself does not enforce it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Idea {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: IdeaStatus,
    pub priority: Priority,
    #[serde(default)]
    pub tags: Vec<String>,
    pub category: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub campaign_id: Option<String>,
}

/// Normalizes a tag to its display form: trimmed, lowercased, exactly one
/// leading `#`. Idempotent, so stored tags can be normalized again on read
/// without drifting. Comparisons must normalize both sides first.
pub fn normalize_tag(raw: &str) -> String {
    let trimmed = raw.trim().trim_start_matches('#');
    format!("#{}", trimmed.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_tag_prepends_hash_and_lowercases() {
        assert_eq!(normalize_tag("Seasonal"), "#seasonal");
        assert_eq!(normalize_tag("  XHS "), "#xhs");
    }

    #[test]
    fn test_normalize_tag_is_idempotent() {
        let once = normalize_tag("Social Media");
        assert_eq!(normalize_tag(&once), once);
    }

    #[test]
    fn test_normalize_tag_collapses_repeated_hashes() {
        assert_eq!(normalize_tag("##cny"), "#cny");
    }

    #[test]
    fn test_status_round_trips_display_strings() {
        let json = serde_json::to_string(&IdeaStatus::InProgress).unwrap();
        assert_eq!(json, "\"In Progress\"");
        let back: IdeaStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, IdeaStatus::InProgress);
    }

    #[test]
    fn test_idea_wire_format_uses_camel_case() {
        let idea = Idea {
            id: "2".into(),
            title: "CNY Deco in the Mall".into(),
            description: String::new(),
            status: IdeaStatus::New,
            priority: Priority::Medium,
            tags: vec![],
            category: "Company Wide".into(),
            author: "Sarah M.".into(),
            created_at: Utc::now(),
            comments: vec![],
            campaign_id: None,
        };
        let value = serde_json::to_value(&idea).unwrap();
        assert!(value.get("createdAt").is_some());
        assert!(value.get("campaignId").is_some());
        // Unset optional fields serialize as explicit null; the remote store
        // rejects missing values.
        assert!(value["campaignId"].is_null());
    }
}
