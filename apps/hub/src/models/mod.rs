pub mod campaign;
pub mod idea;
pub mod settings;
pub mod user;

pub use campaign::{
    AssetKind, Campaign, CampaignAsset, CampaignNote, CampaignStatus, ContentDraft, DraftStatus,
    Platform,
};
pub use idea::{normalize_tag, Comment, Idea, IdeaStatus, Priority};
pub use settings::AppConfig;
pub use user::{User, UserStatus};
