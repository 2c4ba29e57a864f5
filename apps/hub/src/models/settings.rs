use serde::{Deserialize, Serialize};

/// Built-in dropdown options, used to seed a fresh install and as the
/// fallback whenever a stored list comes back empty.
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "Company Wide",
    "Bukit Bintang",
    "Bangsar",
    "Yishun",
    "Pavilion Damansara Heights",
];

pub const DEFAULT_ROLES: &[&str] = &[
    "Admin",
    "Marketing Lead",
    "Content Strategist",
    "Product Manager",
    "Community Manager",
    "Contributor",
    "Designer",
    "Analyst",
];

pub const DEFAULT_CHANNELS: &[&str] = &[
    "Cross-channel",
    "Social Ads",
    "Organic Social",
    "Email",
    "Influencer",
    "Event",
    "In-Store",
    "PR",
];

/// The singleton configuration document: three independently editable option
/// lists that populate dropdowns across the app. Exactly one of these exists
/// per installation (document id `main`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    pub categories: Vec<String>,
    pub roles: Vec<String>,
    pub channels: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            categories: to_owned(DEFAULT_CATEGORIES),
            roles: to_owned(DEFAULT_ROLES),
            channels: to_owned(DEFAULT_CHANNELS),
        }
    }
}

impl AppConfig {
    /// Replaces any empty list with its built-in default. Every read site
    /// goes through this, so the invariant "config lists are non-empty" holds
    /// even when the stored document is partially blank.
    pub fn or_defaults(mut self) -> Self {
        if self.categories.is_empty() {
            self.categories = to_owned(DEFAULT_CATEGORIES);
        }
        if self.roles.is_empty() {
            self.roles = to_owned(DEFAULT_ROLES);
        }
        if self.channels.is_empty() {
            self.channels = to_owned(DEFAULT_CHANNELS);
        }
        self
    }
}

fn to_owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}
