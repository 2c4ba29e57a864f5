use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum UserStatus {
    Active,
    Inactive,
}

/// A team member. The remote store keys user documents by email (the natural
/// key); `id` carries the credential service's uid once the user has signed
/// in through it.
///
/// `password` only means something in local/demo mode. In remote mode the
/// credential service owns authentication and this field is write-only
/// provisioning input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub status: UserStatus,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}
