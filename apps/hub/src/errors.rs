use thiserror::Error;

/// Error type shared by both storage backends, the credential services, and
/// the data access facade.
///
/// The state controller is the only layer that classifies these: it decides
/// between a transient toast and the sticky permission banner. Adapters
/// surface raw failures; the facade passes remote failures through untouched.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An authorization rule rejected the operation. Not retryable without an
    /// external configuration change, so the UI shows a sticky banner.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// A document with the requested id already exists (user provisioning is
    /// keyed by email, so re-adding a known address lands here).
    #[error("document already exists: {0}")]
    AlreadyExists(String),

    /// The credential service rejected the email/password pair, or the
    /// account is inactive.
    #[error("authentication failed: {0}")]
    Unauthorized(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Local disk-level failure. Reads never produce this (they fall back to
    /// defaults); it can only come out of explicit local mutations.
    #[error("storage error: {0}")]
    Storage(String),

    /// Remote service failure that fits none of the categories above.
    #[error("service error (status {status}): {message}")]
    Service { status: u16, message: String },
}

impl StoreError {
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, StoreError::PermissionDenied(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}
