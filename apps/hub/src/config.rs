use std::path::PathBuf;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
///
/// Remote settings are optional by design: when no document-store endpoint is
/// configured the app runs in local/demo mode against on-disk storage, which
/// is also what the test suite uses.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory backing local key-value storage (datasets + session token).
    pub data_dir: PathBuf,
    /// Base URL of the hosted document database, e.g. `https://db.example.com`.
    pub store_url: Option<String>,
    /// Base URL of the credential service.
    pub auth_url: Option<String>,
    /// API key sent with every document-store and credential request.
    pub api_key: Option<String>,
    /// Endpoint of the market-research service. Optional; research degrades
    /// to a placeholder report without it.
    pub research_url: Option<String>,
    pub research_api_key: Option<String>,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            data_dir: std::env::var("BLOOMHUB_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),
            store_url: optional_env("BLOOMHUB_STORE_URL"),
            auth_url: optional_env("BLOOMHUB_AUTH_URL"),
            api_key: optional_env("BLOOMHUB_API_KEY"),
            research_url: optional_env("BLOOMHUB_RESEARCH_URL"),
            research_api_key: optional_env("BLOOMHUB_RESEARCH_API_KEY"),
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Remote mode needs the document store, the credential service, and the
    /// shared API key. Anything less falls back to local/demo mode.
    pub fn remote_enabled(&self) -> bool {
        self.store_url.is_some() && self.auth_url.is_some() && self.api_key.is_some()
    }

    /// The remote connection settings, or an error naming the missing pieces.
    pub fn remote_settings(&self) -> Result<(String, String, String)> {
        let store = self
            .store_url
            .clone()
            .context("BLOOMHUB_STORE_URL is not set")?;
        let auth = self
            .auth_url
            .clone()
            .context("BLOOMHUB_AUTH_URL is not set")?;
        let key = self.api_key.clone().context("BLOOMHUB_API_KEY is not set")?;
        Ok((store, auth, key))
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
