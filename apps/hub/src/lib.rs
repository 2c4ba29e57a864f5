//! BloomHub data layer: local/remote document storage behind one facade,
//! optimistic application state, and the market intelligence client.

pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod research;
pub mod seed;
pub mod state;
pub mod store;

pub use config::Config;
pub use db::Db;
pub use errors::StoreError;
pub use research::{MarketResearch, ResearchClient};
pub use state::{AppController, AppData, IdeaDraft, Toast, ToastKind};
