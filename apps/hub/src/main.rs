use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use bloomhub::config::Config;
use bloomhub::db::Db;
use bloomhub::state::AppController;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting BloomHub v{}", env!("CARGO_PKG_VERSION"));

    let db = Db::from_config(&config)?;
    let controller = AppController::new(db);

    // Phase 1: synchronous session check, no network.
    controller.bootstrap();
    let data = controller.snapshot();
    match &data.current_user {
        Some(user) => info!("resumed session for {}", user.email),
        None => info!("no stored session; sign in to load data"),
    }

    // Phase 2: gated on a signed-in user.
    controller.load_data().await;
    let data = controller.snapshot();
    info!(
        "loaded {} idea(s), {} initiative(s), {} user(s)",
        data.ideas.len(),
        data.campaigns.len(),
        data.users.len()
    );

    Ok(())
}
