use anyhow::Context;
use tracing::info;

use crate::config::AppConfig;
use crate::server;
use crate::state::AppState;

pub async fn handle() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("Invalid configuration")?;
    info!(
        "Starting Journal API in {:?} mode with {} storage",
        config.environment,
        config.storage.mode()
    );

    let state = AppState::from_config(config)?;
    server::serve(state).await.context("Server error")?;
    Ok(())
}
