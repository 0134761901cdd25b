//! CLI command implementations.

pub mod check_config;
pub mod check_history;
pub mod run;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::application::ModerationAgent;
use crate::domain::models::Config;
use crate::domain::ports::ChatClient;
use crate::infrastructure::{ConfigLoader, MatrixClient};

/// Load configuration and initialize logging; shared by every command.
fn load(config_path: Option<&Path>) -> Result<(Config, Option<tracing_appender::non_blocking::WorkerGuard>)> {
    let config = ConfigLoader::load(config_path)?;
    let guard = crate::infrastructure::logging::init(&config.logging)?;
    Ok((config, guard))
}

/// Build a fully wired agent against the configured homeserver.
fn build_agent(config: Config) -> Result<ModerationAgent> {
    let client: Arc<dyn ChatClient> = Arc::new(
        MatrixClient::new(
            &config.homeserver.base_url,
            &config.homeserver.access_token,
        )
        .context("building the homeserver client")?,
    );
    ModerationAgent::new(config, client)
}
