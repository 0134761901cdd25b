//! `roomwarden run` - the long-running agent.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::services::Shutdown;

pub async fn execute(config_path: Option<&Path>) -> Result<()> {
    let (config, _guard) = super::load(config_path)?;
    let agent = super::build_agent(config)?;

    // startup failures are fatal: no graceful degradation without a log
    // room and a default configuration
    agent.startup().await.context("agent startup failed")?;

    let shutdown = Shutdown::new();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, beginning graceful shutdown");
            signal_shutdown.request();
        }
    });

    agent.run(shutdown).await
}
