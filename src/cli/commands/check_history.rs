//! `roomwarden check-history` - administrative re-scan of a room.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;

use crate::services::Shutdown;

#[derive(Debug, Args)]
pub struct CheckHistoryArgs {
    /// Room to re-scan
    #[arg(long)]
    pub room: String,

    /// Number of recent messages to re-apply filters to
    #[arg(long, default_value_t = 100)]
    pub count: u32,
}

pub async fn execute(args: CheckHistoryArgs, config_path: Option<&Path>) -> Result<()> {
    let (config, _guard) = super::load(config_path)?;
    let agent = super::build_agent(config)?;

    agent.startup().await.context("agent startup failed")?;

    let shutdown = Shutdown::new();
    let (action_loop, dispatch_loop) = agent.spawn_queues(&shutdown);

    agent.check_history(&args.room, args.count).await?;

    // let the queues empty before asking them to stop
    while agent.pending_work() > 0 {
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    shutdown.request();
    let _ = action_loop.await;
    let _ = dispatch_loop.await;

    // in-flight sends are not tracked by queue depth; give them a moment
    tokio::time::sleep(Duration::from_secs(1)).await;
    Ok(())
}
