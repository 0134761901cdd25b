//! `roomwarden check-config` - validate configuration and print a summary.

use std::path::Path;

use anyhow::Result;

use crate::infrastructure::ConfigLoader;

pub fn execute(config_path: Option<&Path>) -> Result<()> {
    let config = ConfigLoader::load(config_path)?;

    println!("configuration OK");
    println!("  homeserver:       {}", config.homeserver.base_url);
    println!("  queue policy:     {:?}", config.queue.policy);
    println!("  redactions:       {}", config.queue.redactions);
    println!("  log messages:     {}", config.queue.log_messages);
    println!(
        "  recency retention: {}",
        config
            .queue
            .recency_retention
            .map_or_else(|| "unbounded".to_string(), |n| n.to_string())
    );
    println!("  backfill limit:   {}", config.reconciler.backfill_limit);
    println!("  admins:           {}", config.admins.join(", "));

    Ok(())
}
