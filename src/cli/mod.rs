//! Command-line interface.

pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "roomwarden", version, about = "Matrix room moderation agent")]
pub struct Cli {
    /// Path to the configuration file (default: roomwarden.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the moderation agent
    Run,

    /// Load and validate the configuration, then exit
    CheckConfig,

    /// Re-apply every filter to a room's recent history
    CheckHistory(commands::check_history::CheckHistoryArgs),
}

pub fn handle_error(err: anyhow::Error) -> ! {
    eprintln!("Error: {err:#}");
    std::process::exit(1);
}
