//! roomwarden CLI entry point.

use clap::Parser;

use roomwarden::cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run => roomwarden::cli::commands::run::execute(cli.config.as_deref()).await,
        Commands::CheckConfig => {
            roomwarden::cli::commands::check_config::execute(cli.config.as_deref())
        }
        Commands::CheckHistory(args) => {
            roomwarden::cli::commands::check_history::execute(args, cli.config.as_deref()).await
        }
    };

    if let Err(err) = result {
        roomwarden::cli::handle_error(err);
    }
}
