pub mod commands;
pub mod handlers;

use anyhow::Result;
use clap::Parser;

use commands::{CacheAction, Cli, Commands, StoreAction};
use handlers::{CacheHandler, InstallHandler, StoreHandler};

pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Install {
            production,
            frozen,
            offline,
            prefer_offline,
            registry,
            token,
            strict_peer_dependencies,
            debug,
            quiet,
        } => {
            lode_logger::init_logger(*quiet);
            InstallHandler::handle_install_all(
                *production,
                *frozen,
                *offline,
                *prefer_offline,
                registry.as_deref(),
                token.as_deref(),
                *strict_peer_dependencies,
                *debug,
            )
        }
        Commands::Cache { action } => {
            lode_logger::init_logger(false);
            match action {
                CacheAction::Clean => CacheHandler::handle_clean(),
            }
        }
        Commands::Store { action } => {
            lode_logger::init_logger(false);
            match action {
                StoreAction::List => StoreHandler::handle_list(),
            }
        }
    }
}
