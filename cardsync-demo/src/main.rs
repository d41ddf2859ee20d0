//! cardsync host application.
//!
//! Loads a card into the in-memory engine, attaches a bridge to a local
//! cell and drives changes from both sides.

#![allow(clippy::print_stdout, reason = "CLI tool outputs to stdout")]

use anyhow::Result;
use clap::Parser;
use tracing::debug;

use cardsync_core::modules::logger;
use cardsync_core::CardLoader;

mod cli;
mod commands;
mod scenarios;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init_logging(&cli.log_level)?;

    let config = commands::resolve_config(&cli)?;
    let loader = CardLoader::new(&cli.cards_dir);
    debug!(?config, cards_dir = %loader.cards_dir().display(), "Configuration resolved");

    match cli.command {
        Commands::Run { card, toggles } => {
            commands::handle_run(config, &loader, &card, toggles).await
        },
        Commands::Scenario { name } => scenarios::handle_scenario(config, &loader, &name).await,
        Commands::Status { json, save } => {
            commands::handle_status(&config, &loader, json, save)
        },
    }
}
