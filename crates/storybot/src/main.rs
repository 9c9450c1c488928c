// SPDX-FileCopyrightText: 2026 Storybot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storybot - fetches Telegram stories on request and uploads them to the chat.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Storybot - fetches Telegram stories on request.
#[derive(Parser, Debug)]
#[command(name = "storybot", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Commands {
    /// Run the bot (default).
    Serve,
    /// Validate the configuration and exit.
    CheckConfig,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => storybot_config::load_and_validate_path(path),
        None => storybot_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            storybot_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("storybot: {e}");
                std::process::exit(1);
            }
        }
        Commands::CheckConfig => {
            println!(
                "storybot: config is valid (environment={}, admin_chat_id={})",
                config.bot.environment, config.telegram.admin_chat_id
            );
        }
    }
}
