//! MentorLink CLI - Terminal frontend for the messaging core.
//!
//! The binary can:
//! - Run an interactive chat session against the platform
//! - Print the mentor/mentee roster for the signed-in account
//! - Show or modify the stored configuration

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

mod commands;

/// MentorLink CLI - Mentorship messaging from the terminal
#[derive(Parser)]
#[command(name = "mentorlink")]
#[command(about = "Terminal client for mentorship messaging", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session
    Chat {
        /// Configuration file path
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Show your mentor or mentee roster
    Roster,

    /// Show or modify configuration
    Config {
        /// Key to get or set
        key: Option<String>,
        /// Value to set
        value: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Chat { config } => {
            info!("Starting chat session...");
            commands::chat::execute(config).await
        }
        Commands::Roster => commands::roster::execute().await,
        Commands::Config { key, value } => commands::config::execute(key, value).await,
    }
}
