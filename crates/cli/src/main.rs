//! Pizza Orders CLI - Database migrations and configuration checks.
//!
//! # Usage
//!
//! ```bash
//! # Apply pending migrations to DATABASE_URL
//! pizza-orders-cli migrate
//!
//! # Validate the server's environment without starting it
//! pizza-orders-cli config check
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `config check` - Load and validate the server configuration

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "pizza-orders-cli")]
#[command(author, version, about = "Pizza orders CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Inspect the server configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Load the configuration from the environment and report problems
    Check,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Config { action } => match action {
            ConfigAction::Check => commands::config::check()?,
        },
    }
    Ok(())
}
