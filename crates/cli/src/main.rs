//! Souk CLI - Database migrations and catalog seeding.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! souk-cli migrate
//!
//! # Load the bundled catalog (products, cities, delivery desks)
//! souk-cli seed
//!
//! # Wipe catalog and orders, then load a custom catalog
//! souk-cli seed --file my-catalog.yaml --clear
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "souk-cli")]
#[command(author, version, about = "Souk CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Load a catalog from a YAML file
    Seed {
        /// Path to the catalog YAML file
        #[arg(short, long, default_value = "crates/cli/seed/catalog.yaml")]
        file: PathBuf,

        /// Delete orders and the existing catalog before seeding
        #[arg(long)]
        clear: bool,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::Seed { file, clear } => commands::seed::catalog(&file, clear).await?,
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_defaults() {
        let cli = Cli::try_parse_from(["souk-cli", "seed"]).unwrap();
        let Commands::Seed { file, clear } = cli.command else {
            panic!("expected seed command");
        };
        assert_eq!(file, PathBuf::from("crates/cli/seed/catalog.yaml"));
        assert!(!clear);
    }

    #[test]
    fn test_seed_clear_flag() {
        let cli =
            Cli::try_parse_from(["souk-cli", "seed", "--file", "other.yaml", "--clear"]).unwrap();
        let Commands::Seed { file, clear } = cli.command else {
            panic!("expected seed command");
        };
        assert_eq!(file, PathBuf::from("other.yaml"));
        assert!(clear);
    }

    #[test]
    fn test_migrate_takes_no_arguments() {
        assert!(Cli::try_parse_from(["souk-cli", "migrate"]).is_ok());
        assert!(Cli::try_parse_from(["souk-cli", "migrate", "admin"]).is_err());
    }
}
