//! Vitrina CLI - Secrets and catalog management tools.
//!
//! # Usage
//!
//! ```bash
//! # Print the hex SHA-256 digest for ADMIN_PASSWORD_HASH
//! vitrina-cli hash-password "the admin password"
//!
//! # Mint a bearer token with the configured secret (for scripts)
//! vitrina-cli mint-token
//!
//! # Write a sample catalog through the configured blob backend
//! vitrina-cli seed
//!
//! # Seed from a JSON file instead of the built-in sample
//! vitrina-cli seed -f catalog.json
//! ```
//!
//! # Commands
//!
//! - `hash-password` - Digest a password for deployment configuration
//! - `mint-token` - Sign a bearer token for scripted API calls
//! - `seed` - Persist a starter catalog

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "vitrina-cli")]
#[command(author, version, about = "Vitrina CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the hex SHA-256 digest of a password
    HashPassword {
        /// The password to digest
        password: String,
    },
    /// Mint a bearer token with the configured signing secret
    MintToken,
    /// Write a starter catalog to the configured blob backend
    Seed {
        /// JSON file with the products to seed (defaults to a built-in sample)
        #[arg(short, long)]
        file: Option<String>,
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
        Commands::HashPassword { password } => commands::secrets::hash_password(&password),
        Commands::MintToken => commands::secrets::mint_token()?,
        Commands::Seed { file } => commands::seed::catalog(file.as_deref()).await?,
    }
    Ok(())
}
