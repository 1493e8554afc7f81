//! Confeitaria CLI - session table setup and catalogue tools.
//!
//! # Usage
//!
//! ```bash
//! # Create the tower-sessions table in the storefront database
//! confeitaria migrate sessions
//!
//! # Print the catalogue
//! confeitaria products list
//!
//! # Register a product (token from a storefront login)
//! confeitaria products create -n "Bolo de cenoura" -p 35,00 --token "$BAKERY_TOKEN"
//! ```
//!
//! # Commands
//!
//! - `migrate sessions` - Create the session store table
//! - `products list` - List products from the bakery API
//! - `products create` - Register a product through the bakery API

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "confeitaria")]
#[command(author, version, about = "Confeitaria CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        target: MigrateTarget,
    },
    /// Manage the product catalogue
    Products {
        #[command(subcommand)]
        action: ProductAction,
    },
}

#[derive(Subcommand)]
enum MigrateTarget {
    /// Create the session store table
    Sessions,
}

#[derive(Subcommand)]
enum ProductAction {
    /// List every product
    List,
    /// Register a new product
    Create {
        /// Product name
        #[arg(short, long)]
        name: String,

        /// Price, e.g. "12,50" or "12.50"
        #[arg(short, long)]
        price: String,

        /// Free-text description
        #[arg(short, long, default_value = "")]
        description: String,

        /// Photo URL
        #[arg(long, default_value = "")]
        photo_url: String,

        /// Bearer token of a logged-in account
        #[arg(long, env = "BAKERY_TOKEN", hide_env_values = true)]
        token: String,
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
        Commands::Migrate { target } => match target {
            MigrateTarget::Sessions => commands::migrate::sessions().await?,
        },
        Commands::Products { action } => match action {
            ProductAction::List => commands::products::list().await?,
            ProductAction::Create {
                name,
                price,
                description,
                photo_url,
                token,
            } => {
                commands::products::create(&name, &price, &description, &photo_url, token).await?;
            }
        },
    }
    Ok(())
}
