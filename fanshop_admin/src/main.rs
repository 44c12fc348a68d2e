//! Database maintenance for the Fanshop back office.
//!
//! Usage:
//! ```bash
//! # Apply pending schema migrations
//! fanshop-admin migrate
//!
//! # List pending migrations without applying them
//! fanshop-admin migrate --dry-run
//!
//! # Re-check every stored Graph API token
//! fanshop-admin check-tokens
//!
//! # Point every reference to one ad group at another
//! fanshop-admin remap-ad-group --from 12345 --to 67890
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use fanshop_api::{config::Config, init_logging, services::tokens};
use fanshop_facebook::GraphClient;
use fanshop_persist::migrations::{remap_ad_group_id, MigrationRunner};
use fanshop_persist::MongoPersistence;

#[derive(Parser)]
#[command(
    name = "fanshop-admin",
    about = "Fanshop back office maintenance",
    long_about = "Schema migrations, token checks and ad group remapping against the Fanshop MongoDB database"
)]
struct AdminArgs {
    /// Database name override
    #[arg(long)]
    database: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply pending schema migrations in version order
    Migrate {
        /// Only list what would run
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate every stored API token and record the result
    CheckTokens,
    /// Rewrite ad group references on messages, conversations, orders and costs
    RemapAdGroup {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = AdminArgs::parse();

    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(database) = args.database {
        config.mongodb.database = database;
    }
    init_logging(&config);

    let persist = MongoPersistence::connect(&config.mongodb_uri, &config.mongodb.database)
        .await
        .context("Failed to connect to MongoDB")?;

    match args.command {
        Command::Migrate { dry_run } => migrate(&persist, dry_run).await,
        Command::CheckTokens => check_tokens(&persist, &config).await,
        Command::RemapAdGroup { from, to } => remap(&persist, &from, &to).await,
    }
}

async fn migrate(persist: &MongoPersistence, dry_run: bool) -> Result<()> {
    let runner = MigrationRunner::new(persist.database().clone())?;

    if dry_run {
        let pending = runner.pending().await?;
        if pending.is_empty() {
            println!("Schema is up to date");
        }
        for (version, name) in pending {
            println!("pending  {:>3}  {}", version, name);
        }
        return Ok(());
    }

    let applied = runner.run().await?;
    info!(applied = ?applied, "Migration run finished");
    println!("Applied {} migration(s)", applied.len());
    Ok(())
}

async fn check_tokens(persist: &MongoPersistence, config: &Config) -> Result<()> {
    let graph = GraphClient::new(&config.facebook)?;
    let checked = tokens::check_all(persist, &graph)
        .await
        .map_err(|e| anyhow::anyhow!("Token check failed: {}", e))?;

    for token in &checked {
        println!(
            "{:<24} {:<8} {}",
            token.name,
            token.status.as_str(),
            token.status_message.as_deref().unwrap_or("")
        );
    }
    info!(checked = checked.len(), "Token check finished");
    Ok(())
}

async fn remap(persist: &MongoPersistence, from: &str, to: &str) -> Result<()> {
    let report = remap_ad_group_id(persist.database(), from, to).await?;
    println!(
        "Remapped {} -> {}: {} messages, {} conversations, {} orders, {} costs",
        from, to, report.messages, report.conversations, report.orders, report.costs
    );
    if report.total() == 0 {
        println!("Nothing referenced {}", from);
    }
    Ok(())
}
