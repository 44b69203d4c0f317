mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "campaignfinance")]
#[command(about = "Read-only HTTP API over campaign finance contributions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve(commands::serve::ServeArgs),
    /// Create the database schema
    Init(commands::init::InitArgs),
    /// Load contributor, committee and contribution CSV files
    Import(commands::import::ImportArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; the environment and flags still apply.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(
                    "campaignfinance=info,campaignfinance_lib=info,campaignfinance_server=info,tower_http=info",
                )
            }),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve(args) => commands::serve::run(args).await?,
        Commands::Init(args) => commands::init::run(args)?,
        Commands::Import(args) => commands::import::run(args)?,
    }

    Ok(())
}
