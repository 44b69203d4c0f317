//! The `init` subcommand: create the database schema.

use std::path::PathBuf;

use anyhow::Result;
use campaignfinance_lib::Db;
use clap::Args;

/// Arguments for the `init` subcommand.
#[derive(Args)]
pub struct InitArgs {
    /// SQLite database path
    #[arg(long, env = "CAMPAIGN_FINANCE_DB", default_value = "campaignfinance.db")]
    pub db: PathBuf,
}

pub fn run(args: &InitArgs) -> Result<()> {
    let db = Db::open(&args.db)?;
    db.init()?;
    eprintln!("Initialized schema in {}", args.db.display());
    Ok(())
}
