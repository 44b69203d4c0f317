//! The `import` subcommand: bulk-load CSV exports into SQLite.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use campaignfinance_lib::Db;
use clap::Args;

/// Arguments for the `import` subcommand.
///
/// Files are loaded in dependency order: contributors and committees
/// before the contributions that reference them.
#[derive(Args)]
pub struct ImportArgs {
    /// SQLite database path (schema is created if missing)
    #[arg(long, env = "CAMPAIGN_FINANCE_DB", default_value = "campaignfinance.db")]
    pub db: PathBuf,

    /// CSV with columns id,name,zip_code,city,state,employer,occupation
    #[arg(long)]
    pub contributors: Option<PathBuf>,

    /// CSV with columns sboe_id,committee_name,candidate_name,office,party
    #[arg(long)]
    pub committees: Option<PathBuf>,

    /// CSV with columns id,contributor_id,committee_sboe_id,amount,date_occurred,form_of_payment,purpose
    #[arg(long)]
    pub contributions: Option<PathBuf>,
}

pub fn run(args: &ImportArgs) -> Result<()> {
    if args.contributors.is_none() && args.committees.is_none() && args.contributions.is_none() {
        bail!("Nothing to import: pass --contributors, --committees and/or --contributions");
    }

    let mut db = Db::open(&args.db)?;
    db.init()?;

    if let Some(ref path) = args.contributors {
        let file = open(path)?;
        let count = db
            .import_contributors(file)
            .with_context(|| format!("importing {}", path.display()))?;
        eprintln!("Imported {} contributors", count);
    }

    if let Some(ref path) = args.committees {
        let file = open(path)?;
        let count = db
            .import_committees(file)
            .with_context(|| format!("importing {}", path.display()))?;
        eprintln!("Imported {} committees", count);
    }

    if let Some(ref path) = args.contributions {
        let file = open(path)?;
        let count = db
            .import_contributions(file)
            .with_context(|| format!("importing {}", path.display()))?;
        eprintln!("Imported {} contributions", count);
    }

    Ok(())
}

fn open(path: &Path) -> Result<File> {
    File::open(path).with_context(|| format!("opening {}", path.display()))
}
