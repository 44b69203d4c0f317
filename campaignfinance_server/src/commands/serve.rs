//! The `serve` subcommand: run the HTTP API.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use campaignfinance_lib::pool::{DEFAULT_POOL_SIZE, PoolConfig, SqlitePool};
use campaignfinance_server::{app, AppState, Mode};
use clap::Args;
use tracing::info;

/// Arguments for the `serve` subcommand.
#[derive(Args)]
pub struct ServeArgs {
    /// SQLite database path
    #[arg(long, env = "CAMPAIGN_FINANCE_DB", default_value = "campaignfinance.db")]
    pub db: PathBuf,

    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value = "3001")]
    pub port: u16,

    /// Maximum pooled database connections
    #[arg(long, env = "CAMPAIGN_FINANCE_POOL_SIZE", default_value_t = DEFAULT_POOL_SIZE)]
    pub pool_size: usize,

    /// How long a request waits for a free connection, in milliseconds
    #[arg(long, env = "CAMPAIGN_FINANCE_ACQUIRE_TIMEOUT_MS", default_value = "5000")]
    pub acquire_timeout_ms: u64,

    /// production hides error causes from clients; development shows them
    #[arg(long, env = "CAMPAIGN_FINANCE_ENV", value_enum, default_value_t = Mode::Production)]
    pub mode: Mode,
}

pub async fn run(args: &ServeArgs) -> Result<()> {
    if args.pool_size == 0 {
        bail!("--pool-size must be at least 1");
    }
    if !args.db.exists() {
        bail!(
            "Database not found at {}. Run `campaignfinance init` and `campaignfinance import` first.",
            args.db.display()
        );
    }

    let mut config = PoolConfig::new(&args.db);
    config.max_size = args.pool_size;
    config.acquire_timeout = Duration::from_millis(args.acquire_timeout_ms);
    config.read_only = true;
    let pool = SqlitePool::new(config)
        .with_context(|| format!("opening database {}", args.db.display()))?;

    let state = AppState::new(Arc::new(pool), args.mode);
    let router = app(state);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", args.host, args.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;

    info!(%addr, mode = %args.mode, pool_size = args.pool_size, "app listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
