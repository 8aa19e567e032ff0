//! Avamove: move avatar objects from the legacy bucket to production.
//!
//! Configuration comes from the environment (a `.env` file is honored).
//! A run aborts when records and stores disagree, and asks for
//! confirmation before changing anything unless `--yes` is given.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use avamove_cli::{init_tracing, render_outcome, StdinConfirm};
use avamove_core::MigrationConfig;
use avamove_db::{connect_pool, PgRecordStore};
use avamove_migrate::{AutoConfirm, ConfirmGate, MigrationOrchestrator, OrchestratorConfig};
use avamove_storage::S3AvatarStore;

#[derive(Parser, Debug)]
#[command(name = "avamove")]
#[command(about = "Move avatar objects from the legacy bucket to production")]
struct Args {
    /// Report what would move without changing anything
    #[arg(short, long)]
    dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    yes: bool,

    /// Migrate at most this many records this run
    #[arg(long, value_name = "N")]
    batch_size: Option<i64>,

    /// Bound on concurrently running migrations
    #[arg(long, value_name = "N")]
    max_concurrency: Option<usize>,

    /// Output format: json or text (default: text)
    #[arg(long, default_value = "text")]
    format: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Args::parse();

    let mut config = MigrationConfig::from_env().context("Failed to load configuration")?;
    if args.batch_size.is_some() {
        config.batch_size = args.batch_size;
    }
    if let Some(max_concurrency) = args.max_concurrency {
        config.max_concurrency = max_concurrency;
    }
    config.validate().context("Invalid configuration")?;

    let pool = connect_pool(&config)
        .await
        .context("Failed to connect to the record database")?;
    let records = Arc::new(PgRecordStore::new(pool));
    let store = Arc::new(S3AvatarStore::new(&config).context("Failed to build the S3 stores")?);

    let confirm: Arc<dyn ConfirmGate> = if args.yes || args.dry_run {
        Arc::new(AutoConfirm)
    } else {
        Arc::new(StdinConfirm::new(&config.prefixes))
    };

    let orchestrator = MigrationOrchestrator::new(
        records,
        store,
        config.prefixes.clone(),
        confirm,
        OrchestratorConfig {
            batch_size: config.batch_size,
            max_concurrency: config.max_concurrency,
            wait_timeout: config.wait_timeout_secs.map(Duration::from_secs),
            dry_run: args.dry_run,
        },
    );

    let outcome = orchestrator.run().await?;

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&outcome)?),
        _ => println!("{}", render_outcome(&outcome)),
    }

    Ok(())
}
