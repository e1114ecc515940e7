mod ops;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "scoreline-cli")]
#[command(about = "Scoreline news pipeline operator commands")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Run the source-fetch and scheduled-query ticks once and wait for the
    /// resulting jobs to finish
    Tick,
    /// Queue a manual fetch for one source and wait for it to finish
    Fetch {
        #[arg(long)]
        source: Uuid,
    },
    /// Fold duplicate news items sharing a content fingerprint
    Merge {
        #[arg(long)]
        org: Uuid,
        /// Report what would be merged without writing
        #[arg(long)]
        dry_run: bool,
    },
    /// Recompute one item's importance score
    Rescore {
        #[arg(long)]
        item: Uuid,
        #[arg(long)]
        org: Uuid,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("scoreline-cli: no command given; see --help");
        return Ok(());
    };

    let config = scoreline_core::load_app_config()?;
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let pool = scoreline_db::connect_pool(
        &config.database_url,
        scoreline_db::PoolConfig::from_app_config(&config),
    )
    .await?;

    match command {
        Commands::Migrate => {
            let applied = scoreline_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
        Commands::Tick => {
            let runtime = ops::Runtime::start(&config, pool)?;
            ops::run_tick(&runtime).await?;
        }
        Commands::Fetch { source } => {
            let runtime = ops::Runtime::start(&config, pool)?;
            ops::run_fetch(&runtime, source).await?;
        }
        Commands::Merge { org, dry_run } => {
            let runtime = ops::Runtime::start(&config, pool)?;
            ops::run_merge(&runtime, org, dry_run).await?;
        }
        Commands::Rescore { item, org } => {
            let runtime = ops::Runtime::start(&config, pool)?;
            ops::run_rescore(&runtime, item, org).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests;
