use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use reelwatch_common::{Config, EngineConfig};
use reelwatch_ingest::maintenance::{harvest_accounts, prune_account};
use reelwatch_ingest::{
    AccountBook, DiscoveryScheduler, FetchGateway, JsonSnapshotStore, MetricsRefresher,
    SnapshotStore, ThumbnailCache,
};
use tiktok_client::TikTokClient;

#[derive(Parser)]
#[command(name = "reelwatch-ingest", about = "Short-video ingestion engine")]
struct Cli {
    /// TOML file with engine tunables (defaults apply when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Poll tracked accounts for new items until interrupted
    Run,
    /// Refresh counters for the most recent items once and print the outcome
    Refresh,
    /// Track an account whose user id is already known
    Register {
        #[arg(long)]
        handle: String,
        #[arg(long)]
        user_id: String,
    },
    /// Remove every stored item by an account
    Prune {
        #[arg(long)]
        handle: String,
    },
    /// Track every author present in the item store
    Harvest,
}

impl Command {
    fn needs_api(&self) -> bool {
        matches!(self, Command::Run | Command::Refresh)
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_tracing(cli.json_logs)?;

    let engine = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let config = Config::from_env(engine, cli.command.needs_api())?;
    config.log_redacted();

    let store = Arc::new(JsonSnapshotStore::new(&config.item_store_path));
    let book = AccountBook::new(&config.accounts_path);

    match cli.command {
        Command::Run => {
            let gateway = gateway(&config);
            let scheduler = DiscoveryScheduler::bootstrap(
                store,
                book,
                gateway,
                ThumbnailCache::new(&config.thumbnails_dir),
                config.engine.poll_interval(),
                config.engine.page_size,
            )
            .await?;

            let (tx, rx) = watch::channel(false);
            tokio::spawn(async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        info!("Shutdown requested, finishing current pass");
                        let _ = tx.send(true);
                    }
                    Err(e) => {
                        warn!(error = %e, "Could not listen for shutdown signal");
                        // Keep the sender alive so the scheduler keeps running.
                        std::future::pending::<()>().await;
                    }
                }
            });

            scheduler.run(rx).await;
        }
        Command::Refresh => {
            let refresher = MetricsRefresher::new(
                store,
                gateway(&config),
                config.engine.refresh_window,
                config.engine.refresh_batch_size,
            );
            let outcome = refresher.trigger().await;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            if !outcome.success {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Register { handle, user_id } => {
            let account = book.register(&handle, &user_id).await?;
            println!("{}", serde_json::to_string_pretty(&account)?);
        }
        Command::Prune { handle } => {
            // No index lives in this process; a running scheduler keeps the
            // pruned ids as known until it restarts and rebuilds from the store.
            let removed = prune_account(store.as_ref(), &handle).await?;
            println!("Removed {} items by {handle}", removed.len());
        }
        Command::Harvest => {
            let items = store.load().await?;
            let tracked = book.load_or_empty().await?;
            let candidates = harvest_accounts(&items, &tracked);
            let added = book.extend(candidates).await?;
            println!("Added {added} accounts");
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive("reelwatch=info".parse()?)
        .add_directive("tiktok_client=info".parse()?);

    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

fn gateway(config: &Config) -> Arc<FetchGateway> {
    let client = TikTokClient::with_hosts(
        config.rapidapi_key.clone(),
        config.posts_host.clone(),
        config.stats_host.clone(),
    );
    Arc::new(FetchGateway::new(
        Arc::new(client),
        config.engine.fetch_concurrency,
    ))
}
