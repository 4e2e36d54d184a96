mod config;
mod providers;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, ValueEnum};
use notion_gcal_core::reconcile::SyncOptions;
use notion_gcal_core::sync::SyncDriver;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::AppConfig;
use crate::providers::{GoogleCalendar, NotionClient};

#[derive(Parser)]
#[command(name = "notion-gcal-sync")]
#[command(about = "Sync a Notion task database into Google Calendar (dry-run unless --no-dry-run)")]
struct Cli {
    /// Disable dry-run and perform writes
    #[arg(long)]
    no_dry_run: bool,

    /// Process only N pages (for testing)
    #[arg(long, value_name = "N")]
    max_pages: Option<usize>,

    /// Sync a single Notion page by id instead of the whole database
    #[arg(long, value_name = "PAGE_ID", conflicts_with = "max_pages")]
    page: Option<String>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format)?;

    let dry_run = !cli.no_dry_run;
    info!("Starting Notion -> Google Calendar sync (dry-run={})", dry_run);

    let cfg = AppConfig::load()?;

    let notion = NotionClient::new(&cfg.notion_api_key);
    let calendar = GoogleCalendar::connect(&cfg.credentials_path)
        .await
        .context("Failed to connect to Google Calendar")?;

    let options = SyncOptions {
        calendar_id: cfg.calendar_id.clone(),
        timezone: cfg.timezone,
        dry_run,
    };

    let interrupted = Arc::new(AtomicBool::new(false));
    spawn_interrupt_handler(interrupted.clone());

    let driver = SyncDriver::new(&notion, &calendar, options)
        .max_records(cli.max_pages)
        .delay(cfg.request_delay)
        .interrupt_flag(interrupted);

    let anchor = Utc::now().with_timezone(&cfg.timezone).date_naive();

    if let Some(page_id) = cli.page {
        match driver.run_one(&page_id, anchor).await {
            Ok(outcome) => info!(page_id = %page_id, "Done: {:?}", outcome),
            Err(e) => error!(page_id = %page_id, "Error syncing page: {}", e),
        }
        return Ok(());
    }

    let stats = driver
        .sync_database(&cfg.notion_database_id, anchor)
        .await
        .context("Failed to query Notion database")?;

    info!(
        succeeded = stats.succeeded(),
        failed = stats.failed,
        "Done. {}",
        stats
    );

    Ok(())
}

/// Stop after the current record on Ctrl-C.
fn spawn_interrupt_handler(flag: Arc<AtomicBool>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing the current page");
            flag.store(true, Ordering::SeqCst);
        }
    });
}

fn init_logging(format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .context("Failed to initialize logging")?,
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .context("Failed to initialize logging")?,
    }

    Ok(())
}
