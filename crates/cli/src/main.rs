//! Command Line Interface for the trade history sync.
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dotenv::dotenv;
use prettytable::{Table, row};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;
use trade_history_data::providers::{DEFAULT_BASE_URL, KrakenClient, KrakenConfig, MAX_PAGE_SIZE};
use trade_history_data::{Database, TableStats};
use trade_history_domain::{RateLimitTier, TableName};
use trade_history_engine::prelude::*;

#[derive(Parser)]
#[command(name = "trade-history")]
#[command(about = "Sync Kraken public trade history into TimescaleDB", long_about = None)]
struct Cli {
    #[command(flatten)]
    kraken: KrakenArgs,

    #[command(flatten)]
    db: DbArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every trade newer than the last stored one
    Sync {
        /// Start without waiting for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Show what is stored for the pair
    Status,
}

#[derive(Args)]
struct KrakenArgs {
    /// Pair id or alternate name (e.g., XBTUSD)
    #[arg(short, long, env = "KRAKEN_PAIR")]
    pair: String,

    /// Account tier used to pace calls (starter, intermediate, pro)
    #[arg(long, env = "KRAKEN_TIER", default_value_t = RateLimitTier::Starter)]
    tier: RateLimitTier,

    /// Explicit pacing between calls, in milliseconds
    #[arg(long, env = "KRAKEN_PACING_MS")]
    pacing_ms: Option<u64>,

    /// Records requested per page
    #[arg(long, env = "KRAKEN_PAGE_SIZE", default_value_t = MAX_PAGE_SIZE)]
    page_size: usize,

    /// Base URL of the REST API
    #[arg(long, env = "KRAKEN_API_URL", default_value = DEFAULT_BASE_URL)]
    api_url: String,

    /// Retries for transient failures
    #[arg(long, default_value_t = 5)]
    max_retries: u32,
}

impl KrakenArgs {
    fn client_config(&self) -> KrakenConfig {
        KrakenConfig {
            base_url: self.api_url.clone(),
            page_size: self.page_size,
            ..Default::default()
        }
    }

    fn sync_config(&self) -> SyncConfig {
        let mut config = SyncConfig::new(&self.pair)
            .with_tier(self.tier)
            .with_retry(RetryPolicy {
                max_retries: self.max_retries,
                ..Default::default()
            });
        if let Some(ms) = self.pacing_ms {
            config = config.with_pacing(Duration::from_millis(ms));
        }
        config
    }
}

#[derive(Args)]
struct DbArgs {
    /// Full connection string; overrides the individual parts
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[arg(long, env = "PGUSER")]
    db_user: Option<String>,

    #[arg(long, env = "PGPASSWORD", hide_env_values = true)]
    db_password: Option<String>,

    #[arg(long, env = "PGHOST", default_value = "localhost")]
    db_host: String,

    #[arg(long, env = "PGPORT", default_value_t = 5432)]
    db_port: u16,

    /// Database name, defaults to the lower-cased pair
    #[arg(long, env = "PGDATABASE")]
    db_name: Option<String>,
}

impl DbArgs {
    fn settings(&self) -> DatabaseSettings {
        DatabaseSettings {
            url: self.database_url.clone(),
            user: self.db_user.clone(),
            password: self.db_password.clone(),
            host: self.db_host.clone(),
            port: self.db_port,
            database: self.db_name.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let client =
        KrakenClient::new(cli.kraken.client_config()).context("Invalid Kraken configuration")?;
    let options = cli
        .db
        .settings()
        .connect_options(&cli.kraken.pair)
        .context("Invalid database configuration")?;
    let database = Database::connect_with(options)
        .await
        .context("Failed to connect to the database")?;
    info!(pair = %cli.kraken.pair, tier = %cli.kraken.tier, "Connected to database");

    match &cli.command {
        Commands::Sync { yes } => sync(&cli.kraken, client, &database, *yes).await,
        Commands::Status => status(&cli.kraken.pair, &client, &database).await,
    }
}

async fn sync(args: &KrakenArgs, client: KrakenClient, database: &Database, yes: bool) -> Result<()> {
    let engine = SyncEngine::new(args.sync_config(), client.clone(), client, database.trades());

    println!("📡 Resolving {}...", args.pair);
    let plan = engine.prepare().await.context("Failed to prepare sync")?;
    if plan.schema == SchemaStatus::Created {
        println!("🆕 Created table {}", plan.table);
    }

    let estimate = engine
        .estimate(&plan)
        .await
        .context("Failed to estimate backlog")?;
    println!(
        "🔍 {} ({}) from trade {}: {estimate}",
        plan.pair.display_name(),
        plan.pair.id,
        plan.cursor
    );

    if !yes {
        confirm().await?;
    }

    let report = engine
        .sync(&plan)
        .await
        .with_context(|| format!("Sync of {} failed", plan.pair.id))?;

    println!("✅ Trades database is up to date");
    let mut table = Table::new();
    table.add_row(row!["Run", report.run_id]);
    table.add_row(row!["Pair", report.pair]);
    table.add_row(row!["Table", report.table]);
    table.add_row(row!["Cursor", format!("{} -> {}", report.starting_cursor, report.final_cursor)]);
    table.add_row(row!["Pages", report.pages]);
    table.add_row(row!["Fetched", report.records_fetched]);
    table.add_row(row!["Written", report.rows_written]);
    table.add_row(row!["Skipped", report.records_skipped]);
    table.add_row(row!["High-water", optional(report.high_water)]);
    table.add_row(row!["Elapsed", format!("{:.1}s", report.elapsed.as_secs_f64())]);
    table.printstd();
    Ok(())
}

async fn status(symbol: &str, client: &KrakenClient, database: &Database) -> Result<()> {
    let pair = client
        .resolve(symbol)
        .await
        .with_context(|| format!("Failed to resolve {symbol}"))?;
    let name = TableName::for_pair(&pair)?;
    let repository = database.trades();

    let mut table = Table::new();
    table.add_row(row!["Pair", format!("{} ({})", pair.display_name(), pair.id)]);
    table.add_row(row!["Table", name]);

    let exists = repository
        .table_exists(&name)
        .await
        .context("Failed to inspect schema")?;
    if exists {
        let stats = repository
            .stats(&name)
            .await
            .context("Failed to read table stats")?;
        add_stats(&mut table, &stats);
    } else {
        table.add_row(row!["Rows", "table not created yet"]);
    }
    table.printstd();
    Ok(())
}

fn add_stats(table: &mut Table, stats: &TableStats) {
    let latest = stats.latest_time_ns.map(|ns| {
        chrono::DateTime::from_timestamp_nanos(ns)
            .format("%Y-%m-%d %H:%M:%S%.6f UTC")
            .to_string()
    });
    table.add_row(row!["Rows", stats.row_count]);
    table.add_row(row!["Max trade id", optional(stats.max_trade_id)]);
    table.add_row(row!["Latest trade", latest.unwrap_or_else(|| "-".to_string())]);
}

fn optional(value: Option<i64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

async fn confirm() -> Result<()> {
    println!("Press Enter to start, Ctrl+C to abort");
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("Failed to read confirmation")?;
    Ok(())
}
