mod aggregate;
mod config;
mod db;
mod detector;
mod error;
mod keys;
mod loader;
mod types;

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::db::writer::SignalWriter;
use crate::error::Result;
use crate::types::SignalType;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    let pool = sqlx::SqlitePool::connect(&format!("sqlite:{}?mode=rwc", cfg.db_path)).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database ready at {}", cfg.db_path);

    // A positional argument overrides the TENANT_ID env var.
    let cli_tenant = std::env::args().nth(1);
    let override_id = cli_tenant.as_deref().or(cfg.tenant_override.as_deref());
    let tenant_id = loader::resolve_tenant(&pool, override_id).await?;
    info!(tenant = %tenant_id, "Tenant resolved");

    // Load phase — any store error here is fatal; no partial signal runs.
    let (transactions, load_stats) = loader::load_transactions(&pool, &tenant_id).await?;
    info!(
        pages = load_stats.pages,
        fetched = load_stats.fetched,
        skipped_no_area = load_stats.skipped_no_area,
        "Loaded {} sale transactions in {} pages ({} skipped for missing area)",
        transactions.len(),
        load_stats.pages,
        load_stats.skipped_no_area,
    );

    let index = Arc::new(aggregate::build_index(&transactions));
    let window = index
        .latest_quarter
        .map(|q| format!("{} ({} to {})", q.label(), q.start(), q.end()))
        .unwrap_or_else(|| "n/a".to_string());
    info!(
        areas = index.area_count(),
        buckets = index.bucket_count(),
        latest_quarter = %window,
        "Aggregated {} buckets across {} areas (latest quarter {window})",
        index.bucket_count(),
        index.area_count(),
    );

    let signals =
        detector::run_all(Arc::clone(&index), cfg.thresholds.clone(), tenant_id.clone()).await;
    let count_of =
        |t: SignalType| signals.iter().filter(|s| s.signal_type == t).count();
    info!(
        price_change = count_of(SignalType::PriceChange),
        yield_opportunity = count_of(SignalType::YieldOpportunity),
        supply_spike = count_of(SignalType::SupplySpike),
        "Detected {} candidate signals",
        signals.len(),
    );

    let writer = SignalWriter::new(pool);
    let report = writer.write_all(&signals).await;
    info!(
        upserted = report.upserted,
        failed = report.failed,
        batches = report.batches,
        failed_batches = report.failed_batches,
        "Persistence complete: {} upserted, {} failed",
        report.upserted,
        report.failed,
    );

    // Batch failures are not fatal — idempotent keys make the next run
    // heal them — but the operator should see the stored total.
    match writer.stored_signal_count(&tenant_id).await {
        Ok(count) => info!(tenant = %tenant_id, "Signal rows stored for tenant: {count}"),
        Err(e) => warn!("Could not read stored signal count: {e}"),
    }

    Ok(())
}
