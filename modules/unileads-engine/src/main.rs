use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use unileads_common::Config;
use unileads_engine::UnifyEngine;
use unileads_graph::{migrate::migrate, GraphClient, LeadReader, LeadWriter};

/// Reconciliation driver: migrate the schema, then run the enrichment and
/// dedup sweeps once. Meant to be invoked periodically by a scheduler;
/// both sweeps are idempotent and re-entrant.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("unileads=info".parse()?))
        .init();

    info!("Unileads reconciliation starting...");

    let config = Config::from_env();
    config.log_redacted();

    let client = GraphClient::connect_with_timeout(
        &config.neo4j_uri,
        &config.neo4j_user,
        &config.neo4j_password,
        Duration::from_secs(config.store_timeout_secs),
    )
    .await?;

    migrate(&client).await?;

    let reader = LeadReader::new(client.clone());
    let counts = reader.counts().await?;
    info!(?counts, "Store state before sweeps");

    let engine = UnifyEngine::new(LeadWriter::new(client.clone()), reader)
        .with_page_size(config.sweep_page_size);

    // Sweeps check this between leads; per-lead writes are atomic, so a
    // mid-sweep stop leaves no partially-written record.
    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Shutdown requested, stopping after the current lead");
                cancel.store(true, Ordering::Relaxed);
            }
        });
    }

    let enrich_stats = engine.enrich(&cancel).await?;
    info!(
        total = enrich_stats.total_leads,
        enriched = enrich_stats.enriched,
        skipped = enrich_stats.skipped,
        "Enrichment sweep finished"
    );

    let dedupe_stats = engine.dedupe(&cancel).await?;
    info!(
        urls_with_duplicates = dedupe_stats.urls_with_duplicates,
        deleted = dedupe_stats.deleted_count,
        "Dedup sweep finished"
    );

    Ok(())
}
