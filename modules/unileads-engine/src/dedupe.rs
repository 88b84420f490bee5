//! Dedup sweep: collapse duplicate canonical identities.
//!
//! Exists because the legacy dump import bypasses identity checking; the
//! sweep is the reconciliation backstop. Each duplicate group is collapsed
//! in its own atomic statement: the member with the most recent scrape
//! timestamp survives (ties broken by last-observed order). A write
//! landing mid-sweep may leave one extra duplicate; the next run catches
//! it rather than correcting synchronously.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

use unileads_common::UnileadsError;
use unileads_graph::{LeadReader, LeadWriter};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DedupeStats {
    pub urls_with_duplicates: u64,
    pub deleted_count: u64,
}

pub async fn dedupe(
    reader: &LeadReader,
    writer: &LeadWriter,
    cancel: &AtomicBool,
) -> Result<DedupeStats, UnileadsError> {
    let groups = reader.duplicate_urls().await?;
    info!(groups = groups.len(), "Found duplicate lead groups");

    let mut stats = DedupeStats::default();
    for (url, _count) in &groups {
        if cancel.load(Ordering::Relaxed) {
            info!(collapsed = stats.urls_with_duplicates, "Dedup sweep cancelled");
            break;
        }
        match writer.collapse_duplicates(url).await {
            Ok(deleted) if deleted > 0 => {
                stats.urls_with_duplicates += 1;
                stats.deleted_count += deleted;
            }
            Ok(_) => {}
            Err(e) => warn!(url = url.as_str(), "Group collapse failed, continuing: {e}"),
        }
    }

    info!(?stats, "Dedup sweep complete");
    Ok(stats)
}
