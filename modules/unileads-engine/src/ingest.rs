//! The one ingestion entry point adapters call.
//!
//! Every payload goes transform -> identity-aware upsert; there is no
//! direct-insert path here. The engine receives its store handles at
//! construction, with no process-wide manager singleton.

use std::sync::atomic::AtomicBool;

use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use unileads_common::{CanonicalLead, Platform, RawSourceRecord, UnileadsError, UpsertOutcome};
use unileads_graph::{LeadReader, LeadWriter};

use crate::dedupe::{self, DedupeStats};
use crate::enrich::{self, join_keys, EnrichmentStats};
use crate::normalizer::{transform, Transformed};

/// Default page size for the full-store sweeps.
const DEFAULT_PAGE_SIZE: u64 = 200;

/// Per-batch ingest counters. Rejections are expected, local conditions;
/// store failures abort the batch instead of being counted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestStats {
    pub inserted: u64,
    pub updated: u64,
    pub unchanged: u64,
    pub rejected: u64,
}

/// The unification engine. Construction-time dependency injection of the
/// store handles; one instance can serve many adapters concurrently,
/// since upserts are atomic per identity at the store.
pub struct UnifyEngine {
    writer: LeadWriter,
    reader: LeadReader,
    page_size: u64,
}

impl UnifyEngine {
    pub fn new(writer: LeadWriter, reader: LeadReader) -> Self {
        Self {
            writer,
            reader,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Identity-keyed upsert of an already-normalized lead.
    pub async fn upsert(&self, lead: &CanonicalLead) -> Result<UpsertOutcome, UnileadsError> {
        self.writer.upsert_lead(lead).await
    }

    /// The merged canonical record for a url: what adapters read back
    /// after a conflict for their own downstream use.
    pub async fn fetch(&self, url: &str) -> Result<Option<CanonicalLead>, UnileadsError> {
        self.reader.get_lead(url).await
    }

    /// Transform and upsert a batch of raw payloads from one adapter, and
    /// append each payload to its platform source collection for later
    /// enrichment. An unknown platform tag rejects the whole batch
    /// locally, as typed counters rather than an error.
    pub async fn ingest_batch(
        &self,
        payloads: &[Value],
        platform_tag: &str,
    ) -> Result<IngestStats, UnileadsError> {
        let mut stats = IngestStats::default();

        let Some(platform) = Platform::from_tag(platform_tag) else {
            warn!(tag = platform_tag, "Unknown platform tag, batch rejected");
            stats.rejected = payloads.len() as u64;
            return Ok(stats);
        };

        for payload in payloads {
            match transform(payload, platform) {
                Transformed::Rejected(reason) => {
                    debug!(%platform, %reason, "Payload rejected");
                    stats.rejected += 1;
                }
                Transformed::Accepted(lead) => {
                    let (url, username) = join_keys(platform, payload);
                    self.writer
                        .append_raw(&RawSourceRecord {
                            id: Uuid::new_v4(),
                            platform,
                            url,
                            username,
                            scraped_at: lead.metadata.scraped_at,
                            payload: payload.clone(),
                        })
                        .await?;

                    match self.writer.upsert_lead(&lead).await? {
                        UpsertOutcome::Inserted => stats.inserted += 1,
                        UpsertOutcome::Updated => stats.updated += 1,
                        UpsertOutcome::Unchanged => stats.unchanged += 1,
                    }
                }
            }
        }

        info!(%platform, ?stats, "Ingest batch complete");
        Ok(stats)
    }

    /// Run the enrichment sweep over the whole store.
    pub async fn enrich(&self, cancel: &AtomicBool) -> Result<EnrichmentStats, UnileadsError> {
        enrich::enrich(&self.reader, &self.writer, cancel, self.page_size).await
    }

    /// Run the dedup sweep over the whole store.
    pub async fn dedupe(&self, cancel: &AtomicBool) -> Result<DedupeStats, UnileadsError> {
        dedupe::dedupe(&self.reader, &self.writer, cancel).await
    }
}
