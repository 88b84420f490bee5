use std::collections::BTreeSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use neo4rs::{query, Query};
use tracing::{debug, info, warn};

use unileads_common::{CanonicalLead, Platform, RawSourceRecord, UnileadsError, UpsertOutcome};

use crate::GraphClient;

/// Attempts for a write that keeps losing the merge race before the
/// conflict is surfaced to the caller.
const WRITE_RETRIES: u32 = 3;

/// Write-side wrapper for the canonical store. Used by the unification
/// engine only; reporting tools read the store directly.
pub struct LeadWriter {
    client: GraphClient,
}

impl LeadWriter {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    /// Identity-keyed upsert, atomic per `url`.
    ///
    /// One server-side statement: MERGE on `:Lead {url}` creates the full
    /// record on first write; on identity conflict the same statement
    /// performs the contact union (set-difference append on the email and
    /// phone list properties), touching only `contact.*` and `updated_at`.
    /// Profile, content, and classification fields are first-write-wins.
    /// The statement reports whether the node was created and how many
    /// contact values were added, so callers can tell `Updated` from
    /// `Unchanged`, which a non-isolated read-modify-write could not.
    ///
    /// `url` carries no uniqueness constraint (the legacy import path must
    /// be able to land rows), so two first-writes racing on a brand-new
    /// url can each create a node. That group is exactly what the dedup
    /// sweep collapses on its next run.
    pub async fn upsert_lead(&self, lead: &CanonicalLead) -> Result<UpsertOutcome, UnileadsError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.upsert_lead_once(lead).await {
                Err(e) if e.is_retryable() && attempt < WRITE_RETRIES => {
                    warn!(url = lead.url.as_str(), attempt, "Upsert hit write race, retrying");
                    tokio::time::sleep(Duration::from_millis(50 * attempt as u64)).await;
                }
                other => return other,
            }
        }
    }

    async fn upsert_lead_once(&self, lead: &CanonicalLead) -> Result<UpsertOutcome, UnileadsError> {
        let q = query(
            "MERGE (l:Lead {url: $url})
             ON CREATE SET
                l.created_now = true,
                l.id = $id,
                l.platform = $platform,
                l.content_type = $content_type,
                l.username = $username,
                l.full_name = $full_name,
                l.bio = $bio,
                l.location = $location,
                l.job_title = $job_title,
                l.employee_count = $employee_count,
                l.emails = $emails,
                l.phone_numbers = $phone_numbers,
                l.address = $address,
                l.websites = $websites,
                l.social_handles = $social_handles,
                l.bio_links = $bio_links,
                l.caption = $caption,
                l.upload_date = $upload_date,
                l.channel_name = $channel_name,
                l.author_name = $author_name,
                l.scraped_at = datetime($scraped_at),
                l.data_quality_score = $data_quality_score,
                l.industry = $industry,
                l.revenue = $revenue,
                l.lead_category = $lead_category,
                l.lead_sub_category = $lead_sub_category,
                l.company_name = $company_name,
                l.company_type = $company_type,
                l.decision_makers = $decision_makers,
                l.bdr = $bdr,
                l.product_interests = $product_interests,
                l.timeline = $timeline,
                l.interest_level = $interest_level
             WITH l, coalesce(l.created_now, false) AS inserted,
                  size(l.emails) + size(l.phone_numbers) AS before
             SET l.emails = l.emails + [x IN $emails WHERE NOT x IN l.emails],
                 l.phone_numbers =
                     l.phone_numbers + [x IN $phone_numbers WHERE NOT x IN l.phone_numbers]
             WITH l, inserted, before,
                  size(l.emails) + size(l.phone_numbers) AS after
             SET l.updated_at = CASE WHEN NOT inserted AND after > before
                                     THEN datetime($now) ELSE l.updated_at END
             REMOVE l.created_now
             RETURN inserted, after - before AS added",
        );
        let q = lead_params(q, lead).param("now", format_datetime(&Utc::now()));

        let (inserted, added) = self
            .client
            .timed("upsert_lead", async {
                let mut stream = self.client.graph.execute(q).await?;
                let mut out = (false, 0i64);
                if let Some(row) = stream.next().await? {
                    out = (
                        row.get("inserted").unwrap_or(false),
                        row.get("added").unwrap_or(0),
                    );
                }
                while stream.next().await?.is_some() {}
                Ok(out)
            })
            .await?;

        let outcome = if inserted {
            UpsertOutcome::Inserted
        } else if added > 0 {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Unchanged
        };
        debug!(url = lead.url.as_str(), %outcome, added, "Upsert complete");
        Ok(outcome)
    }

    /// Legacy dump import: a plain append that bypasses identity checking.
    ///
    /// Kept for replaying previously exported lead dumps only; adapters
    /// must go through `upsert_lead`. Records landed here can duplicate an
    /// existing `url`; the dedup sweep is the reconciliation backstop.
    pub async fn import_lead(&self, lead: &CanonicalLead) -> Result<(), UnileadsError> {
        let q = query(
            "CREATE (l:Lead)
             SET l.id = $id,
                 l.url = $url,
                 l.platform = $platform,
                 l.content_type = $content_type,
                 l.username = $username,
                 l.full_name = $full_name,
                 l.bio = $bio,
                 l.location = $location,
                 l.job_title = $job_title,
                 l.employee_count = $employee_count,
                 l.emails = $emails,
                 l.phone_numbers = $phone_numbers,
                 l.address = $address,
                 l.websites = $websites,
                 l.social_handles = $social_handles,
                 l.bio_links = $bio_links,
                 l.caption = $caption,
                 l.upload_date = $upload_date,
                 l.channel_name = $channel_name,
                 l.author_name = $author_name,
                 l.scraped_at = datetime($scraped_at),
                 l.data_quality_score = $data_quality_score,
                 l.industry = $industry,
                 l.revenue = $revenue,
                 l.lead_category = $lead_category,
                 l.lead_sub_category = $lead_sub_category,
                 l.company_name = $company_name,
                 l.company_type = $company_type,
                 l.decision_makers = $decision_makers,
                 l.bdr = $bdr,
                 l.product_interests = $product_interests,
                 l.timeline = $timeline,
                 l.interest_level = $interest_level",
        );
        let q = lead_params(q, lead);

        self.client
            .timed("import_lead", self.client.graph.run(q))
            .await?;
        debug!(url = lead.url.as_str(), "Imported lead (identity unchecked)");
        Ok(())
    }

    /// Append a raw scrape result to its platform source collection.
    /// Source collections are append-only from the engine's point of view;
    /// nothing mutates them after this.
    pub async fn append_raw(&self, rec: &RawSourceRecord) -> Result<(), UnileadsError> {
        let cypher = format!(
            "CREATE (r:RawRecord:{label} {{
                id: $id,
                platform: $platform,
                url: $url,
                username: $username,
                scraped_at: datetime($scraped_at),
                payload: $payload
            }})",
            label = raw_label(rec.platform),
        );
        let q = query(&cypher)
            .param("id", rec.id.to_string())
            .param("platform", rec.platform.to_string())
            .param("url", rec.url.clone().unwrap_or_default())
            .param("username", rec.username.clone().unwrap_or_default())
            .param("scraped_at", format_datetime(&rec.scraped_at))
            .param("payload", rec.payload.to_string());

        self.client
            .timed("append_raw", self.client.graph.run(q))
            .await?;
        Ok(())
    }

    /// Atomic contact backfill for the enrichment sweep: union the given
    /// values into the lead's contact sets in one conditional statement.
    /// Returns how many values were actually new; `updated_at` moves only
    /// when something was. A no-op union writes nothing.
    pub async fn merge_contact_values(
        &self,
        url: &str,
        emails: &BTreeSet<String>,
        phone_numbers: &BTreeSet<String>,
    ) -> Result<u64, UnileadsError> {
        let q = query(
            "MATCH (l:Lead {url: $url})
             WITH l, size(l.emails) + size(l.phone_numbers) AS before
             SET l.emails = l.emails + [x IN $emails WHERE NOT x IN l.emails],
                 l.phone_numbers =
                     l.phone_numbers + [x IN $phone_numbers WHERE NOT x IN l.phone_numbers]
             WITH l, before, size(l.emails) + size(l.phone_numbers) AS after
             SET l.updated_at = CASE WHEN after > before
                                     THEN datetime($now) ELSE l.updated_at END
             RETURN after - before AS added",
        )
        .param("url", url)
        .param("emails", set_to_vec(emails))
        .param("phone_numbers", set_to_vec(phone_numbers))
        .param("now", format_datetime(&Utc::now()));

        let added = self
            .client
            .timed("merge_contact_values", async {
                let mut stream = self.client.graph.execute(q).await?;
                let mut added = 0i64;
                if let Some(row) = stream.next().await? {
                    added = row.get("added").unwrap_or(0);
                }
                while stream.next().await?.is_some() {}
                Ok(added)
            })
            .await?;
        Ok(added.max(0) as u64)
    }

    /// Collapse one duplicate group: keep the member with the most recent
    /// scrape timestamp (ties broken by last-observed order) and delete the
    /// rest. One atomic statement per url: the dedup sweep never holds a
    /// global lock.
    pub async fn collapse_duplicates(&self, url: &str) -> Result<u64, UnileadsError> {
        let q = query(
            "MATCH (l:Lead {url: $url})
             WITH l ORDER BY l.scraped_at ASC, id(l) ASC
             WITH collect(l) AS leads
             WHERE size(leads) > 1
             UNWIND leads[0..size(leads)-1] AS doomed
             DETACH DELETE doomed
             RETURN count(doomed) AS deleted",
        )
        .param("url", url);

        let deleted = self
            .client
            .timed("collapse_duplicates", async {
                let mut stream = self.client.graph.execute(q).await?;
                let mut deleted = 0i64;
                if let Some(row) = stream.next().await? {
                    deleted = row.get("deleted").unwrap_or(0);
                }
                while stream.next().await?.is_some() {}
                Ok(deleted)
            })
            .await?;

        if deleted > 0 {
            info!(url, deleted, "Collapsed duplicate lead group");
        }
        Ok(deleted.max(0) as u64)
    }
}

/// Node label for a platform's raw source collection.
pub fn raw_label(platform: Platform) -> &'static str {
    match platform {
        Platform::Web => "WebRaw",
        Platform::Instagram => "InstagramRaw",
        Platform::Linkedin => "LinkedinRaw",
        Platform::Youtube => "YoutubeRaw",
        Platform::Facebook => "FacebookRaw",
        Platform::Twitter => "TwitterRaw",
    }
}

/// Bind every CanonicalLead field. Optional strings flatten to empty
/// strings (the reader maps those back to None); set fields become list
/// parameters; the social handle map is stored as a JSON string property.
fn lead_params(q: Query, lead: &CanonicalLead) -> Query {
    q.param("id", lead.id.to_string())
        .param("url", lead.url.as_str())
        .param("platform", lead.platform.to_string())
        .param("content_type", lead.content_type.clone().unwrap_or_default())
        .param("username", lead.profile.username.clone().unwrap_or_default())
        .param("full_name", lead.profile.full_name.clone().unwrap_or_default())
        .param("bio", lead.profile.bio.clone().unwrap_or_default())
        .param("location", lead.profile.location.clone().unwrap_or_default())
        .param("job_title", lead.profile.job_title.clone().unwrap_or_default())
        .param(
            "employee_count",
            lead.profile.employee_count.clone().unwrap_or_default(),
        )
        .param("emails", set_to_vec(&lead.contact.emails))
        .param("phone_numbers", set_to_vec(&lead.contact.phone_numbers))
        .param("address", lead.contact.address.clone().unwrap_or_default())
        .param("websites", set_to_vec(&lead.contact.websites))
        .param(
            "social_handles",
            serde_json::to_string(&lead.contact.social_handles).unwrap_or_default(),
        )
        .param("bio_links", set_to_vec(&lead.contact.bio_links))
        .param("caption", lead.content.caption.clone().unwrap_or_default())
        .param(
            "upload_date",
            lead.content.upload_date.clone().unwrap_or_default(),
        )
        .param(
            "channel_name",
            lead.content.channel_name.clone().unwrap_or_default(),
        )
        .param(
            "author_name",
            lead.content.author_name.clone().unwrap_or_default(),
        )
        .param("scraped_at", format_datetime(&lead.metadata.scraped_at))
        .param("data_quality_score", lead.metadata.data_quality_score)
        .param("industry", lead.classification.industry.clone().unwrap_or_default())
        .param("revenue", lead.classification.revenue.clone().unwrap_or_default())
        .param(
            "lead_category",
            lead.classification.lead_category.clone().unwrap_or_default(),
        )
        .param(
            "lead_sub_category",
            lead.classification.lead_sub_category.clone().unwrap_or_default(),
        )
        .param(
            "company_name",
            lead.classification.company_name.clone().unwrap_or_default(),
        )
        .param(
            "company_type",
            lead.classification.company_type.clone().unwrap_or_default(),
        )
        .param(
            "decision_makers",
            lead.classification.decision_makers.clone().unwrap_or_default(),
        )
        .param("bdr", lead.classification.bdr.clone().unwrap_or_default())
        .param(
            "product_interests",
            lead.classification.product_interests.clone().unwrap_or_default(),
        )
        .param("timeline", lead.classification.timeline.clone().unwrap_or_default())
        .param(
            "interest_level",
            lead.classification.interest_level.clone().unwrap_or_default(),
        )
}

fn set_to_vec(set: &BTreeSet<String>) -> Vec<String> {
    set.iter().cloned().collect()
}

pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}
