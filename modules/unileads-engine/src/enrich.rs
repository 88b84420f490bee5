//! Enrichment sweep: cross-reference canonical leads against the raw
//! source collections and backfill missing contact values.
//!
//! The sweep is a full-store scan with one independently-atomic write per
//! lead; it never holds a global lock, checks the cancellation flag
//! between leads, and a single lead's failure is logged and skipped, not
//! fatal. Running it twice over unchanged sources enriches zero leads on
//! the second pass.

use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;
use tracing::{info, warn};

use unileads_common::{ContactInfo, Platform, UnileadsError};
use unileads_graph::{LeadKey, LeadReader, LeadWriter};

use crate::extract::{collect_strings, string_at};
use crate::merge;

/// Where each platform's source collection keeps its contact values and
/// join keys. Field names are platform-native; values may arrive as
/// scalars or lists, both are accepted.
pub struct SourceFields {
    pub email: &'static str,
    pub phone: &'static str,
    pub url: &'static str,
    pub username: Option<&'static str>,
}

pub fn source_fields(platform: Platform) -> &'static SourceFields {
    match platform {
        Platform::Instagram => &SourceFields {
            email: "business_email",
            phone: "business_phone_number",
            url: "url",
            username: Some("username"),
        },
        Platform::Linkedin => &SourceFields {
            email: "emails",
            phone: "phone_numbers",
            url: "url",
            username: Some("username"),
        },
        Platform::Web => &SourceFields {
            email: "email",
            phone: "phone",
            url: "source_url",
            username: None,
        },
        Platform::Youtube => &SourceFields {
            email: "email",
            phone: "phone_numbers",
            url: "url",
            username: Some("channel_name"),
        },
        Platform::Facebook => &SourceFields {
            email: "emails",
            phone: "phone_numbers",
            url: "url",
            username: Some("username"),
        },
        Platform::Twitter => &SourceFields {
            email: "email",
            phone: "phone",
            url: "url",
            username: Some("username"),
        },
    }
}

/// Lift a raw payload's join keys using its platform's native field names.
/// Used when appending to a source collection so later sweeps can join on
/// uniform record properties.
pub fn join_keys(platform: Platform, payload: &Value) -> (Option<String>, Option<String>) {
    let fields = source_fields(platform);
    let url = string_at(payload, &[fields.url]);
    let username = fields.username.and_then(|f| string_at(payload, &[f]));
    (url, username)
}

/// Stats from a full enrichment run. `enriched` counts only leads whose
/// contact set actually grew; a lead that matched sources but gained
/// nothing is neither skipped nor enriched.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EnrichmentStats {
    pub total_leads: u64,
    pub enriched: u64,
    pub skipped: u64,
}

pub async fn enrich(
    reader: &LeadReader,
    writer: &LeadWriter,
    cancel: &AtomicBool,
    page_size: u64,
) -> Result<EnrichmentStats, UnileadsError> {
    let mut stats = EnrichmentStats {
        total_leads: reader.count_leads().await?,
        ..Default::default()
    };

    let mut skip = 0u64;
    'sweep: loop {
        let page = reader.lead_keys(skip, page_size).await?;
        if page.is_empty() {
            break;
        }
        skip += page.len() as u64;

        for lead in &page {
            if cancel.load(Ordering::Relaxed) {
                info!(processed = skip, "Enrichment sweep cancelled");
                break 'sweep;
            }
            if lead.url.is_empty() && lead.username.is_none() {
                warn!("Lead skipped: no url or username to join on");
                stats.skipped += 1;
                continue;
            }
            match enrich_one(reader, writer, lead).await {
                Ok(true) => stats.enriched += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(url = lead.url.as_str(), "Lead enrichment failed, continuing: {e}")
                }
            }
        }
    }

    info!(?stats, "Enrichment sweep complete");
    Ok(stats)
}

/// Gather contact values for one lead from every source collection and
/// apply them through the atomic contact-union write. Returns whether the
/// lead's contact set actually grew.
async fn enrich_one(
    reader: &LeadReader,
    writer: &LeadWriter,
    lead: &LeadKey,
) -> Result<bool, UnileadsError> {
    let mut incoming = ContactInfo::default();

    for platform in Platform::ALL {
        let fields = source_fields(platform);
        let payloads = reader
            .raw_payloads_for(
                platform,
                (!lead.url.is_empty()).then_some(lead.url.as_str()),
                lead.username.as_deref(),
            )
            .await?;
        for payload in &payloads {
            for email in collect_strings(payload, &[fields.email]) {
                incoming.add_email(email);
            }
            for phone in collect_strings(payload, &[fields.phone]) {
                incoming.add_phone(phone);
            }
        }
    }

    // Detect the no-op union in memory before touching the store.
    let current = ContactInfo {
        emails: lead.emails.clone(),
        phone_numbers: lead.phone_numbers.clone(),
        ..Default::default()
    };
    if merge::merge(&current, &incoming).added() == 0 {
        return Ok(false);
    }

    let added = writer
        .merge_contact_values(&lead.url, &incoming.emails, &incoming.phone_numbers)
        .await?;
    Ok(added > 0)
}
