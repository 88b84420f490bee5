//! End-to-end unification properties: transform+upsert idempotence,
//! enrichment monotonicity, and dedup convergence, against a real store.
//!
//! Requirements: Docker (for Neo4j via testcontainers)

use std::sync::atomic::AtomicBool;

use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use unileads_common::{
    CanonicalLead, Classification, ContactInfo, Content, Metadata, Platform, Profile,
    RawSourceRecord, UpsertOutcome,
};
use unileads_engine::{transform, UnifyEngine};
use unileads_graph::{GraphClient, LeadReader, LeadWriter};

async fn setup() -> (impl std::any::Any, UnifyEngine, GraphClient) {
    let (container, client) = unileads_graph::testutil::neo4j_container().await;
    let engine = UnifyEngine::new(
        LeadWriter::new(client.clone()),
        LeadReader::new(client.clone()),
    )
    .with_page_size(10);
    (container, engine, client)
}

fn no_cancel() -> AtomicBool {
    AtomicBool::new(false)
}

#[tokio::test]
async fn transform_then_upsert_twice_is_idempotent() {
    let (_container, engine, _client) = setup().await;

    let raw = json!({
        "url": "https://x.com/acme",
        "username": "acme",
        "full_name": "Acme Corp",
        "email": "press@acme.com"
    });

    let lead = transform(&raw, Platform::Twitter).accepted().unwrap();
    assert_eq!(engine.upsert(&lead).await.unwrap(), UpsertOutcome::Inserted);
    let first = engine.fetch("https://x.com/acme").await.unwrap().unwrap();

    // the adapter re-runs and re-transforms the identical payload
    let lead_again = transform(&raw, Platform::Twitter).accepted().unwrap();
    assert_eq!(
        engine.upsert(&lead_again).await.unwrap(),
        UpsertOutcome::Unchanged
    );
    let second = engine.fetch("https://x.com/acme").await.unwrap().unwrap();

    assert_eq!(first.contact, second.contact);
    assert_eq!(first.profile, second.profile);
    assert_eq!(first.classification, second.classification);
}

#[tokio::test]
async fn ingest_batch_counts_rejections_and_conflicts() {
    let (_container, engine, _client) = setup().await;

    let batch = vec![
        json!({"url": "https://www.linkedin.com/in/jane", "full_name": "Jane Smith",
               "emails": ["jane@acme.com"], "url_type": "profile"}),
        json!({"url": "https://www.linkedin.com/company/xyz", "full_name": "Sign Up",
               "url_type": "company"}),
        json!({"full_name": "No Identity"}),
    ];
    let stats = engine.ingest_batch(&batch, "linkedin").await.unwrap();
    assert_eq!(stats.inserted, 1);
    assert_eq!(stats.rejected, 2);

    // the same adapter sees the record again with one new email
    let again = vec![json!({"url": "https://www.linkedin.com/in/jane",
                            "full_name": "Jane Smith",
                            "emails": ["jane@acme.com", "jane@gmail.com"],
                            "url_type": "profile"})];
    let stats = engine.ingest_batch(&again, "linkedin").await.unwrap();
    assert_eq!(stats.updated, 1);

    let merged = engine
        .fetch("https://www.linkedin.com/in/jane")
        .await
        .unwrap()
        .unwrap();
    assert!(merged.contact.emails.contains("jane@acme.com"));
    assert!(merged.contact.emails.contains("jane@gmail.com"));

    // an unknown tag rejects the whole batch locally
    let stats = engine.ingest_batch(&batch, "myspace").await.unwrap();
    assert_eq!(stats.rejected, 3);
    assert_eq!(stats.inserted, 0);
}

#[tokio::test]
async fn enrichment_backfills_and_second_run_adds_nothing() {
    let (_container, engine, client) = setup().await;
    let writer = LeadWriter::new(client.clone());

    // canonical lead arrives from LinkedIn with no contact data
    let batch = vec![json!({"url": "https://www.linkedin.com/company/acme",
                            "full_name": "Acme Corp", "username": "acme",
                            "url_type": "company"})];
    engine.ingest_batch(&batch, "linkedin").await.unwrap();

    // an Instagram scrape of the same handle landed in its source
    // collection with business contact details
    writer
        .append_raw(&RawSourceRecord {
            id: Uuid::new_v4(),
            platform: Platform::Instagram,
            url: Some("https://www.instagram.com/acme".to_string()),
            username: Some("acme".to_string()),
            scraped_at: Utc::now(),
            payload: json!({"username": "acme",
                            "business_email": "sales@acme.com",
                            "business_phone_number": "+1 555 0100"}),
        })
        .await
        .unwrap();

    let before = engine
        .fetch("https://www.linkedin.com/company/acme")
        .await
        .unwrap()
        .unwrap();
    assert!(before.contact.emails.is_empty());

    let cancel = no_cancel();
    let stats = engine.enrich(&cancel).await.unwrap();
    assert_eq!(stats.total_leads, 1);
    assert_eq!(stats.enriched, 1);
    assert_eq!(stats.skipped, 0);

    let after = engine
        .fetch("https://www.linkedin.com/company/acme")
        .await
        .unwrap()
        .unwrap();
    assert!(after.contact.emails.contains("sales@acme.com"));
    assert!(after.contact.phone_numbers.contains("+1 555 0100"));
    // monotonic: nothing the lead already had went away
    assert!(after.contact.emails.is_superset(&before.contact.emails));

    // unchanged sources: the second sweep enriches zero leads
    let stats = engine.enrich(&cancel).await.unwrap();
    assert_eq!(stats.enriched, 0);
    let again = engine
        .fetch("https://www.linkedin.com/company/acme")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(again.contact, after.contact);
}

#[tokio::test]
async fn enrichment_skips_leads_without_join_keys() {
    let (_container, engine, client) = setup().await;
    let writer = LeadWriter::new(client.clone());

    // a keyless record can only exist through the legacy import path
    let keyless = CanonicalLead {
        id: Uuid::new_v4(),
        url: String::new(),
        platform: Platform::Web,
        content_type: None,
        profile: Profile::default(),
        contact: ContactInfo::default(),
        content: Content::default(),
        metadata: Metadata::default(),
        classification: Classification::default(),
    };
    writer.import_lead(&keyless).await.unwrap();

    let cancel = no_cancel();
    let stats = engine.enrich(&cancel).await.unwrap();
    assert_eq!(stats.total_leads, 1);
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.enriched, 0);
}

#[tokio::test]
async fn matching_sources_with_nothing_new_count_neither_way() {
    let (_container, engine, _client) = setup().await;

    let batch = vec![json!({"url": "https://x.com/acme", "username": "acme",
                            "full_name": "Acme Corp", "email": "press@acme.com"})];
    engine.ingest_batch(&batch, "twitter").await.unwrap();

    // the raw record appended at ingest matches the lead but carries the
    // same email the lead already has
    let cancel = no_cancel();
    let stats = engine.enrich(&cancel).await.unwrap();
    assert_eq!(stats.total_leads, 1);
    assert_eq!(stats.enriched, 0);
    assert_eq!(stats.skipped, 0);
}

#[tokio::test]
async fn dedupe_converges_to_the_latest_record_per_url() {
    let (_container, engine, client) = setup().await;
    let writer = LeadWriter::new(client.clone());

    let base = Utc::now();
    for (name, age_hours) in [("oldest", 72), ("middle", 36), ("newest", 1)] {
        let raw = json!({"url": "https://y.com/c", "username": "c",
                         "full_name": name});
        let mut lead = transform(&raw, Platform::Twitter).accepted().unwrap();
        lead.metadata.scraped_at = base - Duration::hours(age_hours);
        writer.import_lead(&lead).await.unwrap();
    }

    let cancel = no_cancel();
    let stats = engine.dedupe(&cancel).await.unwrap();
    assert_eq!(stats.urls_with_duplicates, 1);
    assert_eq!(stats.deleted_count, 2);

    let survivor = engine.fetch("https://y.com/c").await.unwrap().unwrap();
    assert_eq!(survivor.profile.full_name.as_deref(), Some("newest"));

    // idempotent: a second sweep finds nothing
    let stats = engine.dedupe(&cancel).await.unwrap();
    assert_eq!(stats.urls_with_duplicates, 0);
    assert_eq!(stats.deleted_count, 0);
}

#[tokio::test]
async fn cancelled_sweeps_stop_between_leads() {
    let (_container, engine, _client) = setup().await;

    let batch = vec![json!({"url": "https://x.com/acme", "username": "acme",
                            "full_name": "Acme Corp"})];
    engine.ingest_batch(&batch, "twitter").await.unwrap();

    let cancel = AtomicBool::new(true);
    let stats = engine.enrich(&cancel).await.unwrap();
    assert_eq!(stats.enriched, 0);
    assert_eq!(stats.skipped, 0);

    let stats = engine.dedupe(&cancel).await.unwrap();
    assert_eq!(stats.deleted_count, 0);
}
