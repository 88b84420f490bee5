//! Integration tests for the canonical store: upsert atomicity outcomes,
//! contact union, legacy import, and duplicate-group collapse.
//!
//! Requirements: Docker (for Neo4j via testcontainers)
//!
//! Run with: cargo test -p unileads-graph --features test-utils --test store_test

#![cfg(feature = "test-utils")]

use std::collections::BTreeSet;

use chrono::{Duration, Utc};
use uuid::Uuid;

use unileads_common::{
    CanonicalLead, Classification, ContactInfo, Content, Metadata, Platform, Profile,
    UpsertOutcome,
};
use unileads_graph::{query, GraphClient, LeadReader, LeadWriter};

async fn setup() -> (impl std::any::Any, GraphClient) {
    unileads_graph::testutil::neo4j_container().await
}

fn lead(url: &str, emails: &[&str]) -> CanonicalLead {
    let mut contact = ContactInfo::default();
    for e in emails {
        contact.add_email(*e);
    }
    CanonicalLead {
        id: Uuid::new_v4(),
        url: url.to_string(),
        platform: Platform::Twitter,
        content_type: Some("profile".to_string()),
        profile: Profile {
            username: Some("a".to_string()),
            full_name: Some("Original Name".to_string()),
            ..Default::default()
        },
        contact,
        content: Content::default(),
        metadata: Metadata {
            scraped_at: Utc::now(),
            updated_at: None,
            data_quality_score: 0.5,
        },
        classification: Classification {
            bdr: Some("AKG".to_string()),
            ..Default::default()
        },
    }
}

fn set(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|s| s.to_string()).collect()
}

async fn count_for_url(client: &GraphClient, url: &str) -> i64 {
    let q = query("MATCH (l:Lead {url: $url}) RETURN count(l) AS cnt").param("url", url);
    let mut stream = client.inner().execute(q).await.expect("count query failed");
    let row = stream.next().await.expect("stream failed").expect("no row");
    row.get("cnt").unwrap_or(0)
}

#[tokio::test]
async fn upsert_roundtrips_the_full_record() {
    let (_container, client) = setup().await;
    let writer = LeadWriter::new(client.clone());
    let reader = LeadReader::new(client.clone());

    let mut l = lead("https://x.com/acme", &["a@x.com"]);
    l.contact.add_phone("+1 555 0100");
    l.contact
        .social_handles
        .insert(Platform::Twitter, "acme".to_string());
    l.classification.industry = Some("Robotics".to_string());

    assert_eq!(
        writer.upsert_lead(&l).await.unwrap(),
        UpsertOutcome::Inserted
    );

    let got = reader.get_lead("https://x.com/acme").await.unwrap().unwrap();
    assert_eq!(got.url, l.url);
    assert_eq!(got.platform, Platform::Twitter);
    assert_eq!(got.profile.full_name.as_deref(), Some("Original Name"));
    assert_eq!(got.contact.emails, set(&["a@x.com"]));
    assert!(got.contact.phone_numbers.contains("+1 555 0100"));
    assert_eq!(
        got.contact.social_handles.get(&Platform::Twitter),
        Some(&"acme".to_string())
    );
    assert_eq!(got.classification.industry.as_deref(), Some("Robotics"));
    assert_eq!(got.classification.bdr.as_deref(), Some("AKG"));
    assert_eq!(got.metadata.updated_at, None);
}

#[tokio::test]
async fn reingesting_the_same_record_is_idempotent() {
    let (_container, client) = setup().await;
    let writer = LeadWriter::new(client.clone());
    let reader = LeadReader::new(client.clone());

    let l = lead("https://x.com/a", &["a@x.com"]);
    assert_eq!(
        writer.upsert_lead(&l).await.unwrap(),
        UpsertOutcome::Inserted
    );
    let first = reader.get_lead("https://x.com/a").await.unwrap().unwrap();

    assert_eq!(
        writer.upsert_lead(&l).await.unwrap(),
        UpsertOutcome::Unchanged
    );
    let second = reader.get_lead("https://x.com/a").await.unwrap().unwrap();

    assert_eq!(first.contact, second.contact);
    assert_eq!(first.profile, second.profile);
    assert_eq!(second.metadata.updated_at, None);
    assert_eq!(count_for_url(&client, "https://x.com/a").await, 1);
}

#[tokio::test]
async fn conflicting_upserts_union_contact_and_keep_first_profile() {
    let (_container, client) = setup().await;
    let writer = LeadWriter::new(client.clone());
    let reader = LeadReader::new(client.clone());

    let first = lead("https://x.com/a", &["a@x.com"]);
    assert_eq!(
        writer.upsert_lead(&first).await.unwrap(),
        UpsertOutcome::Inserted
    );

    let mut second = lead("https://x.com/a", &["b@x.com"]);
    second.profile.full_name = Some("Imposter Name".to_string());
    second.platform = Platform::Facebook;
    assert_eq!(
        writer.upsert_lead(&second).await.unwrap(),
        UpsertOutcome::Updated
    );

    let got = reader.get_lead("https://x.com/a").await.unwrap().unwrap();
    assert_eq!(got.contact.emails, set(&["a@x.com", "b@x.com"]));
    // first-write-wins outside contact
    assert_eq!(got.profile.full_name.as_deref(), Some("Original Name"));
    assert_eq!(got.platform, Platform::Twitter);
    assert!(got.metadata.updated_at.is_some());

    // a third pass with nothing new reports Unchanged
    let third = lead("https://x.com/a", &["b@x.com"]);
    assert_eq!(
        writer.upsert_lead(&third).await.unwrap(),
        UpsertOutcome::Unchanged
    );
    assert_eq!(count_for_url(&client, "https://x.com/a").await, 1);
}

#[tokio::test]
async fn merge_contact_values_counts_only_new_values() {
    let (_container, client) = setup().await;
    let writer = LeadWriter::new(client.clone());
    let reader = LeadReader::new(client.clone());

    writer
        .upsert_lead(&lead("https://x.com/a", &["a@x.com"]))
        .await
        .unwrap();

    let added = writer
        .merge_contact_values(
            "https://x.com/a",
            &set(&["a@x.com", "b@x.com"]),
            &set(&["+1 555 0100"]),
        )
        .await
        .unwrap();
    assert_eq!(added, 2);

    // the identical union again is a no-op
    let added = writer
        .merge_contact_values(
            "https://x.com/a",
            &set(&["a@x.com", "b@x.com"]),
            &set(&["+1 555 0100"]),
        )
        .await
        .unwrap();
    assert_eq!(added, 0);

    let got = reader.get_lead("https://x.com/a").await.unwrap().unwrap();
    assert_eq!(got.contact.emails, set(&["a@x.com", "b@x.com"]));
    assert_eq!(got.contact.phone_numbers, set(&["+1 555 0100"]));

    // unknown identity adds nothing and does not error
    let added = writer
        .merge_contact_values("https://nowhere.example", &set(&["x@x.com"]), &set(&[]))
        .await
        .unwrap();
    assert_eq!(added, 0);
}

#[tokio::test]
async fn import_bypasses_identity_and_collapse_keeps_latest() {
    let (_container, client) = setup().await;
    let writer = LeadWriter::new(client.clone());
    let reader = LeadReader::new(client.clone());

    let base = Utc::now();
    for (name, age_hours) in [("oldest", 48), ("middle", 24), ("newest", 0)] {
        let mut l = lead("https://y.com/c", &[]);
        l.profile.full_name = Some(name.to_string());
        l.metadata.scraped_at = base - Duration::hours(age_hours);
        writer.import_lead(&l).await.unwrap();
    }
    assert_eq!(count_for_url(&client, "https://y.com/c").await, 3);

    let deleted = writer.collapse_duplicates("https://y.com/c").await.unwrap();
    assert_eq!(deleted, 2);
    assert_eq!(count_for_url(&client, "https://y.com/c").await, 1);

    let survivor = reader.get_lead("https://y.com/c").await.unwrap().unwrap();
    assert_eq!(survivor.profile.full_name.as_deref(), Some("newest"));

    // collapsing a singleton group is a no-op
    assert_eq!(
        writer.collapse_duplicates("https://y.com/c").await.unwrap(),
        0
    );
}

#[tokio::test]
async fn equal_timestamps_break_ties_by_last_observed() {
    let (_container, client) = setup().await;
    let writer = LeadWriter::new(client.clone());
    let reader = LeadReader::new(client.clone());

    let ts = Utc::now();
    for name in ["first", "second", "last"] {
        let mut l = lead("https://y.com/tie", &[]);
        l.profile.full_name = Some(name.to_string());
        l.metadata.scraped_at = ts;
        writer.import_lead(&l).await.unwrap();
    }

    let deleted = writer.collapse_duplicates("https://y.com/tie").await.unwrap();
    assert_eq!(deleted, 2);
    let survivor = reader.get_lead("https://y.com/tie").await.unwrap().unwrap();
    assert_eq!(survivor.profile.full_name.as_deref(), Some("last"));
}

#[tokio::test]
async fn duplicate_urls_lists_only_real_groups() {
    let (_container, client) = setup().await;
    let writer = LeadWriter::new(client.clone());
    let reader = LeadReader::new(client.clone());

    writer
        .upsert_lead(&lead("https://x.com/solo", &[]))
        .await
        .unwrap();
    for _ in 0..2 {
        writer
            .import_lead(&lead("https://y.com/dup", &[]))
            .await
            .unwrap();
    }

    let groups = reader.duplicate_urls().await.unwrap();
    assert_eq!(groups, vec![("https://y.com/dup".to_string(), 2)]);
}
