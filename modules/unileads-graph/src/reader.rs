use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDateTime, Utc};
use neo4rs::query;
use tracing::warn;
use uuid::Uuid;

use unileads_common::{
    CanonicalLead, Classification, ContactInfo, Content, Metadata, Platform, Profile,
    UnileadsError,
};

use crate::writer::raw_label;
use crate::GraphClient;

/// Read-side wrapper for the canonical store and the raw source
/// collections. The sweeps and the ingestion entry point read through this;
/// reporting tools query the store directly and are not funneled here.
pub struct LeadReader {
    client: GraphClient,
}

/// The slice of a lead the enrichment sweep needs: join keys plus the
/// current mergeable contact sets, so no-op joins are detected in memory
/// before any write is attempted.
#[derive(Debug, Clone)]
pub struct LeadKey {
    pub url: String,
    pub username: Option<String>,
    pub emails: BTreeSet<String>,
    pub phone_numbers: BTreeSet<String>,
}

#[derive(Debug, Default)]
pub struct StoreCounts {
    pub leads: u64,
    pub raw: BTreeMap<Platform, u64>,
}

impl LeadReader {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    /// Fetch the canonical record for a url, if one exists.
    pub async fn get_lead(&self, url: &str) -> Result<Option<CanonicalLead>, UnileadsError> {
        let q = query("MATCH (l:Lead {url: $url}) RETURN l LIMIT 1").param("url", url);

        self.client
            .timed("get_lead", async {
                let mut stream = self.client.graph.execute(q).await?;
                let mut lead = None;
                if let Some(row) = stream.next().await? {
                    lead = row_to_lead(&row);
                }
                while stream.next().await?.is_some() {}
                Ok(lead)
            })
            .await
    }

    pub async fn count_leads(&self) -> Result<u64, UnileadsError> {
        let q = query("MATCH (l:Lead) RETURN count(l) AS cnt");
        let cnt = self
            .client
            .timed("count_leads", async {
                let mut stream = self.client.graph.execute(q).await?;
                let mut cnt = 0i64;
                if let Some(row) = stream.next().await? {
                    cnt = row.get("cnt").unwrap_or(0);
                }
                while stream.next().await?.is_some() {}
                Ok(cnt)
            })
            .await?;
        Ok(cnt.max(0) as u64)
    }

    /// One page of lead join keys, ordered by url for stable paging.
    pub async fn lead_keys(&self, skip: u64, limit: u64) -> Result<Vec<LeadKey>, UnileadsError> {
        let q = query(
            "MATCH (l:Lead)
             RETURN l.url AS url, l.username AS username,
                    l.emails AS emails, l.phone_numbers AS phone_numbers
             ORDER BY l.url ASC
             SKIP $skip LIMIT $limit",
        )
        .param("skip", skip as i64)
        .param("limit", limit as i64);

        self.client
            .timed("lead_keys", async {
                let mut stream = self.client.graph.execute(q).await?;
                let mut keys = Vec::new();
                while let Some(row) = stream.next().await? {
                    let url: String = row.get("url").unwrap_or_default();
                    let username: String = row.get("username").unwrap_or_default();
                    let emails: Vec<String> = row.get("emails").unwrap_or_default();
                    let phone_numbers: Vec<String> = row.get("phone_numbers").unwrap_or_default();
                    keys.push(LeadKey {
                        url,
                        username: none_if_empty(username),
                        emails: emails.into_iter().collect(),
                        phone_numbers: phone_numbers.into_iter().collect(),
                    });
                }
                Ok(keys)
            })
            .await
    }

    /// Urls with more than one canonical record: the dedup sweep's work
    /// list. A write landing after this read may add a group; the next
    /// sweep picks it up.
    pub async fn duplicate_urls(&self) -> Result<Vec<(String, u64)>, UnileadsError> {
        let q = query(
            "MATCH (l:Lead)
             WITH l.url AS url, count(l) AS cnt
             WHERE cnt > 1
             RETURN url, cnt
             ORDER BY url",
        );

        self.client
            .timed("duplicate_urls", async {
                let mut stream = self.client.graph.execute(q).await?;
                let mut groups = Vec::new();
                while let Some(row) = stream.next().await? {
                    let url: String = row.get("url").unwrap_or_default();
                    let cnt: i64 = row.get("cnt").unwrap_or(0);
                    if !url.is_empty() && cnt > 1 {
                        groups.push((url, cnt as u64));
                    }
                }
                Ok(groups)
            })
            .await
    }

    /// Raw payloads in one platform's source collection matching a lead by
    /// url or username. Payloads that fail to decode are skipped with a
    /// warning; a malformed source row must not sink the sweep.
    pub async fn raw_payloads_for(
        &self,
        platform: Platform,
        url: Option<&str>,
        username: Option<&str>,
    ) -> Result<Vec<serde_json::Value>, UnileadsError> {
        let cypher = format!(
            "MATCH (r:{label})
             WHERE ($url <> '' AND r.url = $url)
                OR ($username <> '' AND r.username = $username)
             RETURN r.payload AS payload",
            label = raw_label(platform),
        );
        let q = query(&cypher)
            .param("url", url.unwrap_or_default())
            .param("username", username.unwrap_or_default());

        let raw: Vec<String> = self
            .client
            .timed("raw_payloads_for", async {
                let mut stream = self.client.graph.execute(q).await?;
                let mut payloads = Vec::new();
                while let Some(row) = stream.next().await? {
                    payloads.push(row.get("payload").unwrap_or_default());
                }
                Ok(payloads)
            })
            .await?;

        let mut values = Vec::with_capacity(raw.len());
        for s in raw {
            match serde_json::from_str(&s) {
                Ok(v) => values.push(v),
                Err(e) => warn!(%platform, "Skipping undecodable raw payload: {e}"),
            }
        }
        Ok(values)
    }

    /// Per-collection record counts, for sweep summaries.
    pub async fn counts(&self) -> Result<StoreCounts, UnileadsError> {
        let mut counts = StoreCounts {
            leads: self.count_leads().await?,
            raw: BTreeMap::new(),
        };
        for platform in Platform::ALL {
            let cypher = format!(
                "MATCH (r:{label}) RETURN count(r) AS cnt",
                label = raw_label(platform)
            );
            let q = query(&cypher);
            let cnt = self
                .client
                .timed("counts", async {
                    let mut stream = self.client.graph.execute(q).await?;
                    let mut cnt = 0i64;
                    if let Some(row) = stream.next().await? {
                        cnt = row.get("cnt").unwrap_or(0);
                    }
                    while stream.next().await?.is_some() {}
                    Ok(cnt)
                })
                .await?;
            counts.raw.insert(platform, cnt.max(0) as u64);
        }
        Ok(counts)
    }
}

fn row_to_lead(row: &neo4rs::Row) -> Option<CanonicalLead> {
    let n: neo4rs::Node = row.get("l").ok()?;

    let id_str: String = n.get("id").ok()?;
    let id = Uuid::parse_str(&id_str).ok()?;

    let url: String = n.get("url").unwrap_or_default();
    let platform_str: String = n.get("platform").unwrap_or_default();
    let platform = Platform::from_tag(&platform_str)?;

    let emails: Vec<String> = n.get("emails").unwrap_or_default();
    let phone_numbers: Vec<String> = n.get("phone_numbers").unwrap_or_default();
    let websites: Vec<String> = n.get("websites").unwrap_or_default();
    let bio_links: Vec<String> = n.get("bio_links").unwrap_or_default();
    let social_handles: BTreeMap<Platform, String> = {
        let raw: String = n.get("social_handles").unwrap_or_default();
        serde_json::from_str(&raw).unwrap_or_default()
    };

    Some(CanonicalLead {
        id,
        url,
        platform,
        content_type: opt_prop(&n, "content_type"),
        profile: Profile {
            username: opt_prop(&n, "username"),
            full_name: opt_prop(&n, "full_name"),
            bio: opt_prop(&n, "bio"),
            location: opt_prop(&n, "location"),
            job_title: opt_prop(&n, "job_title"),
            employee_count: opt_prop(&n, "employee_count"),
        },
        contact: ContactInfo {
            emails: emails.into_iter().collect(),
            phone_numbers: phone_numbers.into_iter().collect(),
            address: opt_prop(&n, "address"),
            websites: websites.into_iter().collect(),
            social_handles,
            bio_links: bio_links.into_iter().collect(),
        },
        content: Content {
            caption: opt_prop(&n, "caption"),
            upload_date: opt_prop(&n, "upload_date"),
            channel_name: opt_prop(&n, "channel_name"),
            author_name: opt_prop(&n, "author_name"),
        },
        metadata: Metadata {
            scraped_at: datetime_prop(&n, "scraped_at").unwrap_or_else(Utc::now),
            updated_at: datetime_prop(&n, "updated_at"),
            data_quality_score: n.get("data_quality_score").unwrap_or(0.0),
        },
        classification: Classification {
            industry: opt_prop(&n, "industry"),
            revenue: opt_prop(&n, "revenue"),
            lead_category: opt_prop(&n, "lead_category"),
            lead_sub_category: opt_prop(&n, "lead_sub_category"),
            company_name: opt_prop(&n, "company_name"),
            company_type: opt_prop(&n, "company_type"),
            decision_makers: opt_prop(&n, "decision_makers"),
            bdr: opt_prop(&n, "bdr"),
            product_interests: opt_prop(&n, "product_interests"),
            timeline: opt_prop(&n, "timeline"),
            interest_level: opt_prop(&n, "interest_level"),
        },
    })
}

/// Writer flattens absent optionals to empty strings; map them back.
fn opt_prop(n: &neo4rs::Node, prop: &str) -> Option<String> {
    none_if_empty(n.get::<String>(prop).unwrap_or_default())
}

fn none_if_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Datetime properties come back as native bolt datetimes or, from older
/// rows, as the writer's naive string format.
fn datetime_prop(n: &neo4rs::Node, prop: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = n.get::<DateTime<chrono::FixedOffset>>(prop) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(s) = n.get::<String>(prop) {
        if let Ok(dt) = DateTime::parse_from_rfc3339(&s) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(&s, "%Y-%m-%dT%H:%M:%S%.f") {
            return Some(naive.and_utc());
        }
    }
    None
}
