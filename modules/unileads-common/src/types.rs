use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Platform ---

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Web,
    Instagram,
    Linkedin,
    Youtube,
    Facebook,
    Twitter,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::Web => write!(f, "web"),
            Platform::Instagram => write!(f, "instagram"),
            Platform::Linkedin => write!(f, "linkedin"),
            Platform::Youtube => write!(f, "youtube"),
            Platform::Facebook => write!(f, "facebook"),
            Platform::Twitter => write!(f, "twitter"),
        }
    }
}

impl Platform {
    pub const ALL: [Platform; 6] = [
        Platform::Web,
        Platform::Instagram,
        Platform::Linkedin,
        Platform::Youtube,
        Platform::Facebook,
        Platform::Twitter,
    ];

    /// Parse an adapter's platform tag. Unknown tags are None; the ingest
    /// path surfaces those as a validation rejection, never a panic.
    pub fn from_tag(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "web" => Some(Self::Web),
            "instagram" | "ig" => Some(Self::Instagram),
            "linkedin" => Some(Self::Linkedin),
            "youtube" | "yt" => Some(Self::Youtube),
            "facebook" | "fb" => Some(Self::Facebook),
            "twitter" | "x" => Some(Self::Twitter),
            _ => None,
        }
    }
}

// --- Canonical lead schema ---

/// Profile fields lifted from the source payload. Optional leaves are
/// stripped when absent; the schema keeps whatever the platform provided.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_count: Option<String>,
}

/// Contact data for a lead. The four set fields are true sets (no
/// duplicates, order irrelevant) and are always serialized, even when
/// empty. Matching is exact string equality throughout; no case folding or
/// phone-format normalization (a source-system simplification, preserved).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactInfo {
    #[serde(default)]
    pub emails: BTreeSet<String>,
    #[serde(default)]
    pub phone_numbers: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default)]
    pub websites: BTreeSet<String>,
    #[serde(default)]
    pub social_handles: BTreeMap<Platform, String>,
    #[serde(default)]
    pub bio_links: BTreeSet<String>,
}

impl ContactInfo {
    /// Insert an email if it is non-empty after trimming.
    pub fn add_email(&mut self, value: impl AsRef<str>) {
        let v = value.as_ref().trim();
        if !v.is_empty() {
            self.emails.insert(v.to_string());
        }
    }

    /// Insert a phone number if it is non-empty after trimming.
    pub fn add_phone(&mut self, value: impl AsRef<str>) {
        let v = value.as_ref().trim();
        if !v.is_empty() {
            self.phone_numbers.insert(v.to_string());
        }
    }

    /// Number of mergeable contact values (emails + phone numbers).
    pub fn merge_len(&self) -> usize {
        self.emails.len() + self.phone_numbers.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub scraped_at: DateTime<Utc>,
    /// Set by the contact merge and enrichment writes only.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    pub data_quality_score: f64,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            scraped_at: Utc::now(),
            updated_at: None,
            data_quality_score: 0.0,
        }
    }
}

/// Sales-classification fields. Every key is always serialized (value or
/// null), never omitted. Downstream reporting relies on a stable
/// cross-platform shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub revenue: Option<String>,
    #[serde(default)]
    pub lead_category: Option<String>,
    #[serde(default)]
    pub lead_sub_category: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub company_type: Option<String>,
    #[serde(default)]
    pub decision_makers: Option<String>,
    #[serde(default)]
    pub bdr: Option<String>,
    #[serde(default)]
    pub product_interests: Option<String>,
    #[serde(default)]
    pub timeline: Option<String>,
    #[serde(default)]
    pub interest_level: Option<String>,
}

/// The unified, cross-platform lead record. Identity is `url`: at most one
/// canonical record exists per URL. `platform` is immutable once set.
///
/// Created by the normalizer on first successful transform; mutated only by
/// the contact merge (set union) and the enrichment sweep (contact
/// backfill); removed only by the dedup sweep collapsing a duplicate group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalLead {
    pub id: Uuid,
    pub url: String,
    pub platform: Platform,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default)]
    pub profile: Profile,
    #[serde(default)]
    pub contact: ContactInfo,
    #[serde(default)]
    pub content: Content,
    pub metadata: Metadata,
    #[serde(flatten)]
    pub classification: Classification,
}

// --- Raw source records ---

/// A raw scrape result as it landed in its platform source collection.
/// Immutable once appended; read-only input to the enrichment sweep.
/// `url`/`username` are the join keys, lifted from the platform-specific
/// payload fields at append time; `payload` keeps the original shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSourceRecord {
    pub id: Uuid,
    pub platform: Platform,
    pub url: Option<String>,
    pub username: Option<String>,
    pub scraped_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

// --- Upsert outcome ---

/// Result of an identity-keyed upsert. `Updated` means the contact union
/// added at least one new value; `Unchanged` means a conflict was detected
/// but nothing new arrived. The distinction is what makes re-ingestion
/// idempotence observable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    Unchanged,
}

impl std::fmt::Display for UpsertOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpsertOutcome::Inserted => write!(f, "inserted"),
            UpsertOutcome::Updated => write!(f, "updated"),
            UpsertOutcome::Unchanged => write!(f, "unchanged"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_tag_roundtrip() {
        for p in Platform::ALL {
            assert_eq!(Platform::from_tag(&p.to_string()), Some(p));
        }
        assert_eq!(Platform::from_tag("X"), Some(Platform::Twitter));
        assert_eq!(Platform::from_tag("myspace"), None);
    }

    #[test]
    fn contact_sets_reject_empty_values() {
        let mut c = ContactInfo::default();
        c.add_email("  ");
        c.add_email("a@x.com");
        c.add_email("a@x.com");
        c.add_phone("");
        assert_eq!(c.emails.len(), 1);
        assert!(c.phone_numbers.is_empty());
        assert_eq!(c.merge_len(), 1);
    }

    #[test]
    fn classification_keys_always_serialized() {
        let lead = CanonicalLead {
            id: Uuid::new_v4(),
            url: "https://example.com".to_string(),
            platform: Platform::Web,
            content_type: Some("profile".to_string()),
            profile: Profile::default(),
            contact: ContactInfo::default(),
            content: Content::default(),
            metadata: Metadata::default(),
            classification: Classification::default(),
        };
        let json = serde_json::to_value(&lead).unwrap();
        for key in [
            "industry",
            "revenue",
            "lead_category",
            "lead_sub_category",
            "company_name",
            "company_type",
            "decision_makers",
            "bdr",
            "product_interests",
            "timeline",
            "interest_level",
        ] {
            assert!(json.get(key).is_some(), "classification key {key} omitted");
            assert!(json[key].is_null());
        }
        // Empty contact sets stay present
        assert!(json["contact"]["emails"].is_array());
        assert!(json["contact"]["bio_links"].is_array());
        // Empty optional profile leaves are stripped
        assert!(json["profile"].get("bio").is_none());
    }

    #[test]
    fn email_sets_union_via_extend() {
        let mut a = ContactInfo::default();
        a.add_email("a@x.com");
        let mut b = ContactInfo::default();
        b.add_email("a@x.com");
        b.add_email("b@x.com");
        a.emails.extend(b.emails.iter().cloned());
        assert_eq!(a.emails.len(), 2);
    }
}
