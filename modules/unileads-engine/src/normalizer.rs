//! Schema normalization: one raw per-platform payload in, one canonical
//! lead out. Fails closed: an unusable payload is a typed `Rejected`,
//! never an error or a panic.
//!
//! Field extraction is table-driven: each platform declares ordered
//! fallback field paths and the generic routines in `extract` evaluate
//! them. The cleanup the original pipeline ran as a separate pass is
//! structural here: extracted strings are trimmed, empties become absent
//! options, the contact sets are always present, and every classification
//! key serializes (value or null) for cross-platform schema stability.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use unileads_common::{
    quality, CanonicalLead, Classification, ContactInfo, Content, Metadata, Platform, Profile,
};

use crate::extract::{collect_strings, first_string, string_at, value_at};

/// Generic page chrome that scrapers capture instead of a person or
/// company name. A profile-like record whose display name lands here is
/// unusable for unification.
pub const PLACEHOLDER_NAMES: &[&str] = &[
    "sign up",
    "signup",
    "log in",
    "login",
    "register",
    "join now",
    "get started",
    "create account",
    "sign in",
    "signin",
    "continue",
    "next",
    "submit",
    "loading",
    "please wait",
    "error",
    "page not found",
    "404",
    "access denied",
    "unauthorized",
    "linkedin",
    "connect",
    "follow",
    "view profile",
];

pub fn is_placeholder_name(name: &str) -> bool {
    let n = name.trim().to_lowercase();
    n.is_empty() || PLACEHOLDER_NAMES.contains(&n.as_str())
}

/// Why a payload was rejected. These are expected, local conditions
/// that callers count; they are never errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// No identity key: the payload yields no url (and no handle to
    /// synthesize one from).
    MissingIdentity,
    /// Profile-like platform whose display name is page chrome.
    PlaceholderName(String),
    /// The adapter's platform tag did not parse.
    UnknownPlatform(String),
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::MissingIdentity => write!(f, "missing identity key"),
            RejectReason::PlaceholderName(name) => {
                write!(f, "placeholder display name: {name:?}")
            }
            RejectReason::UnknownPlatform(tag) => write!(f, "unknown platform tag: {tag:?}"),
        }
    }
}

/// Outcome of a transform. Tagged so callers can tell an expected skip
/// from a genuine failure. There is no silent null path.
#[derive(Debug, Clone, PartialEq)]
pub enum Transformed {
    Accepted(Box<CanonicalLead>),
    Rejected(RejectReason),
}

impl Transformed {
    pub fn accepted(self) -> Option<CanonicalLead> {
        match self {
            Transformed::Accepted(lead) => Some(*lead),
            Transformed::Rejected(_) => None,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Transformed::Rejected(_))
    }
}

/// Map a raw scrape payload to the canonical shape.
pub fn transform(raw: &Value, platform: Platform) -> Transformed {
    let map = field_map(platform);

    if profile_like(platform) {
        let display = first_string(raw, map.full_name).unwrap_or_default();
        if is_placeholder_name(&display) {
            return Transformed::Rejected(RejectReason::PlaceholderName(display));
        }
    }

    let mut lead = build(raw, platform, map);
    apply_platform_quirks(&mut lead, raw, platform);

    if lead.url.is_empty() {
        return Transformed::Rejected(RejectReason::MissingIdentity);
    }

    lead.metadata.data_quality_score = quality::data_quality_score(&lead);
    Transformed::Accepted(Box::new(lead))
}

/// Platforms whose display name comes from scraped page text rather than a
/// handle, the ones that produce placeholder-name junk.
fn profile_like(platform: Platform) -> bool {
    matches!(
        platform,
        Platform::Linkedin | Platform::Facebook | Platform::Twitter
    )
}

// --- Field tables ---

type Chains = &'static [&'static [&'static str]];

const EMPTY: Chains = &[];

/// Ordered fallback field paths for one platform. Scalar fields take the
/// first chain that yields a value; the set fields collect every string
/// each chain reaches.
struct FieldMap {
    url: Chains,
    content_type: Chains,
    fixed_content_type: Option<&'static str>,
    username: Chains,
    full_name: Chains,
    bio: Chains,
    location: Chains,
    job_title: Chains,
    employee_count: Chains,
    emails: Chains,
    phone_numbers: Chains,
    address: Chains,
    websites: Chains,
    bio_links: Chains,
    caption: Chains,
    upload_date: Chains,
    channel_name: Chains,
    author_name: Chains,
    scraped_at: Chains,
}

static INSTAGRAM_FIELDS: FieldMap = FieldMap {
    url: EMPTY, // synthesized from the handle
    content_type: &[&["content_type"]],
    fixed_content_type: None,
    username: &[&["username"]],
    full_name: &[&["full_name"]],
    bio: &[&["biography"]],
    location: EMPTY,
    job_title: &[&["business_category_name"]],
    employee_count: EMPTY,
    emails: &[&["emails"], &["business_email"]],
    phone_numbers: &[&["phone_numbers"], &["business_phone_number"]],
    address: EMPTY,
    websites: EMPTY,
    bio_links: &[&["bio_links"]],
    caption: &[&["caption"]],
    upload_date: EMPTY,
    channel_name: EMPTY,
    author_name: &[&["username"]],
    scraped_at: &[&["scraped_at"]],
};

static LINKEDIN_FIELDS: FieldMap = FieldMap {
    url: &[&["url"]],
    content_type: EMPTY, // mapped from url_type
    fixed_content_type: None,
    username: &[&["username"]],
    full_name: &[&["full_name"], &["author_name"]],
    bio: &[&["about"], &["about_us"]],
    location: &[&["location"]],
    job_title: &[&["job_title"]],
    employee_count: &[&["employee_count"]],
    emails: &[&["emails"]],
    phone_numbers: &[&["phone_numbers"]],
    address: &[&["address"]],
    websites: &[&["website"]],
    bio_links: EMPTY,
    caption: &[&["headline"]],
    upload_date: &[&["date_published"]],
    channel_name: EMPTY,
    author_name: &[&["author_name"], &["full_name"]],
    scraped_at: &[&["scraping_timestamp"]],
};

static YOUTUBE_FIELDS: FieldMap = FieldMap {
    url: &[&["url"]],
    content_type: &[&["content_type"]],
    fixed_content_type: None,
    username: EMPTY,
    full_name: &[&["channel_name"]],
    bio: &[&["description"]],
    location: EMPTY,
    job_title: EMPTY,
    employee_count: EMPTY,
    emails: &[&["email"]],
    phone_numbers: &[&["phone_numbers"]],
    address: EMPTY,
    websites: EMPTY,
    bio_links: EMPTY, // mined from the nested handle lists
    caption: &[&["title"]],
    upload_date: &[&["upload_date"]],
    channel_name: &[&["channel_name"]],
    author_name: EMPTY,
    scraped_at: &[&["scraped_at"]],
};

static WEB_FIELDS: FieldMap = FieldMap {
    url: &[&["source_url"]],
    content_type: EMPTY,
    fixed_content_type: Some("profile"),
    username: EMPTY,
    full_name: &[
        &["ai_leads", "organization_info", "primary_name"],
        &["business_name"],
    ],
    bio: EMPTY,
    location: &[&["ai_leads", "organization_info", "location"], &["location"]],
    job_title: EMPTY,
    employee_count: EMPTY, // defaulted below
    emails: &[&["email"], &["ai_leads", "ai_contacts", "email"]],
    phone_numbers: &[&["phone"], &["ai_leads", "ai_contacts", "phone"]],
    address: &[&["ai_leads", "organization_info", "address"], &["address"]],
    websites: &[&["source_url"]],
    bio_links: EMPTY,
    caption: EMPTY,
    upload_date: EMPTY,
    channel_name: EMPTY,
    author_name: EMPTY,
    scraped_at: &[&["extraction_timestamp"]],
};

static FACEBOOK_FIELDS: FieldMap = FieldMap {
    url: &[&["url"]],
    content_type: EMPTY,
    fixed_content_type: Some("profile"),
    username: &[&["username"]],
    full_name: &[&["full_name"]],
    bio: &[&["about"]],
    location: &[&["location"]],
    job_title: EMPTY,
    employee_count: EMPTY,
    emails: &[&["emails"], &["email"]],
    phone_numbers: &[&["phone_numbers"], &["phone"]],
    address: &[&["address"]],
    websites: &[&["website"]],
    bio_links: EMPTY,
    caption: &[&["description"]],
    upload_date: EMPTY,
    channel_name: EMPTY,
    author_name: &[&["full_name"]],
    scraped_at: &[&["scraped_at"]],
};

static TWITTER_FIELDS: FieldMap = FieldMap {
    url: &[&["url"]],
    content_type: EMPTY,
    fixed_content_type: Some("profile"),
    username: &[&["username"]],
    full_name: &[&["full_name"]],
    bio: &[&["bio"]],
    location: &[&["location"]],
    job_title: EMPTY,
    employee_count: EMPTY,
    emails: &[&["email"]],
    phone_numbers: &[&["phone"]],
    address: EMPTY,
    websites: &[&["website"]],
    bio_links: EMPTY,
    caption: &[&["description"]],
    upload_date: EMPTY,
    channel_name: EMPTY,
    author_name: &[&["full_name"]],
    scraped_at: &[&["scraped_at"]],
};

fn field_map(platform: Platform) -> &'static FieldMap {
    match platform {
        Platform::Instagram => &INSTAGRAM_FIELDS,
        Platform::Linkedin => &LINKEDIN_FIELDS,
        Platform::Youtube => &YOUTUBE_FIELDS,
        Platform::Web => &WEB_FIELDS,
        Platform::Facebook => &FACEBOOK_FIELDS,
        Platform::Twitter => &TWITTER_FIELDS,
    }
}

// --- Generic build ---

fn build(raw: &Value, platform: Platform, map: &FieldMap) -> CanonicalLead {
    let profile = Profile {
        username: first_string(raw, map.username),
        full_name: first_string(raw, map.full_name),
        bio: first_string(raw, map.bio),
        location: first_string(raw, map.location),
        job_title: first_string(raw, map.job_title),
        employee_count: first_string(raw, map.employee_count),
    };

    let mut contact = ContactInfo::default();
    for chain in map.emails {
        for v in collect_strings(raw, chain) {
            contact.add_email(v);
        }
    }
    for chain in map.phone_numbers {
        for v in collect_strings(raw, chain) {
            contact.add_phone(v);
        }
    }
    contact.address = first_string(raw, map.address);
    for chain in map.websites {
        contact.websites.extend(collect_strings(raw, chain));
    }
    for chain in map.bio_links {
        contact.bio_links.extend(collect_strings(raw, chain));
    }

    let content = Content {
        caption: first_string(raw, map.caption),
        upload_date: first_string(raw, map.upload_date),
        channel_name: first_string(raw, map.channel_name),
        author_name: first_string(raw, map.author_name),
    };

    // The record carries its own handle on its home platform.
    if let Some(own) = profile
        .username
        .clone()
        .or_else(|| content.channel_name.clone())
    {
        contact.social_handles.insert(platform, own);
    }

    let scraped_at = first_string(raw, map.scraped_at)
        .and_then(|s| parse_timestamp(&s))
        .unwrap_or_else(Utc::now);

    let company_name = profile.full_name.clone();

    CanonicalLead {
        id: Uuid::new_v4(),
        url: first_string(raw, map.url).unwrap_or_default(),
        platform,
        content_type: first_string(raw, map.content_type)
            .or_else(|| map.fixed_content_type.map(str::to_string)),
        profile,
        contact,
        content,
        metadata: Metadata {
            scraped_at,
            updated_at: None,
            data_quality_score: 0.0,
        },
        classification: Classification {
            company_name,
            bdr: Some("AKG".to_string()),
            ..Default::default()
        },
    }
}

// --- Platform quirks the tables cannot express ---

fn apply_platform_quirks(lead: &mut CanonicalLead, raw: &Value, platform: Platform) {
    match platform {
        Platform::Instagram => {
            // Identity is the handle: the page URL scrapers capture varies
            // per session, the profile URL does not.
            if let Some(u) = &lead.profile.username {
                lead.url = format!("https://www.instagram.com/{u}");
            }
        }
        Platform::Linkedin => {
            let url_type = string_at(raw, &["url_type"]).unwrap_or_default();
            lead.content_type = Some(linkedin_content_type(&url_type).to_string());
        }
        Platform::Youtube => {
            // Channel about-pages list off-platform presences as
            // {platform: [{username, url}, ...]}; mine both the first
            // handle per platform and every link.
            if let Some(handles) = value_at(raw, &["social_media_handles"]).and_then(Value::as_object)
            {
                for (key, entries) in handles {
                    lead.contact
                        .bio_links
                        .extend(collect_strings(entries, &["url"]));
                    if let Some(p) = Platform::from_tag(key) {
                        if let Some(handle) = first_handle(entries) {
                            lead.contact.social_handles.entry(p).or_insert(handle);
                        }
                    }
                }
            }
            if let Some(channel) = &lead.content.channel_name {
                lead.contact
                    .social_handles
                    .entry(Platform::Youtube)
                    .or_insert_with(|| channel.clone());
            }
        }
        Platform::Web => {
            if let Some(handles) = value_at(raw, &["social_media"]).and_then(Value::as_object) {
                for (key, val) in handles {
                    if let (Some(p), Some(h)) = (Platform::from_tag(key), val.as_str()) {
                        let h = h.trim();
                        if !h.is_empty() {
                            lead.contact.social_handles.insert(p, h.to_string());
                        }
                    }
                }
            }
            // Export defaults the web pipeline has always applied.
            lead.profile
                .employee_count
                .get_or_insert_with(|| "1000".to_string());
            lead.classification.revenue = Some("100k".to_string());

            lead.classification.industry = first_string(
                raw,
                &[&["ai_leads", "organization_info", "industry"], &["industry"]],
            );
            lead.classification.company_type = first_string(
                raw,
                &[
                    &["ai_leads", "organization_info", "organization_type"],
                    &["company_type"],
                ],
            );
            lead.classification.decision_makers = string_at(raw, &["contact_person"]);
            lead.classification.lead_category =
                collect_strings(raw, &["ai_leads", "ai_contacts", "lead_category"])
                    .into_iter()
                    .next();
            lead.classification.lead_sub_category =
                collect_strings(raw, &["ai_leads", "ai_contacts", "lead_sub_category"])
                    .into_iter()
                    .next();
        }
        Platform::Facebook | Platform::Twitter => {}
    }
}

fn linkedin_content_type(url_type: &str) -> &'static str {
    match url_type {
        "post" | "newsletter" => "article",
        _ => "profile",
    }
}

/// Handle entries arrive either as {username, url} objects or as bare
/// strings; take the first usable one.
fn first_handle(entries: &Value) -> Option<String> {
    if let Some(h) = collect_strings(entries, &["username"]).into_iter().next() {
        return Some(h);
    }
    entries
        .as_array()
        .and_then(|a| a.first())
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|n| n.and_utc())
}
