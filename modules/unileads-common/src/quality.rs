use crate::types::CanonicalLead;

/// Leads scoring below this are worth a manual look before export.
pub const QUALITY_REVIEW_THRESHOLD: f64 = 0.35;

/// Fraction of key identity and contact fields populated (0.0-1.0).
///
/// The score is a coarse completeness measure, not a correctness measure:
/// it counts the fields reporting queries filter on (name, handle, URL) and
/// whether any contact channel was captured at all.
pub fn data_quality_score(lead: &CanonicalLead) -> f64 {
    let mut total = 0u32;
    let mut filled = 0u32;

    let mut check = |present: bool| {
        total += 1;
        if present {
            filled += 1;
        }
    };

    check(lead.profile.full_name.is_some());
    check(lead.profile.username.is_some());
    check(!lead.url.is_empty());
    check(!lead.contact.emails.is_empty());
    check(!lead.contact.phone_numbers.is_empty());
    check(!lead.contact.websites.is_empty());

    if total == 0 {
        return 0.0;
    }
    filled as f64 / total as f64
}
