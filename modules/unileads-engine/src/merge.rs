//! Pure contact merge: set union of emails and phone numbers.
//!
//! Matching is exact string equality: no case folding, no phone-format
//! normalization. The source systems never normalized either, and changing
//! that here would silently re-key records on re-ingestion.

use unileads_common::ContactInfo;

/// Result of merging incoming contact data into an existing record.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactMerge {
    pub contact: ContactInfo,
    pub added_emails: usize,
    pub added_phones: usize,
}

impl ContactMerge {
    /// Total new values introduced by the union. Zero means the merge is a
    /// no-op and must not trigger a persisted write.
    pub fn added(&self) -> usize {
        self.added_emails + self.added_phones
    }
}

/// Union `incoming`'s emails and phone numbers into `existing`. Only the
/// two mergeable sets are touched; address, websites, handles, and bio
/// links keep the existing record's values (first-write-wins).
pub fn merge(existing: &ContactInfo, incoming: &ContactInfo) -> ContactMerge {
    let mut contact = existing.clone();

    let emails_before = contact.emails.len();
    contact.emails.extend(incoming.emails.iter().cloned());
    let added_emails = contact.emails.len() - emails_before;

    let phones_before = contact.phone_numbers.len();
    contact
        .phone_numbers
        .extend(incoming.phone_numbers.iter().cloned());
    let added_phones = contact.phone_numbers.len() - phones_before;

    ContactMerge {
        contact,
        added_emails,
        added_phones,
    }
}
