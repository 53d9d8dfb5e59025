// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Audience resolution.
//!
//! The count shown at campaign creation is advisory. The set resolved when
//! dispatch starts is authoritative and is journaled, so a resumed dispatch
//! keeps the same chunk boundaries even if contacts changed meanwhile.

use serde::{Deserialize, Serialize};

use beacon_core::{BeaconError, CampaignStore, Contact};

/// The part of a contact the dispatcher needs to send one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub contact_id: String,
    /// Canonical E.164 phone.
    pub phone: String,
    pub name: Option<String>,
}

impl From<Contact> for Recipient {
    fn from(contact: Contact) -> Self {
        Self {
            contact_id: contact.id,
            phone: contact.phone,
            name: contact.name,
        }
    }
}

/// Trim, drop blanks, and de-duplicate a tag filter, keeping first-seen order.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

/// Advisory audience size for display at creation time.
pub async fn advisory_count(store: &dyn CampaignStore, tags: &[String]) -> Result<i64, BeaconError> {
    store.count_eligible_contacts(tags).await
}

/// The authoritative, ordered recipient list for a dispatch.
pub async fn resolve(store: &dyn CampaignStore, tags: &[String]) -> Result<Vec<Recipient>, BeaconError> {
    let contacts = store.list_eligible_contacts(tags).await?;
    Ok(contacts
        .into_iter()
        .filter(|c| !c.is_unsubscribed)
        .map(Recipient::from)
        .collect())
}
