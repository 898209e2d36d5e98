//! Resource models for the contact and matter collections
//!
//! Every field beyond the record id is default-tolerant: corpora exported
//! from real firms routinely omit custom fields, phone numbers, addresses,
//! or the matter client, and a missing field must deserialize cleanly
//! rather than fail the whole page.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Whether a contact is a natural person or a company.
///
/// The corporate matching rules (officers, partners, trade names) only
/// apply to companies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContactType {
    #[default]
    Person,
    Company,
}

/// A phone number attached to a contact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhoneNumber {
    #[serde(default)]
    pub number: String,
}

/// A contact's primary address.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub province: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub country: String,
}

/// One record from the contacts collection.
///
/// `custom_fields` maps custom-field names (`Maiden Name`, `Nicknames`,
/// `Date of Birth`, `Officers and Directors`, `Partners`, `Trade Names`)
/// to their values; the matcher reads them by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactRecord {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub contact_type: ContactType,
    #[serde(default)]
    pub custom_fields: HashMap<String, String>,
    #[serde(default)]
    pub phone_numbers: Vec<PhoneNumber>,
    #[serde(default)]
    pub address: Option<Address>,
}

/// The client a matter was opened for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatterClient {
    #[serde(default)]
    pub name: String,
}

/// One record from the matters collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatterRecord {
    pub id: i64,
    #[serde(default)]
    pub display_number: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub client: Option<MatterClient>,
}

/// Envelope for one page of a collection response.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: serde::de::Deserialize<'de>"))]
pub struct Page<T> {
    #[serde(default)]
    pub data: Vec<T>,
    #[serde(default)]
    pub meta: Meta,
}

/// Response metadata. Only the paging block matters here.
#[derive(Debug, Default, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub paging: Paging,
}

/// Paging metadata, interpreted leniently.
///
/// Deployments disagree on the shape: some send a boolean `next`, some a
/// numeric `next_page` cursor, some only `total_pages`. Whichever is
/// present decides; when all are absent the page is the last one.
#[derive(Debug, Default, Deserialize)]
pub struct Paging {
    #[serde(default)]
    pub next: Option<bool>,
    #[serde(default)]
    pub next_page: Option<u32>,
    #[serde(default)]
    pub total_pages: Option<u32>,
    #[serde(default)]
    pub total_records: Option<u64>,
}

impl Paging {
    /// Whether more pages follow the given 1-based page.
    /// An explicit boolean wins, then a present cursor, then the page
    /// count.
    pub fn has_next(&self, current_page: u32) -> bool {
        if let Some(next) = self.next {
            return next;
        }
        if self.next_page.is_some() {
            return true;
        }
        if let Some(total) = self.total_pages {
            return current_page < total;
        }
        false
    }

    /// The page number to request next, preferring the server's cursor.
    pub fn next_page_number(&self, current_page: u32) -> u32 {
        self.next_page.unwrap_or(current_page + 1)
    }
}
