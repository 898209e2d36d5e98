//! The conflict rule set
//!
//! Eight rule families, walked per contact and then per matter:
//!
//!   1. Name: the query name appears inside the contact's name
//!   2. Alias: the query name appears inside the "Maiden Name" field
//!   3. Nickname: a comma-separated "Nicknames" token appears inside the
//!      query name (the reverse direction of rules 1 and 2)
//!   4. DateOfBirth: exact match on the "Date of Birth" field
//!   5. Address: exact match on the street line, lower-cased
//!   6. Phone: exact match against any of the contact's numbers
//!   7. Corporate roles, company contacts only: the query name appears
//!      inside "Officers and Directors", "Partners" or "Trade Names"
//!   8. OpposingParty: the query name appears inside a matter's client name
//!
//! Substring rules over-match on purpose: the screen prefers hits a
//! reviewer discards over misses nobody sees. Every rule is guarded on a
//! non-empty query field, since an empty needle is a substring of
//! everything.

use clio_api::{ContactRecord, ContactType, MatterRecord};

use crate::finding::{MatchFinding, RuleKind};
use crate::query::NewClientQuery;

/// Custom-field names the rules read off a contact.
const FIELD_MAIDEN_NAME: &str = "Maiden Name";
const FIELD_NICKNAMES: &str = "Nicknames";
const FIELD_DATE_OF_BIRTH: &str = "Date of Birth";
const FIELD_OFFICERS: &str = "Officers and Directors";
const FIELD_PARTNERS: &str = "Partners";
const FIELD_TRADE_NAMES: &str = "Trade Names";

/// Evaluate the full rule set for a prospective client.
///
/// Findings come back in corpus order: every contact in sequence with its
/// rules in the numbered order above (any subset may fire for one
/// contact), then every matter. Deterministic for a given snapshot.
pub fn find_conflicts(
    query: &NewClientQuery,
    contacts: &[ContactRecord],
    matters: &[MatterRecord],
) -> Vec<MatchFinding> {
    let mut findings = Vec::new();
    let name_query = query.name.to_lowercase();

    for contact in contacts {
        scan_contact(query, &name_query, contact, &mut findings);
    }

    // Rule 8: the query name inside a matter's client name. Matters with
    // no client attached have nobody to collide with.
    if !name_query.is_empty() {
        for matter in matters {
            let Some(client) = &matter.client else {
                continue;
            };
            if client.name.to_lowercase().contains(&name_query) {
                findings.push(MatchFinding {
                    rule: RuleKind::OpposingParty,
                    record_id: matter.id,
                    subject: client.name.clone(),
                    detail: format!("{}: {}", matter.display_number, matter.description),
                });
            }
        }
    }

    findings
}

fn scan_contact(
    query: &NewClientQuery,
    name_query: &str,
    contact: &ContactRecord,
    findings: &mut Vec<MatchFinding>,
) {
    if !name_query.is_empty() {
        // Rule 1: Name
        if contact.name.to_lowercase().contains(name_query) {
            findings.push(contact_finding(RuleKind::Name, contact, &contact.name));
        }

        // Rule 2: Alias
        if let Some(maiden) = contact.custom_fields.get(FIELD_MAIDEN_NAME) {
            if maiden.to_lowercase().contains(name_query) {
                findings.push(contact_finding(RuleKind::Alias, contact, maiden));
            }
        }

        // Rule 3: Nickname, matched token inside the query name
        if let Some(nicknames) = contact.custom_fields.get(FIELD_NICKNAMES) {
            let hit = nicknames
                .split(',')
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .find(|token| name_query.contains(&token.to_lowercase()));
            if let Some(token) = hit {
                findings.push(contact_finding(RuleKind::Nickname, contact, token));
            }
        }
    }

    // Rule 4: DateOfBirth
    if !query.date_of_birth.is_empty() {
        if let Some(dob) = contact.custom_fields.get(FIELD_DATE_OF_BIRTH) {
            if dob == &query.date_of_birth {
                findings.push(contact_finding(RuleKind::DateOfBirth, contact, dob));
            }
        }
    }

    // Rule 5: Address
    if !query.address.is_empty() {
        if let Some(address) = &contact.address {
            if address.street.to_lowercase() == query.address.to_lowercase() {
                findings.push(contact_finding(RuleKind::Address, contact, &address.street));
            }
        }
    }

    // Rule 6: Phone
    if !query.phone.is_empty() {
        if let Some(phone) = contact.phone_numbers.iter().find(|p| p.number == query.phone) {
            findings.push(contact_finding(RuleKind::Phone, contact, &phone.number));
        }
    }

    // Rule 7: corporate role fields, company contacts only
    if contact.contact_type == ContactType::Company && !name_query.is_empty() {
        for (field, rule) in [
            (FIELD_OFFICERS, RuleKind::OfficerOrDirector),
            (FIELD_PARTNERS, RuleKind::Partner),
            (FIELD_TRADE_NAMES, RuleKind::TradeName),
        ] {
            if let Some(value) = contact.custom_fields.get(field) {
                if value.to_lowercase().contains(name_query) {
                    findings.push(contact_finding(rule, contact, value));
                }
            }
        }
    }
}

fn contact_finding(rule: RuleKind, contact: &ContactRecord, detail: &str) -> MatchFinding {
    MatchFinding {
        rule,
        record_id: contact.id,
        subject: contact.name.clone(),
        detail: detail.to_string(),
    }
}
