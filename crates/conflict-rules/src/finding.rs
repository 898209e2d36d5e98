//! Findings reported by the matcher

use serde::{Deserialize, Serialize};

/// Which rule fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleKind {
    Name,
    Alias,
    Nickname,
    DateOfBirth,
    Address,
    Phone,
    OfficerOrDirector,
    Partner,
    TradeName,
    OpposingParty,
}

impl RuleKind {
    /// Snake-case rule label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            RuleKind::Name => "name",
            RuleKind::Alias => "alias",
            RuleKind::Nickname => "nickname",
            RuleKind::DateOfBirth => "date_of_birth",
            RuleKind::Address => "address",
            RuleKind::Phone => "phone",
            RuleKind::OfficerOrDirector => "officer_or_director",
            RuleKind::Partner => "partner",
            RuleKind::TradeName => "trade_name",
            RuleKind::OpposingParty => "opposing_party",
        }
    }
}

/// One conflict hit against the corpus.
///
/// `record_id` is the contact id, or the matter id for [`RuleKind::OpposingParty`].
/// `subject` names who the query collided with (the contact's name, or the
/// matter's client name); `detail` carries the matched value so a reviewer
/// can judge the hit without opening the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchFinding {
    pub rule: RuleKind,
    pub record_id: i64,
    pub subject: String,
    pub detail: String,
}
