//! Conflict matching core
//!
//! The pure rule evaluation of the screen: no IO, no runtime, no clock.
//! [`find_conflicts`] takes the prospective client's details and the
//! fetched corpus and reports every rule hit in corpus order, so results
//! are reproducible across runs against the same snapshot.

pub mod finding;
pub mod query;
pub mod rules;

pub use finding::{MatchFinding, RuleKind};
pub use query::NewClientQuery;
pub use rules::find_conflicts;
