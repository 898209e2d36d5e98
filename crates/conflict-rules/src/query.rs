//! The prospective-client query

use serde::{Deserialize, Serialize};

/// Identifying details of a prospective client, as submitted for one check.
///
/// Transient by design: the query is evaluated against the corpus and never
/// persisted anywhere. An empty field skips every rule that reads it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewClientQuery {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub date_of_birth: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
}
