use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Architecture Decision Record attached to a document on approval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Adr {
    pub id: Uuid,
    pub title: String,
    pub context: String,
    pub decision: String,
    pub alternatives: Vec<String>,
    pub consequences: Vec<String>,
    pub status: AdrStatus,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AdrStatus {
    Proposed,
    Accepted,
    Deprecated,
    Superseded,
}
