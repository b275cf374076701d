use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Adr, EvaluationScore};

/// A planning document in the session's document tree.
///
/// Documents are created in bulk when the Decision Maker structures a goal,
/// then mutated by evaluation (`Reviewing` + score) and approval (`Approved`
/// + ADR). `parent_id` always references an existing document and the tree
/// is acyclic; exactly one document per session is the designated root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub title: String,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    pub content: String,
    pub status: DocumentStatus,
    pub score: Option<EvaluationScore>,
    pub adr: Option<Adr>,
    /// Ids of direct children, in insertion order.
    #[serde(default)]
    pub children_ids: Vec<Uuid>,
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Level of a document in the planning hierarchy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Blueprint,
    Module,
    Detail,
    Implementation,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blueprint => "blueprint",
            Self::Module => "module",
            Self::Detail => "detail",
            Self::Implementation => "implementation",
        }
    }
}

/// Review state of a document.
///
/// - `Draft`: freshly generated, not yet scored
/// - `Reviewing`: scored by the Judge, revision in progress
/// - `Approved`: accepted by the Auditor, carries an ADR
/// - `Rejected`: failed the approval gate after the revision budget ran out
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Draft,
    Reviewing,
    Approved,
    Rejected,
}

/// Document as produced by a generation backend, before the store assigns
/// identity and timestamps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDraft {
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    pub title: String,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    pub content: String,
    #[serde(default = "default_status")]
    pub status: DocumentStatus,
    #[serde(default = "default_version")]
    pub version: u32,
}

fn default_status() -> DocumentStatus {
    DocumentStatus::Draft
}

fn default_version() -> u32 {
    1
}

/// Merge-patch for a document. Absent fields keep their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDocumentInput {
    /// Move the document under a different parent.
    pub parent_id: Option<Uuid>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub status: Option<DocumentStatus>,
    pub score: Option<EvaluationScore>,
    pub adr: Option<Adr>,
    pub version: Option<u32>,
}

/// A document with its nested children, used for tree responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentTreeNode {
    #[serde(flatten)]
    pub document: Document,
    pub children: Vec<DocumentTreeNode>,
}
