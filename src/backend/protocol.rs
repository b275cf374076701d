//! Request and response types for the `/api/agents` action endpoint.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::*;

/// Every action value the endpoint understands.
pub const ACTIONS: &[&str] = &[
    "start-generation",
    "generate-document",
    "evaluate-document",
    "approve-document",
    "simulate-debate",
];

// ============================================================
// Requests
// ============================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum AgentRequest {
    StartGeneration {
        goal: String,
        #[serde(default)]
        rules: Vec<KnowledgeRule>,
    },
    #[serde(rename_all = "camelCase")]
    GenerateDocument {
        goal: String,
        document_id: Uuid,
        #[serde(default = "first_iteration")]
        iteration: u32,
        #[serde(default)]
        rules: Vec<KnowledgeRule>,
    },
    EvaluateDocument {
        document: DocumentPayload,
        #[serde(default)]
        rules: Vec<KnowledgeRule>,
    },
    #[serde(rename_all = "camelCase")]
    ApproveDocument {
        document: DocumentPayload,
        #[serde(default)]
        debate_messages: Vec<DebateMessage>,
    },
    SimulateDebate {
        goal: String,
        #[serde(default)]
        document: Option<DocumentPayload>,
    },
}

fn first_iteration() -> u32 {
    1
}

/// The parts of a document the agents need. A full serialized [`Document`]
/// deserializes into this shape; extra fields are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPayload {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type", default = "default_doc_type")]
    pub doc_type: DocumentType,
    pub content: String,
}

fn default_doc_type() -> DocumentType {
    DocumentType::Detail
}

impl From<&Document> for DocumentPayload {
    fn from(doc: &Document) -> Self {
        Self {
            id: Some(doc.id),
            title: doc.title.clone(),
            doc_type: doc.doc_type,
            content: doc.content.clone(),
        }
    }
}

// ============================================================
// Responses
// ============================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartGenerationResponse {
    pub success: bool,
    pub documents: Vec<DocumentDraft>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateDocumentResponse {
    pub success: bool,
    pub content: String,
    pub iteration: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateDocumentResponse {
    pub success: bool,
    pub score: EvaluationScore,
    pub approved: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveDocumentResponse {
    pub success: bool,
    pub adr: Adr,
    pub new_rules: Vec<RuleDraft>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulateDebateResponse {
    pub success: bool,
    pub messages: Vec<NewDebateMessage>,
}

/// Any successful action response.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AgentResponse {
    StartGeneration(StartGenerationResponse),
    GenerateDocument(GenerateDocumentResponse),
    EvaluateDocument(EvaluateDocumentResponse),
    ApproveDocument(ApproveDocumentResponse),
    SimulateDebate(SimulateDebateResponse),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
