//! The generation capability the orchestrator depends on.
//!
//! [`LocalBackend`] runs the templated engine in-process; [`HttpBackend`]
//! forwards the same actions to a remote `/api/agents` endpoint. A real
//! inference-backed generator only has to implement [`GenerationBackend`].

mod http;
mod protocol;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

pub use http::HttpBackend;
pub use protocol::*;

use crate::engine;
use crate::models::*;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: API key required or invalid")]
    Unauthorized,

    #[error("Server error: {0}")]
    Server(String),

    #[error("Generation failed: {0}")]
    Generation(String),
}

#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Produce the initial document skeleton for `goal`.
    async fn start_generation(
        &self,
        goal: &str,
        rules: &[KnowledgeRule],
    ) -> Result<StartGenerationResponse, BackendError>;

    /// Produce revised content for a document.
    async fn generate_document(
        &self,
        goal: &str,
        document_id: Uuid,
        iteration: u32,
        rules: &[KnowledgeRule],
    ) -> Result<GenerateDocumentResponse, BackendError>;

    /// Score a document against the rule set.
    async fn evaluate_document(
        &self,
        document: &DocumentPayload,
        rules: &[KnowledgeRule],
    ) -> Result<EvaluateDocumentResponse, BackendError>;

    /// Approve a document: ADR plus rules learned from the debate.
    async fn approve_document(
        &self,
        document: &DocumentPayload,
        messages: &[DebateMessage],
    ) -> Result<ApproveDocumentResponse, BackendError>;

    /// Scripted exchange for demonstration without live orchestration.
    async fn simulate_debate(
        &self,
        goal: &str,
        document: Option<&DocumentPayload>,
    ) -> Result<SimulateDebateResponse, BackendError>;
}

/// Run one action-endpoint request against any backend.
pub async fn dispatch(
    backend: &dyn GenerationBackend,
    request: AgentRequest,
) -> Result<AgentResponse, BackendError> {
    Ok(match request {
        AgentRequest::StartGeneration { goal, rules } => {
            AgentResponse::StartGeneration(backend.start_generation(&goal, &rules).await?)
        }
        AgentRequest::GenerateDocument {
            goal,
            document_id,
            iteration,
            rules,
        } => AgentResponse::GenerateDocument(
            backend
                .generate_document(&goal, document_id, iteration, &rules)
                .await?,
        ),
        AgentRequest::EvaluateDocument { document, rules } => {
            AgentResponse::EvaluateDocument(backend.evaluate_document(&document, &rules).await?)
        }
        AgentRequest::ApproveDocument {
            document,
            debate_messages,
        } => AgentResponse::ApproveDocument(
            backend.approve_document(&document, &debate_messages).await?,
        ),
        AgentRequest::SimulateDebate { goal, document } => AgentResponse::SimulateDebate(
            backend.simulate_debate(&goal, document.as_ref()).await?,
        ),
    })
}

/// In-process backend over the templated engine.
#[derive(Debug, Clone, Default)]
pub struct LocalBackend {
    generate_latency: Duration,
    evaluate_latency: Duration,
}

impl LocalBackend {
    /// Backend that answers immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend that pauses before generating and evaluating, like a model would.
    pub fn with_latency(generate: Duration, evaluate: Duration) -> Self {
        Self {
            generate_latency: generate,
            evaluate_latency: evaluate,
        }
    }
}

async fn pause(latency: Duration) {
    if !latency.is_zero() {
        tokio::time::sleep(latency).await;
    }
}

#[async_trait]
impl GenerationBackend for LocalBackend {
    async fn start_generation(
        &self,
        goal: &str,
        _rules: &[KnowledgeRule],
    ) -> Result<StartGenerationResponse, BackendError> {
        if goal.trim().is_empty() {
            return Err(BackendError::BadRequest("Goal must not be empty".into()));
        }
        let documents = engine::structure_drafts(goal);
        Ok(StartGenerationResponse {
            success: true,
            message: format!("Generated {} document outlines.", documents.len()),
            documents,
        })
    }

    async fn generate_document(
        &self,
        goal: &str,
        document_id: Uuid,
        iteration: u32,
        rules: &[KnowledgeRule],
    ) -> Result<GenerateDocumentResponse, BackendError> {
        pause(self.generate_latency).await;
        tracing::debug!(%document_id, iteration, "Generating revised content");
        Ok(GenerateDocumentResponse {
            success: true,
            content: engine::revised_content(goal, iteration, rules),
            iteration,
        })
    }

    async fn evaluate_document(
        &self,
        document: &DocumentPayload,
        rules: &[KnowledgeRule],
    ) -> Result<EvaluateDocumentResponse, BackendError> {
        pause(self.evaluate_latency).await;
        let score = engine::evaluate(&document.content, rules);
        Ok(EvaluateDocumentResponse {
            success: true,
            approved: score.is_approved(),
            score,
        })
    }

    async fn approve_document(
        &self,
        document: &DocumentPayload,
        messages: &[DebateMessage],
    ) -> Result<ApproveDocumentResponse, BackendError> {
        Ok(ApproveDocumentResponse {
            success: true,
            adr: engine::adr_for(&document.title, document.doc_type),
            new_rules: engine::extract(messages, &document.title, &document.content),
            message: "Document approved and learning rules extracted.".into(),
        })
    }

    async fn simulate_debate(
        &self,
        goal: &str,
        _document: Option<&DocumentPayload>,
    ) -> Result<SimulateDebateResponse, BackendError> {
        Ok(SimulateDebateResponse {
            success: true,
            messages: engine::simulated_debate(goal),
        })
    }
}
