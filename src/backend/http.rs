//! HTTP client for a remote `/api/agents` endpoint.
//!
//! Configuration is via environment variables when built with
//! [`HttpBackend::from_env`]:
//! - `TRIBUNAL_BACKEND_URL` - Base URL (default: `http://localhost:3000`)
//! - `TRIBUNAL_API_KEY` - API key for authentication (optional for local)

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use super::{
    AgentRequest, ApproveDocumentResponse, BackendError, DocumentPayload,
    EvaluateDocumentResponse, GenerateDocumentResponse, GenerationBackend,
    SimulateDebateResponse, StartGenerationResponse,
};
use crate::models::*;

/// Default URL for local development.
const DEFAULT_URL: &str = "http://localhost:3000";

#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl HttpBackend {
    /// Create client from environment variables.
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("TRIBUNAL_BACKEND_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
        let api_key = std::env::var("TRIBUNAL_API_KEY").ok();
        Self::new(base_url, api_key)
    }

    /// Create with explicit configuration.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client: Client::new(),
        }
    }

    async fn call<T: DeserializeOwned>(&self, request: &AgentRequest) -> Result<T, BackendError> {
        let url = format!("{}/api/agents", self.base_url);
        let mut req = self.client.post(&url).json(request);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }
        let response = req.send().await?;
        self.handle_response(response).await
    }

    /// Handle response, converting HTTP errors to BackendError.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, BackendError> {
        let status = response.status();
        if status.is_success() {
            Ok(response.json().await?)
        } else {
            let body = response.text().await.unwrap_or_default();
            match status {
                StatusCode::BAD_REQUEST => Err(BackendError::BadRequest(body)),
                StatusCode::UNAUTHORIZED => Err(BackendError::Unauthorized),
                _ => Err(BackendError::Server(format!("{}: {}", status, body))),
            }
        }
    }
}

/// Reject a well-formed reply that reports `success: false`.
fn ensure_success(success: bool, action: &str) -> Result<(), BackendError> {
    if success {
        Ok(())
    } else {
        Err(BackendError::Generation(format!("{} reported failure", action)))
    }
}

#[async_trait]
impl GenerationBackend for HttpBackend {
    async fn start_generation(
        &self,
        goal: &str,
        rules: &[KnowledgeRule],
    ) -> Result<StartGenerationResponse, BackendError> {
        let response: StartGenerationResponse = self
            .call(&AgentRequest::StartGeneration {
                goal: goal.to_string(),
                rules: rules.to_vec(),
            })
            .await?;
        ensure_success(response.success, "start-generation")?;
        Ok(response)
    }

    async fn generate_document(
        &self,
        goal: &str,
        document_id: Uuid,
        iteration: u32,
        rules: &[KnowledgeRule],
    ) -> Result<GenerateDocumentResponse, BackendError> {
        let response: GenerateDocumentResponse = self
            .call(&AgentRequest::GenerateDocument {
                goal: goal.to_string(),
                document_id,
                iteration,
                rules: rules.to_vec(),
            })
            .await?;
        ensure_success(response.success, "generate-document")?;
        Ok(response)
    }

    async fn evaluate_document(
        &self,
        document: &DocumentPayload,
        rules: &[KnowledgeRule],
    ) -> Result<EvaluateDocumentResponse, BackendError> {
        let response: EvaluateDocumentResponse = self
            .call(&AgentRequest::EvaluateDocument {
                document: document.clone(),
                rules: rules.to_vec(),
            })
            .await?;
        ensure_success(response.success, "evaluate-document")?;
        Ok(response)
    }

    async fn approve_document(
        &self,
        document: &DocumentPayload,
        messages: &[DebateMessage],
    ) -> Result<ApproveDocumentResponse, BackendError> {
        let response: ApproveDocumentResponse = self
            .call(&AgentRequest::ApproveDocument {
                document: document.clone(),
                debate_messages: messages.to_vec(),
            })
            .await?;
        ensure_success(response.success, "approve-document")?;
        Ok(response)
    }

    async fn simulate_debate(
        &self,
        goal: &str,
        document: Option<&DocumentPayload>,
    ) -> Result<SimulateDebateResponse, BackendError> {
        let response: SimulateDebateResponse = self
            .call(&AgentRequest::SimulateDebate {
                goal: goal.to_string(),
                document: document.cloned(),
            })
            .await?;
        ensure_success(response.success, "simulate-debate")?;
        Ok(response)
    }
}
