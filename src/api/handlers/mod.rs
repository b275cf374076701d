use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AppState;
use crate::backend::{self, AgentRequest, AgentResponse, BackendError, ErrorResponse, ACTIONS};
use crate::models::*;
use crate::orchestrator::{CycleError, CycleStatus};
use crate::store::{DebateSnapshot, StoreError};

// ============================================================
// Error Handling
// ============================================================

/// Log an internal error and return a sanitized response to the client.
/// The full error is logged server-side; clients only see a generic message.
fn internal_error(e: impl std::fmt::Display) -> (StatusCode, String) {
    tracing::error!("Internal error: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

/// Store failures the caller caused are reported as-is; persistence
/// failures are sanitized.
fn store_error(e: StoreError) -> (StatusCode, String) {
    match e {
        StoreError::NotFound { .. } => {
            tracing::warn!("Not found: {}", e);
            (StatusCode::NOT_FOUND, e.to_string())
        }
        StoreError::InvalidInput(_) | StoreError::Cycle { .. } => {
            tracing::warn!("Validation error: {}", e);
            (StatusCode::BAD_REQUEST, e.to_string())
        }
        StoreError::Persistence(_) => internal_error(e),
    }
}

type ApiResult<T> = Result<T, (StatusCode, String)>;

// ============================================================
// Agent actions
// ============================================================

type ActionError = (StatusCode, Json<ErrorResponse>);

fn action_error(status: StatusCode, message: impl Into<String>) -> ActionError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// `POST /api/agents`: dispatch one generation action by its `action` field.
pub async fn agent_action(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<AgentResponse>, ActionError> {
    let value: serde_json::Value = serde_json::from_slice(&body).map_err(|e| {
        tracing::warn!("Malformed action body: {}", e);
        action_error(StatusCode::BAD_REQUEST, format!("Malformed request body: {}", e))
    })?;

    let action = value
        .get("action")
        .and_then(|a| a.as_str())
        .unwrap_or("")
        .to_owned();
    if !ACTIONS.contains(&action.as_str()) {
        tracing::warn!(action = %action, "Unknown action");
        return Err(action_error(StatusCode::BAD_REQUEST, "Unknown action"));
    }

    let request: AgentRequest = serde_json::from_value(value).map_err(|e| {
        tracing::warn!("Invalid {} request: {}", action, e);
        action_error(StatusCode::BAD_REQUEST, format!("Invalid request: {}", e))
    })?;

    backend::dispatch(state.backend.as_ref(), request)
        .await
        .map(Json)
        .map_err(|e| match e {
            BackendError::BadRequest(msg) => {
                tracing::warn!("Rejected action: {}", msg);
                action_error(StatusCode::BAD_REQUEST, msg)
            }
            other => {
                tracing::error!("Action failed: {}", other);
                action_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        })
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Documents
// ============================================================

pub async fn list_documents(State(state): State<AppState>) -> Json<Vec<Document>> {
    Json(state.workspace.lock().documents.all().to_vec())
}

pub async fn get_document_tree(State(state): State<AppState>) -> Json<Vec<DocumentTreeNode>> {
    Json(state.workspace.lock().documents.tree())
}

pub async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Document>> {
    state
        .workspace
        .lock()
        .documents
        .get(id)
        .cloned()
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Document not found".to_string()))
}

pub async fn create_document(
    State(state): State<AppState>,
    Json(input): Json<DocumentDraft>,
) -> ApiResult<(StatusCode, Json<Document>)> {
    let mut ws = state.workspace.lock();
    let id = ws.documents.add(input).map_err(store_error)?;
    let doc = ws
        .documents
        .get(id)
        .cloned()
        .ok_or_else(|| internal_error("document vanished after insert"))?;
    Ok((StatusCode::CREATED, Json(doc)))
}

pub async fn update_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateDocumentInput>,
) -> ApiResult<Json<Document>> {
    state
        .workspace
        .lock()
        .documents
        .update(id, input)
        .map(|doc| Json(doc.clone()))
        .map_err(store_error)
}

/// Deletes the document and its descendants, returning every removed id.
pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<Uuid>>> {
    state
        .workspace
        .lock()
        .documents
        .delete(id)
        .map(Json)
        .map_err(store_error)
}

pub async fn list_children(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<Document>>> {
    let ws = state.workspace.lock();
    if ws.documents.get(id).is_none() {
        return Err((StatusCode::NOT_FOUND, "Document not found".to_string()));
    }
    Ok(Json(
        ws.documents.children(id).into_iter().cloned().collect(),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectInput {
    #[serde(default)]
    pub id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub selected_id: Option<Uuid>,
}

pub async fn select_document(
    State(state): State<AppState>,
    Json(input): Json<SelectInput>,
) -> ApiResult<Json<Selection>> {
    let mut ws = state.workspace.lock();
    ws.documents.select(input.id).map_err(store_error)?;
    Ok(Json(Selection {
        selected_id: ws.documents.selected_id(),
    }))
}

// ============================================================
// Knowledge rules
// ============================================================

pub async fn list_rules(State(state): State<AppState>) -> Json<Vec<KnowledgeRule>> {
    Json(state.workspace.lock().knowledge.rules().to_vec())
}

pub async fn create_rule(
    State(state): State<AppState>,
    Json(input): Json<RuleDraft>,
) -> ApiResult<(StatusCode, Json<KnowledgeRule>)> {
    state
        .workspace
        .lock()
        .knowledge
        .add_rule(input)
        .map(|r| (StatusCode::CREATED, Json(r)))
        .map_err(store_error)
}

pub async fn update_rule(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateRuleInput>,
) -> ApiResult<Json<KnowledgeRule>> {
    state
        .workspace
        .lock()
        .knowledge
        .update_rule(id, input)
        .map(Json)
        .map_err(store_error)
}

pub async fn delete_rule(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state
        .workspace
        .lock()
        .knowledge
        .delete_rule(id)
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(store_error)
}

pub async fn toggle_rule(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<KnowledgeRule>> {
    state
        .workspace
        .lock()
        .knowledge
        .toggle_active(id)
        .map(Json)
        .map_err(store_error)
}

// ============================================================
// Session read models
// ============================================================

pub async fn list_agents(State(state): State<AppState>) -> Json<Vec<Agent>> {
    Json(state.workspace.lock().agents.all().to_vec())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPrompt {
    pub agent_id: AgentId,
    pub name: &'static str,
    pub prompt: &'static str,
}

/// Role instructions for one agent, for inference-backed generators.
pub async fn get_agent_prompt(Path(id): Path<AgentId>) -> Json<AgentPrompt> {
    Json(AgentPrompt {
        agent_id: id,
        name: id.name(),
        prompt: id.system_prompt(),
    })
}

pub async fn get_debate(State(state): State<AppState>) -> Json<DebateSnapshot> {
    Json(state.workspace.lock().debate.snapshot())
}

pub async fn get_metrics(State(state): State<AppState>) -> Json<ProjectMetrics> {
    Json(state.workspace.lock().metrics.metrics().clone())
}

pub async fn reset_metrics(State(state): State<AppState>) -> StatusCode {
    state.workspace.lock().metrics.reset();
    StatusCode::NO_CONTENT
}

// ============================================================
// Cycles
// ============================================================

#[derive(Debug, Deserialize)]
pub struct StartCycleInput {
    pub goal: String,
}

/// Start a cycle in the background; poll `/cycles/status` for progress.
pub async fn start_cycle(
    State(state): State<AppState>,
    Json(input): Json<StartCycleInput>,
) -> ApiResult<(StatusCode, Json<CycleStatus>)> {
    match state.orchestrator.start(input.goal) {
        Ok(_handle) => Ok((StatusCode::ACCEPTED, Json(state.orchestrator.status()))),
        Err(CycleError::Busy) => {
            tracing::warn!("Cycle start refused: already running");
            Err((StatusCode::CONFLICT, CycleError::Busy.to_string()))
        }
        Err(e @ CycleError::EmptyGoal) => {
            tracing::warn!("Validation error: {}", e);
            Err((StatusCode::BAD_REQUEST, e.to_string()))
        }
        Err(e) => Err(internal_error(e)),
    }
}

pub async fn get_cycle_status(State(state): State<AppState>) -> Json<CycleStatus> {
    Json(state.orchestrator.status())
}
