mod handlers;
pub mod middleware;

use std::sync::Arc;

use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::backend::GenerationBackend;
use crate::orchestrator::{Orchestrator, OrchestratorConfig};
use crate::store::SharedWorkspace;
use middleware::{auth_middleware, rate_limit_middleware, SecurityConfig};

/// Shared handles every handler works through.
#[derive(Clone)]
pub struct AppState {
    pub workspace: SharedWorkspace,
    pub backend: Arc<dyn GenerationBackend>,
    pub orchestrator: Orchestrator,
}

impl AppState {
    pub fn new(
        workspace: SharedWorkspace,
        backend: Arc<dyn GenerationBackend>,
        config: OrchestratorConfig,
    ) -> Self {
        let orchestrator = Orchestrator::new(workspace.clone(), backend.clone(), config);
        Self {
            workspace,
            backend,
            orchestrator,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    create_router_with_security(state, SecurityConfig::disabled())
}

pub fn create_router_with_security(state: AppState, security: SecurityConfig) -> Router {
    let api = Router::new()
        // Documents
        .route("/documents", get(handlers::list_documents))
        .route("/documents", post(handlers::create_document))
        .route("/documents/tree", get(handlers::get_document_tree))
        .route("/documents/select", post(handlers::select_document))
        .route("/documents/{id}", get(handlers::get_document))
        .route("/documents/{id}", put(handlers::update_document))
        .route("/documents/{id}", delete(handlers::delete_document))
        .route("/documents/{id}/children", get(handlers::list_children))
        // Knowledge rules
        .route("/rules", get(handlers::list_rules))
        .route("/rules", post(handlers::create_rule))
        .route("/rules/{id}", put(handlers::update_rule))
        .route("/rules/{id}", delete(handlers::delete_rule))
        .route("/rules/{id}/toggle", post(handlers::toggle_rule))
        // Session read models
        .route("/agents", get(handlers::list_agents))
        .route("/agents/{id}/prompt", get(handlers::get_agent_prompt))
        .route("/debate", get(handlers::get_debate))
        .route("/metrics", get(handlers::get_metrics))
        .route("/metrics/reset", post(handlers::reset_metrics))
        // Cycles
        .route("/cycles", post(handlers::start_cycle))
        .route("/cycles/status", get(handlers::get_cycle_status))
        // Health
        .route("/health", get(handlers::health));

    Router::new()
        .route("/api/agents", post(handlers::agent_action))
        .nest("/api/v1", api)
        .layer(from_fn_with_state(security.clone(), rate_limit_middleware))
        .layer(from_fn_with_state(security.clone(), auth_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(security.cors_layer())
        .with_state(state)
}
