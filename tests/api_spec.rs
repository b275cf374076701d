use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};
use tribunal::api::middleware::SecurityConfig;
use tribunal::api::{create_router, create_router_with_security, AppState};
use tribunal::backend::LocalBackend;
use tribunal::db::Database;
use tribunal::models::*;
use tribunal::orchestrator::OrchestratorConfig;
use tribunal::store::Workspace;
use uuid::Uuid;

fn state(config: OrchestratorConfig) -> AppState {
    let db = Database::open_memory().expect("Failed to create database");
    db.migrate().expect("Failed to migrate");
    let workspace = Workspace::open(db).expect("Failed to open workspace").into_shared();
    AppState::new(workspace, Arc::new(LocalBackend::new()), config)
}

fn setup() -> TestServer {
    let app = create_router(state(OrchestratorConfig::immediate()));
    TestServer::new(app).expect("Failed to create test server")
}

async fn create_document(server: &TestServer, title: &str, parent_id: Option<Uuid>) -> Document {
    server
        .post("/api/v1/documents")
        .json(&json!({
            "parentId": parent_id,
            "title": title,
            "type": "module",
            "content": format!("# {}", title),
        }))
        .await
        .json::<Document>()
}

async fn wait_until_idle(server: &TestServer) -> Value {
    for _ in 0..200 {
        let status = server.get("/api/v1/cycles/status").await.json::<Value>();
        if status["isProcessing"] == json!(false) {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("cycle did not finish");
}

mod agent_actions {
    use super::*;

    #[tokio::test]
    async fn start_generation_returns_eight_drafts() {
        let server = setup();

        let response = server
            .post("/api/agents")
            .json(&json!({ "action": "start-generation", "goal": "Todo App", "rules": [] }))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["success"], json!(true));
        let docs = body["documents"].as_array().unwrap();
        assert_eq!(docs.len(), 8);
        assert_eq!(docs[0]["type"], json!("blueprint"));
        assert_eq!(docs[0]["title"], json!("Todo App - Project Blueprint"));
    }

    #[tokio::test]
    async fn generate_document_embeds_active_rules() {
        let server = setup();
        let now = chrono::Utc::now();
        let rule = KnowledgeRule {
            id: Uuid::new_v4(),
            category: "Strategy".into(),
            rule: "Ship in small slices".into(),
            confidence: 0.8,
            usage_count: 0,
            source: "test".into(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let response = server
            .post("/api/agents")
            .json(&json!({
                "action": "generate-document",
                "goal": "Todo App",
                "documentId": Uuid::new_v4(),
                "iteration": 2,
                "rules": [rule],
            }))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["iteration"], json!(2));
        let content = body["content"].as_str().unwrap();
        assert!(content.contains("- **Strategy**: Ship in small slices"));
        assert!(content.contains("```mermaid"));
    }

    #[tokio::test]
    async fn evaluate_document_applies_the_gate() {
        let server = setup();

        let response = server
            .post("/api/agents")
            .json(&json!({
                "action": "evaluate-document",
                "document": { "content": "# Title\n## A\n## B\n```mermaid\n```" },
            }))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["score"]["clarity"], json!(85));
        let overall = body["score"]["overall"].as_u64().unwrap();
        assert_eq!(body["approved"], json!(overall >= 70));
    }

    #[tokio::test]
    async fn approve_document_returns_adr_and_rules() {
        let server = setup();

        let response = server
            .post("/api/agents")
            .json(&json!({
                "action": "approve-document",
                "document": { "title": "Blueprint", "type": "blueprint", "content": "includes MVP and OAuth" },
                "debateMessages": [{
                    "id": Uuid::new_v4(),
                    "agentId": "auditor",
                    "type": "learning",
                    "content": "x".repeat(25),
                    "timestamp": chrono::Utc::now(),
                }],
            }))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["adr"]["status"], json!("accepted"));
        assert_eq!(body["newRules"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn simulate_debate_is_canned() {
        let server = setup();

        let response = server
            .post("/api/agents")
            .json(&json!({ "action": "simulate-debate", "goal": "Todo App" }))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 6);
        assert_eq!(messages[1]["score"], json!(72));
        assert_eq!(messages[2]["type"], json!("counter-proposal"));
    }

    #[tokio::test]
    async fn unknown_action_is_a_bad_request() {
        let server = setup();

        let response = server
            .post("/api/agents")
            .json(&json!({ "action": "summon-oracle" }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>(), json!({ "error": "Unknown action" }));
    }

    #[tokio::test]
    async fn missing_fields_are_a_bad_request() {
        let server = setup();

        let response = server
            .post("/api/agents")
            .json(&json!({ "action": "generate-document", "goal": "Todo App" }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(response.json::<Value>()["error"].as_str().unwrap().contains("documentId"));
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let server = setup();

        let response = server.post("/api/agents").text("{not json").await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn empty_goal_is_a_bad_request() {
        let server = setup();

        let response = server
            .post("/api/agents")
            .json(&json!({ "action": "start-generation", "goal": "  " }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }
}

mod documents {
    use super::*;

    #[tokio::test]
    async fn creates_and_nests_documents() {
        let server = setup();
        let root = create_document(&server, "Root", None).await;
        let child = create_document(&server, "Child", Some(root.id)).await;

        let response = server.get(&format!("/api/v1/documents/{}/children", root.id)).await;
        response.assert_status_ok();
        let children: Vec<Document> = response.json();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id, child.id);

        let tree: Vec<Value> = server.get("/api/v1/documents/tree").await.json();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0]["title"], json!("Root"));
        assert_eq!(tree[0]["children"][0]["title"], json!("Child"));
    }

    #[tokio::test]
    async fn unknown_parent_is_not_found() {
        let server = setup();

        let response = server
            .post("/api/v1/documents")
            .json(&json!({ "parentId": Uuid::new_v4(), "title": "X", "type": "detail", "content": "" }))
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn updates_fields() {
        let server = setup();
        let doc = create_document(&server, "Draft", None).await;

        let response = server
            .put(&format!("/api/v1/documents/{}", doc.id))
            .json(&json!({ "title": "Renamed", "status": "reviewing" }))
            .await;

        response.assert_status_ok();
        let updated: Document = response.json();
        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.status, DocumentStatus::Reviewing);
        assert_eq!(updated.content, "# Draft");
    }

    #[tokio::test]
    async fn update_of_missing_document_is_not_found() {
        let server = setup();

        let response = server
            .put(&format!("/api/v1/documents/{}", Uuid::new_v4()))
            .json(&json!({ "title": "Nope" }))
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn cyclic_reparent_is_a_bad_request() {
        let server = setup();
        let root = create_document(&server, "Root", None).await;
        let child = create_document(&server, "Child", Some(root.id)).await;

        let response = server
            .put(&format!("/api/v1/documents/{}", root.id))
            .json(&json!({ "parentId": child.id }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn delete_cascades() {
        let server = setup();
        let root = create_document(&server, "Root", None).await;
        create_document(&server, "Child", Some(root.id)).await;

        let response = server.delete(&format!("/api/v1/documents/{}", root.id)).await;
        response.assert_status_ok();
        assert_eq!(response.json::<Vec<Uuid>>().len(), 2);

        let all: Vec<Document> = server.get("/api/v1/documents").await.json();
        assert!(all.is_empty());

        server
            .get(&format!("/api/v1/documents/{}", root.id))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn selects_and_clears() {
        let server = setup();
        let doc = create_document(&server, "Pick me", None).await;

        let response = server
            .post("/api/v1/documents/select")
            .json(&json!({ "id": doc.id }))
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["selectedId"], json!(doc.id));

        let response = server.post("/api/v1/documents/select").json(&json!({})).await;
        assert_eq!(response.json::<Value>()["selectedId"], Value::Null);

        server
            .post("/api/v1/documents/select")
            .json(&json!({ "id": Uuid::new_v4() }))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}

mod rules {
    use super::*;

    #[tokio::test]
    async fn full_rule_lifecycle() {
        let server = setup();

        let response = server
            .post("/api/v1/rules")
            .json(&json!({ "category": "Strategy", "rule": "Ship weekly", "source": "manual" }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let rule: KnowledgeRule = response.json();
        assert_eq!(rule.confidence, DEFAULT_CONFIDENCE);

        let toggled: KnowledgeRule = server
            .post(&format!("/api/v1/rules/{}/toggle", rule.id))
            .await
            .json();
        assert!(!toggled.is_active);

        let updated: KnowledgeRule = server
            .put(&format!("/api/v1/rules/{}", rule.id))
            .json(&json!({ "confidence": 0.95 }))
            .await
            .json();
        assert_eq!(updated.confidence, 0.95);
        assert_eq!(updated.rule, "Ship weekly");

        server
            .delete(&format!("/api/v1/rules/{}", rule.id))
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let rules: Vec<KnowledgeRule> = server.get("/api/v1/rules").await.json();
        assert!(rules.is_empty());
    }

    #[tokio::test]
    async fn invalid_confidence_is_a_bad_request() {
        let server = setup();

        let response = server
            .post("/api/v1/rules")
            .json(&json!({ "category": "Strategy", "rule": "Too sure", "confidence": 2.0, "source": "manual" }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn toggling_an_unknown_rule_is_not_found() {
        let server = setup();

        server
            .post(&format!("/api/v1/rules/{}/toggle", Uuid::new_v4()))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}

mod session {
    use super::*;

    #[tokio::test]
    async fn health_check() {
        let server = setup();
        let response = server.get("/api/v1/health").await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>(), json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn lists_three_idle_agents() {
        let server = setup();
        let agents: Vec<Agent> = server.get("/api/v1/agents").await.json();
        assert_eq!(agents.len(), 3);
        assert_eq!(agents[0].id, AgentId::DecisionMaker);
        assert!(agents.iter().all(|a| a.status == AgentStatus::Idle));
    }

    #[tokio::test]
    async fn serves_role_prompts() {
        let server = setup();

        let response = server.get("/api/v1/agents/judge/prompt").await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["agentId"], json!("judge"));
        assert!(body["prompt"].as_str().unwrap().contains("strategic fit"));

        server
            .get("/api/v1/agents/jester/prompt")
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn empty_debate_and_metrics() {
        let server = setup();

        let debate: Value = server.get("/api/v1/debate").await.json();
        assert_eq!(debate["messages"], json!([]));
        assert_eq!(debate["currentRound"], json!(0));

        let metrics: ProjectMetrics = server.get("/api/v1/metrics").await.json();
        assert_eq!(metrics, ProjectMetrics::default());
    }
}

mod cycles {
    use super::*;

    fn paced_server() -> TestServer {
        let config = OrchestratorConfig {
            think_delay: Duration::from_millis(50),
            write_delay: Duration::from_millis(5),
            max_rounds: 3,
        };
        TestServer::new(create_router(state(config))).expect("Failed to create test server")
    }

    #[tokio::test]
    async fn runs_a_cycle_in_the_background() {
        let server = paced_server();

        let response = server
            .post("/api/v1/cycles")
            .json(&json!({ "goal": "Todo App" }))
            .await;
        response.assert_status(StatusCode::ACCEPTED);
        assert_eq!(response.json::<Value>()["isProcessing"], json!(true));

        let status = wait_until_idle(&server).await;
        assert_eq!(status["state"], json!("idle"));
        assert_eq!(status["lastError"], Value::Null);

        let debate: Value = server.get("/api/v1/debate").await.json();
        assert_eq!(debate["messages"].as_array().unwrap().len(), 7);

        let rules: Vec<KnowledgeRule> = server.get("/api/v1/rules").await.json();
        assert_eq!(rules.len(), 3);
        assert!(rules[0].source.starts_with("Debate Round"));

        let metrics: ProjectMetrics = server.get("/api/v1/metrics").await.json();
        assert_eq!(metrics.iterations.len(), 1);

        server
            .post("/api/v1/metrics/reset")
            .await
            .assert_status(StatusCode::NO_CONTENT);
        let metrics: ProjectMetrics = server.get("/api/v1/metrics").await.json();
        assert!(metrics.iterations.is_empty());
    }

    #[tokio::test]
    async fn refuses_a_concurrent_cycle() {
        let server = paced_server();

        server
            .post("/api/v1/cycles")
            .json(&json!({ "goal": "Todo App" }))
            .await
            .assert_status(StatusCode::ACCEPTED);

        server
            .post("/api/v1/cycles")
            .json(&json!({ "goal": "Another" }))
            .await
            .assert_status(StatusCode::CONFLICT);

        wait_until_idle(&server).await;
    }

    #[tokio::test]
    async fn empty_goal_is_a_bad_request() {
        let server = setup();

        server
            .post("/api/v1/cycles")
            .json(&json!({ "goal": "" }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }
}

mod security {
    use super::*;

    fn secured_server() -> TestServer {
        let app = create_router_with_security(
            state(OrchestratorConfig::immediate()),
            SecurityConfig::with_api_key("secret"),
        );
        TestServer::new(app).expect("Failed to create test server")
    }

    #[tokio::test]
    async fn rejects_requests_without_a_token() {
        let server = secured_server();
        server
            .get("/api/v1/health")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn accepts_the_bearer_token() {
        let server = secured_server();
        server
            .get("/api/v1/health")
            .authorization_bearer("secret")
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn rate_limits_per_client() {
        let app = create_router_with_security(
            state(OrchestratorConfig::immediate()),
            SecurityConfig::with_rate_limit(2),
        );
        let server = TestServer::new(app).unwrap();

        server.get("/api/v1/health").await.assert_status_ok();
        server.get("/api/v1/health").await.assert_status_ok();
        let limited = server.get("/api/v1/health").await;
        limited.assert_status(StatusCode::TOO_MANY_REQUESTS);
        let retry_after: u64 = limited
            .header(header::RETRY_AFTER)
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert!((1..=60).contains(&retry_after));

        // Another client behind the proxy has its own budget.
        server
            .get("/api/v1/health")
            .add_header(
                HeaderName::from_static("x-forwarded-for"),
                HeaderValue::from_static("203.0.113.9"),
            )
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn cors_wraps_every_response() {
        let app = create_router_with_security(
            state(OrchestratorConfig::immediate()),
            SecurityConfig::from_lookup(|key| match key {
                "TRIBUNAL_API_KEY" => Some("secret".into()),
                "TRIBUNAL_CORS_ORIGINS" => Some("http://planner.test".into()),
                _ => None,
            }),
        );
        let server = TestServer::new(app).unwrap();

        // Even a rejected request carries the CORS headers.
        let response = server
            .get("/api/v1/health")
            .add_header(header::ORIGIN, HeaderValue::from_static("http://planner.test"))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.header(header::ACCESS_CONTROL_ALLOW_ORIGIN),
            "http://planner.test"
        );
    }
}
