//! HTTP 接口集成测试：内存存储 + 预置脚本的 Mock LLM

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use devops_agent::api::{router, AppState};
    use devops_agent::config::AppConfig;
    use devops_agent::llm::MockLlmClient;
    use devops_agent::reasoning::{Reasoner, ReasoningOutcome, ReasoningRequest};
    use devops_agent::tools::{InventorySnapshot, StaticInventory};
    use devops_agent::{AgentBuilder, AgentError};

    fn config(environment: &str) -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.app.environment = environment.to_string();
        cfg.storage.backend = "memory".to_string();
        cfg
    }

    fn inventory() -> Arc<StaticInventory> {
        let snapshot: InventorySnapshot = serde_json::from_value(json!({
            "instances": [
                {"id": "i-001", "type": "t3.micro", "state": "running", "launch_time": "2024-01-01T00:00:00Z"},
                {"id": "i-002", "type": "m5.large", "state": "stopped", "launch_time": "2024-02-01T00:00:00Z"}
            ]
        }))
        .unwrap();
        Arc::new(StaticInventory::new(snapshot))
    }

    async fn app_with_script(script: Vec<&str>) -> Router {
        let cfg = config("development");
        let llm = Arc::new(MockLlmClient::with_script(
            script.into_iter().map(|s| Ok(s.to_string())),
        ));
        let agent = AgentBuilder::new(cfg.clone())
            .with_llm(llm)
            .with_inventory(inventory())
            .build()
            .await
            .unwrap();
        router(Arc::new(AppState::new(Arc::new(agent), cfg)))
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    fn post(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_chat_lists_ec2_instances() {
        let app = app_with_script(vec![
            r#"```json
{"reasoning": "User wants EC2 instances.", "plan": [
  {"step": 1, "tool": "aws_infrastructure", "input": {"action": "list", "service": "ec2"}, "rationale": "Query EC2", "requires_approval": false}
]}
```"#,
            "You have 2 EC2 instances, one running and one stopped.",
        ])
        .await;

        let (status, body) = send(
            &app,
            post("/api/v1/chat", json!({"message": "List EC2 instances", "session_id": "s1"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["session_id"], "s1");
        assert_eq!(body["reasoning"], "User wants EC2 instances.");
        assert_eq!(body["requires_approval"], false);
        assert_eq!(body["message"], "You have 2 EC2 instances, one running and one stopped.");
        let actions = body["actions_taken"].as_array().unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0]["tool"], "aws_infrastructure");
        assert_eq!(actions[0]["status"], "success");
        assert_eq!(actions[0]["result"]["count"], 2);

        let (status, body) = send(&app, get("/api/v1/sessions/s1/history")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 2);
        assert_eq!(body["history"][0]["role"], "user");
        assert_eq!(body["history"][0]["content"], "List EC2 instances");
        assert_eq!(body["history"][1]["role"], "assistant");
    }

    #[tokio::test]
    async fn test_gated_action_approval_flow() {
        let app = app_with_script(vec![
            r#"{"reasoning": "Run the script.", "plan": [
                {"step": 1, "tool": "code_execution", "input": {"code": "print('hi')", "language": "python"}, "requires_approval": true}
            ]}"#,
            "The script is waiting for your approval.",
        ])
        .await;

        let (status, body) = send(
            &app,
            post("/api/v1/chat", json!({"message": "run my script", "session_id": "s2"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["requires_approval"], true);
        assert_eq!(body["actions_taken"][0]["status"], "pending_approval");
        let action_id = body["actions_taken"][0]["action_id"].as_str().unwrap().to_string();
        assert!(action_id.starts_with("s2-"));

        let (_, body) = send(&app, get("/api/v1/sessions/s2/actions")).await;
        assert_eq!(body["count"], 1);
        assert_eq!(body["actions"][0]["action"]["tool"], "code_execution");

        let approve = json!({"session_id": "s2", "action_id": action_id});
        let (status, body) = send(&app, post("/api/v1/approve-action", approve.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let (status, _) = send(&app, post("/api/v1/approve-action", approve)).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (_, body) = send(&app, get("/api/v1/sessions/s2/actions")).await;
        assert_eq!(body["count"], 0);

        let (_, body) = send(&app, get("/api/v1/sessions/s2/history")).await;
        assert_eq!(body["count"], 3);
    }

    #[tokio::test]
    async fn test_approve_unknown_action_is_404() {
        let app = app_with_script(vec![]).await;
        let (status, body) = send(
            &app,
            post("/api/v1/approve-action", json!({"session_id": "s1", "action_id": "s1-missing"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "Action not found"}));

        let (_, body) = send(&app, get("/api/v1/sessions/s1/history")).await;
        assert_eq!(body["count"], 0);
    }

    #[tokio::test]
    async fn test_empty_message_is_rejected() {
        let app = app_with_script(vec![]).await;
        let (status, _) = send(&app, post("/api/v1/chat", json!({"message": "   ", "session_id": "s1"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_tools_health_and_root() {
        let app = app_with_script(vec![]).await;

        let (status, body) = send(&app, get("/api/v1/tools")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 6);
        let names: Vec<&str> = body["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert!(names.contains(&"aws_infrastructure"));
        assert!(names.contains(&"cost_analysis"));

        let (status, body) = send(&app, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "healthy", "service": "devops-intelligence-agent"}));

        let (_, body) = send(&app, get("/")).await;
        assert_eq!(body["status"], "operational");
    }

    struct BrokenReasoner;

    #[async_trait]
    impl Reasoner for BrokenReasoner {
        async fn reason(&self, _request: ReasoningRequest<'_>) -> Result<ReasoningOutcome, AgentError> {
            Err(AgentError::Storage("connection reset".into()))
        }
    }

    #[tokio::test]
    async fn test_degraded_chat_redacts_detail_in_production() {
        let cfg = config("production");
        let agent = AgentBuilder::new(cfg.clone())
            .with_llm(Arc::new(MockLlmClient::new()))
            .with_reasoner(Arc::new(BrokenReasoner))
            .with_inventory(inventory())
            .build()
            .await
            .unwrap();
        let app = router(Arc::new(AppState::new(Arc::new(agent), cfg)));

        let (status, body) = send(&app, post("/api/v1/chat", json!({"message": "hello", "session_id": "s9"}))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["session_id"], "s9");
        assert_eq!(body["detail"], "An error occurred");

        let (_, body) = send(&app, get("/api/v1/sessions/s9/history")).await;
        assert_eq!(body["count"], 0);
    }
}
