//! 路由处理函数

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::{ApiError, AppState};
use crate::core::{ChatOutcome, ChatResponse};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// 缺省时生成新会话
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub context: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    pub session_id: String,
    pub action_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

/// POST /api/v1/chat
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if req.message.trim().is_empty() {
        return Err(ApiError::bad_request("message must not be empty"));
    }
    let session_id = req
        .session_id
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    match state
        .agent
        .process_message(&session_id, &req.message, req.context.as_ref())
        .await
    {
        ChatOutcome::Completed(resp) => Ok(Json(resp)),
        ChatOutcome::Degraded(resp) => Err(ApiError::degraded(resp, state.expose_detail())),
    }
}

/// POST /api/v1/approve-action：返回工具原始结果
pub async fn approve_action(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ApproveRequest>,
) -> Result<Json<Value>, ApiError> {
    state
        .agent
        .approve_action(&req.session_id, &req.action_id)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_agent(e, state.expose_detail()))
}

/// GET /api/v1/sessions/:id/history
pub async fn session_history(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Value>, ApiError> {
    let history = state
        .agent
        .history(&session_id, query.limit)
        .await
        .map_err(|e| ApiError::from_agent(e, state.expose_detail()))?;
    Ok(Json(json!({
        "session_id": session_id,
        "count": history.len(),
        "history": history,
    })))
}

/// GET /api/v1/sessions/:id/actions：仍待审批的动作
pub async fn session_actions(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let actions = state
        .agent
        .pending_actions(&session_id)
        .await
        .map_err(|e| ApiError::from_agent(e, state.expose_detail()))?;
    Ok(Json(json!({
        "session_id": session_id,
        "count": actions.len(),
        "actions": actions,
    })))
}

/// GET /api/v1/tools
pub async fn list_tools(State(state): State<Arc<AppState>>) -> Json<Value> {
    let tools = state.agent.tool_definitions();
    Json(json!({ "count": tools.len(), "tools": tools }))
}

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({ "status": "healthy", "service": state.config.app.name }))
}

/// GET /
pub async fn root() -> Json<Value> {
    Json(json!({
        "name": "DevOps Intelligence Agent",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "operational",
    }))
}
