//! HTTP 错误映射
//!
//! 404 动作不存在、409 动作已执行或正在执行、400 请求非法，其余为 500。
//! 非 development 环境下 500 的 detail 脱敏为固定文本。

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use crate::core::{AgentError, DegradedResponse};

pub const REDACTED_DETAIL: &str = "An error occurred";

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: Value,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: json!({ "error": message.into() }),
        }
    }

    pub fn from_agent(err: AgentError, expose_detail: bool) -> Self {
        match err {
            AgentError::ActionNotFound => Self {
                status: StatusCode::NOT_FOUND,
                body: json!({ "error": "Action not found" }),
            },
            AgentError::ActionAlreadyExecuted(action_id) => Self {
                status: StatusCode::CONFLICT,
                body: json!({ "error": "Action already executed", "action_id": action_id }),
            },
            AgentError::ActionInProgress(action_id) => Self {
                status: StatusCode::CONFLICT,
                body: json!({ "error": "Action is being executed", "action_id": action_id }),
            },
            other => {
                tracing::error!(error = %other, "Request failed");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    body: json!({
                        "error": "Internal server error",
                        "detail": detail(other.to_string(), expose_detail),
                    }),
                }
            }
        }
    }

    /// 编排器降级响应统一返回 500
    pub fn degraded(resp: DegradedResponse, expose_detail: bool) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: json!({
                "error": resp.message,
                "detail": detail(resp.error, expose_detail),
                "session_id": resp.session_id,
            }),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

fn detail(raw: String, expose: bool) -> String {
    if expose {
        raw
    } else {
        REDACTED_DETAIL.to_string()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
