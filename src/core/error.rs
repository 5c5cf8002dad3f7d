//! Agent 错误类型
//!
//! 规划失败与叙述失败在各自组件内降级，不会走到这里；
//! 工具错误按步骤收集；存储错误向上传播，由顶层转为降级响应或 HTTP 500。

use thiserror::Error;

/// Agent 运行过程中可能出现的错误（工具、存储、配置、审批）
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Tool {0} not found")]
    ToolNotFound(String),

    #[error("Tool execution failed: {0}")]
    ToolExecutionFailed(String),

    #[error("Tool timeout: {0}")]
    ToolTimeout(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Action not found")]
    ActionNotFound,

    #[error("Action {0} was already executed")]
    ActionAlreadyExecuted(String),

    #[error("Action {0} is already being executed")]
    ActionInProgress(String),
}

impl From<sqlx::Error> for AgentError {
    fn from(e: sqlx::Error) -> Self {
        AgentError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for AgentError {
    fn from(e: serde_json::Error) -> Self {
        AgentError::Storage(format!("serialization: {e}"))
    }
}
