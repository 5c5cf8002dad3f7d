//! LLM 客户端抽象
//!
//! 所有后端（Bedrock HTTP / Mock）实现 LlmClient：complete 接收一次完整请求（system + 单条 user prompt），返回纯文本。
//! 不做重试：每次外部调用只尝试一次，超时由具体实现的传输层控制。

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// 单次补全请求：system 可选，prompt 为唯一一条 user 消息
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>, max_tokens: u32, temperature: f32) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            max_tokens,
            temperature,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// 模型调用错误（传输、HTTP 状态、响应结构）
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("API error ({status}): {body}")]
    ApiError { status: u16, body: String },

    #[error("unexpected response shape: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout
        } else if e.is_decode() {
            LlmError::Decode(e.to_string())
        } else {
            LlmError::Transport(e.to_string())
        }
    }
}

/// LLM 客户端 trait：非流式补全
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;

    /// 当前使用的模型标识（用于日志）
    fn model_id(&self) -> &str;
}
