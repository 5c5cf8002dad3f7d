//! LLM 层：客户端抽象、请求格式族与实现（Bedrock HTTP / Mock）

pub mod bedrock;
pub mod family;
pub mod mock;
pub mod traits;

use std::sync::Arc;

use crate::config::ModelSection;
use crate::core::AgentError;

pub use bedrock::BedrockClient;
pub use family::{select_family, AnthropicMessages, ModelFamily, NovaMessages};
pub use mock::MockLlmClient;
pub use traits::{CompletionRequest, LlmClient, LlmError};

/// 根据配置创建 LLM 客户端：有 API Key 走 Bedrock，否则退回 Mock
pub fn create_llm_from_config(cfg: &ModelSection) -> Result<Arc<dyn LlmClient>, AgentError> {
    if bedrock::resolve_api_key(cfg).is_some() {
        Ok(Arc::new(BedrockClient::from_config(cfg)?))
    } else {
        tracing::warn!(
            "No model API key set ({}), using Mock LLM",
            bedrock::API_KEY_ENV
        );
        Ok(Arc::new(MockLlmClient::new()))
    }
}
