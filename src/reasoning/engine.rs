//! 基于 LLM 的推理引擎

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::AgentError;
use crate::llm::{CompletionRequest, LlmClient};
use crate::reasoning::{
    build_reasoning_prompt, parse_reasoning_output, Reasoner, ReasoningOutcome, ReasoningRequest,
    SYSTEM_PROMPT,
};

pub const REASONING_MAX_TOKENS: u32 = 4000;
pub const REASONING_TEMPERATURE: f32 = 0.3;

/// 模型调用失败时的 reasoning 文本
pub const REASONING_FAILED: &str = "Unable to complete reasoning due to an error";

/// 调用模型生成计划；模型失败降级为空计划，因此 reason 永不返回 Err
pub struct ReasoningEngine {
    llm: Arc<dyn LlmClient>,
    system_prompt: String,
}

impl ReasoningEngine {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            system_prompt: SYSTEM_PROMPT.to_string(),
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }
}

#[async_trait]
impl Reasoner for ReasoningEngine {
    async fn reason(&self, request: ReasoningRequest<'_>) -> Result<ReasoningOutcome, AgentError> {
        let prompt = build_reasoning_prompt(
            request.query,
            request.history,
            request.tools,
            request.context,
        );
        let completion = CompletionRequest::new(prompt, REASONING_MAX_TOKENS, REASONING_TEMPERATURE)
            .with_system(self.system_prompt.clone());

        match self.llm.complete(&completion).await {
            Ok(text) => {
                let outcome = parse_reasoning_output(&text);
                tracing::info!(
                    model = self.llm.model_id(),
                    steps = outcome.plan.len(),
                    "Reasoning completed"
                );
                Ok(outcome)
            }
            Err(e) => {
                tracing::error!(error = %e, model = self.llm.model_id(), "Reasoning model call failed");
                Ok(ReasoningOutcome::new(REASONING_FAILED, Vec::new()))
            }
        }
    }
}
