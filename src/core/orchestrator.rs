//! Agent 编排器：单条消息的处理流程
//!
//! INIT（读历史）→ PLAN（推理）→ EXECUTE（逐步执行或挂起待审批）→ NARRATE（第二次模型调用）
//! → PERSIST（user + assistant 一次性原子写入）→ RESPOND。
//! 规划失败或存储失败时返回降级响应，不写入任何消息。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::config::FeatureFlags;
use crate::core::AgentError;
use crate::llm::{CompletionRequest, LlmClient};
use crate::reasoning::{build_narration_prompt, PlanStep, Reasoner, ReasoningRequest};
use crate::storage::{ActionStatus, ActionStore, ConversationStore, Message, PendingAction, Stores};
use crate::tools::{ToolDefinition, ToolExecutor};

pub const NARRATION_MAX_TOKENS: u32 = 2000;
pub const NARRATION_TEMPERATURE: f32 = 0.7;

/// 叙述失败时的兜底回复
pub const NARRATION_FALLBACK: &str =
    "I've processed your request. Please check the action results for details.";

/// 降级响应中的用户可见文本
pub const DEGRADED_MESSAGE: &str =
    "I encountered an error processing your request. Please try again.";

pub const PENDING_APPROVAL_MESSAGE: &str = "Action requires human approval";

/// 单步执行结果；status 为 success / error / pending_approval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    Success { result: Value },
    Error { error: String },
    PendingApproval { message: String, action_id: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub tool: String,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

impl ExecutionResult {
    pub fn is_pending(&self) -> bool {
        matches!(self.outcome, StepOutcome::PendingApproval { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub message: String,
    pub reasoning: String,
    pub actions_taken: Vec<ExecutionResult>,
    pub requires_approval: bool,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DegradedResponse {
    pub message: String,
    pub error: String,
    pub session_id: String,
}

#[derive(Debug, Clone)]
pub enum ChatOutcome {
    Completed(ChatResponse),
    Degraded(DegradedResponse),
}

/// 审批策略，由 [features] 派生
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApprovalPolicy {
    /// enable_human_approval；关闭时所有步骤直接执行
    pub enabled: bool,
    /// require_approval_for_destructive
    pub destructive_requires_approval: bool,
}

impl From<&FeatureFlags> for ApprovalPolicy {
    fn from(f: &FeatureFlags) -> Self {
        Self {
            enabled: f.enable_human_approval,
            destructive_requires_approval: f.require_approval_for_destructive,
        }
    }
}

pub struct DevOpsAgent {
    llm: Arc<dyn LlmClient>,
    reasoner: Arc<dyn Reasoner>,
    executor: Arc<ToolExecutor>,
    conversations: Arc<dyn ConversationStore>,
    actions: Arc<dyn ActionStore>,
    policy: ApprovalPolicy,
    history_limit: usize,
}

impl DevOpsAgent {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        reasoner: Arc<dyn Reasoner>,
        executor: Arc<ToolExecutor>,
        stores: Stores,
        policy: ApprovalPolicy,
    ) -> Self {
        Self {
            llm,
            reasoner,
            executor,
            conversations: stores.conversations,
            actions: stores.actions,
            policy,
            history_limit: 50,
        }
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit.max(1);
        self
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    /// 处理一条用户消息；任何向上传播的错误都转为降级响应
    pub async fn process_message(
        &self,
        session_id: &str,
        message: &str,
        context: Option<&Value>,
    ) -> ChatOutcome {
        match self.handle_message(session_id, message, context).await {
            Ok(response) => ChatOutcome::Completed(response),
            Err(e) => {
                tracing::error!(session_id, error = %e, "Error processing message");
                ChatOutcome::Degraded(DegradedResponse {
                    message: DEGRADED_MESSAGE.to_string(),
                    error: e.to_string(),
                    session_id: session_id.to_string(),
                })
            }
        }
    }

    async fn handle_message(
        &self,
        session_id: &str,
        message: &str,
        context: Option<&Value>,
    ) -> Result<ChatResponse, AgentError> {
        let received_at = Utc::now();
        let history = self
            .conversations
            .get_history(session_id, self.history_limit)
            .await?;

        let tools = self.executor.definitions();
        let outcome = self
            .reasoner
            .reason(ReasoningRequest {
                query: message,
                history: &history,
                tools: &tools,
                context,
            })
            .await?;
        tracing::info!(session_id, steps = outcome.plan.len(), "Plan ready");

        let results = self.execute_plan(session_id, &outcome.plan).await?;
        let requires_approval = results.iter().any(ExecutionResult::is_pending);

        let reply = self.narrate(&outcome.reasoning, &outcome.plan, &results).await;

        let mut metadata = Map::new();
        metadata.insert("requires_approval".into(), json!(requires_approval));
        metadata.insert("actions_count".into(), json!(results.len()));
        self.conversations
            .add_exchange(
                session_id,
                vec![
                    Message::user(message).with_timestamp(received_at),
                    Message::assistant(reply.clone()).with_metadata(metadata),
                ],
            )
            .await?;

        Ok(ChatResponse {
            message: reply,
            reasoning: outcome.reasoning,
            actions_taken: results,
            requires_approval,
            session_id: session_id.to_string(),
            timestamp: Utc::now(),
        })
    }

    fn is_gated(&self, step: &PlanStep) -> bool {
        if !self.policy.enabled {
            return false;
        }
        step.requires_approval
            || (self.policy.destructive_requires_approval
                && self.executor.is_destructive(&step.tool, &step.input))
    }

    /// 逐步执行；单步失败只记录在该步结果里，不影响后续步骤。
    /// 需审批但工具未注册的步骤直接记为错误，不挂起。
    /// 只有写入待审批动作失败（存储错误）会中断整个请求。
    async fn execute_plan(
        &self,
        session_id: &str,
        plan: &[PlanStep],
    ) -> Result<Vec<ExecutionResult>, AgentError> {
        let mut results = Vec::with_capacity(plan.len());
        for step in plan {
            if self.is_gated(step) && self.executor.has_tool(&step.tool) {
                let pending = self.actions.create(session_id, step).await?;
                tracing::info!(
                    session_id,
                    tool = %step.tool,
                    action_id = %pending.action_id,
                    "Step requires approval"
                );
                results.push(ExecutionResult {
                    tool: step.tool.clone(),
                    outcome: StepOutcome::PendingApproval {
                        message: PENDING_APPROVAL_MESSAGE.to_string(),
                        action_id: pending.action_id,
                    },
                });
                continue;
            }

            let outcome = match self.executor.execute(&step.tool, step.input.clone()).await {
                Ok(result) => StepOutcome::Success { result },
                Err(e) => {
                    tracing::warn!(session_id, tool = %step.tool, error = %e, "Step failed");
                    StepOutcome::Error {
                        error: e.to_string(),
                    }
                }
            };
            results.push(ExecutionResult {
                tool: step.tool.clone(),
                outcome,
            });
        }
        Ok(results)
    }

    async fn narrate(&self, reasoning: &str, plan: &[PlanStep], results: &[ExecutionResult]) -> String {
        let results_json = serde_json::to_value(results).unwrap_or(Value::Null);
        let request = CompletionRequest::new(
            build_narration_prompt(reasoning, plan, &results_json),
            NARRATION_MAX_TOKENS,
            NARRATION_TEMPERATURE,
        );
        match self.llm.complete(&request).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                tracing::warn!("Narration returned empty text, using fallback");
                NARRATION_FALLBACK.to_string()
            }
            Err(e) => {
                tracing::error!(error = %e, "Error generating response");
                NARRATION_FALLBACK.to_string()
            }
        }
    }

    /// 审批并执行一个待审批动作，返回工具的原始结果。
    /// 先在存储中认领动作（pending -> executing），同一动作的并发审批只有一个会执行；
    /// 工具失败时退回 pending，可再次审批。
    pub async fn approve_action(&self, session_id: &str, action_id: &str) -> Result<Value, AgentError> {
        let pending = self
            .actions
            .get(session_id, action_id)
            .await?
            .ok_or(AgentError::ActionNotFound)?;
        if pending.status == ActionStatus::Executed {
            return Err(AgentError::ActionAlreadyExecuted(action_id.to_string()));
        }
        if !self.actions.claim(session_id, action_id).await? {
            return Err(self.claim_conflict(session_id, action_id).await?);
        }

        let step = pending.action;
        let result = match self.executor.execute(&step.tool, step.input.clone()).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(session_id, action_id, tool = %step.tool, error = %e, "Approved action failed");
                self.actions.release(session_id, action_id).await?;
                return Err(e);
            }
        };

        let executed_at = Utc::now();
        if !self
            .actions
            .mark_executed(session_id, action_id, executed_at)
            .await?
        {
            tracing::warn!(session_id, action_id, "Action was no longer claimed when marked");
        }

        let mut metadata = Map::new();
        metadata.insert("action_id".into(), json!(action_id));
        metadata.insert("tool".into(), json!(step.tool));
        metadata.insert("result".into(), result.clone());
        self.conversations
            .add_message(
                session_id,
                Message::assistant(format!(
                    "Approved action {} ({}) was executed.",
                    action_id, step.tool
                ))
                .with_metadata(metadata),
            )
            .await?;

        tracing::info!(session_id, action_id, tool = %step.tool, "Approved action executed");
        Ok(result)
    }

    /// 认领失败时区分：已执行 / 正在执行
    async fn claim_conflict(&self, session_id: &str, action_id: &str) -> Result<AgentError, AgentError> {
        Ok(match self.actions.get(session_id, action_id).await? {
            None => AgentError::ActionNotFound,
            Some(a) if a.status == ActionStatus::Executed => {
                AgentError::ActionAlreadyExecuted(action_id.to_string())
            }
            Some(_) => AgentError::ActionInProgress(action_id.to_string()),
        })
    }

    pub async fn pending_actions(&self, session_id: &str) -> Result<Vec<PendingAction>, AgentError> {
        self.actions.list_pending(session_id).await
    }

    pub async fn history(&self, session_id: &str, limit: Option<usize>) -> Result<Vec<Message>, AgentError> {
        self.conversations
            .get_history(session_id, limit.unwrap_or(self.history_limit))
            .await
    }

    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.executor.definitions()
    }

    pub fn model_id(&self) -> &str {
        self.llm.model_id()
    }
}
