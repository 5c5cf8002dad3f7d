//! 待审批动作存储
//!
//! 遇到需审批的计划步骤时写入一条 PendingAction（status=pending）；
//! 审批时先原子地认领（pending -> executing），工具成功后改为 executed 并记录执行时间，
//! 失败则退回 pending。记录不会被删除。

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::core::AgentError;
use crate::reasoning::PlanStep;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Pending,
    Executing,
    Executed,
}

impl ActionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionStatus::Pending => "pending",
            ActionStatus::Executing => "executing",
            ActionStatus::Executed => "executed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ActionStatus::Pending),
            "executing" => Some(ActionStatus::Executing),
            "executed" => Some(ActionStatus::Executed),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PendingAction {
    pub session_id: String,
    pub action_id: String,
    pub action: PlanStep,
    pub status: ActionStatus,
    pub created_at: DateTime<Utc>,
    pub executed_at: Option<DateTime<Utc>>,
}

impl PendingAction {
    pub fn new(session_id: &str, step: &PlanStep) -> Self {
        Self {
            session_id: session_id.to_string(),
            action_id: new_action_id(session_id),
            action: step.clone(),
            status: ActionStatus::Pending,
            created_at: Utc::now(),
            executed_at: None,
        }
    }
}

/// action_id：会话 id + uuid，在会话内唯一
pub fn new_action_id(session_id: &str) -> String {
    format!("{}-{}", session_id, uuid::Uuid::new_v4())
}

#[async_trait]
pub trait ActionStore: Send + Sync {
    async fn create(&self, session_id: &str, step: &PlanStep) -> Result<PendingAction, AgentError>;

    async fn get(&self, session_id: &str, action_id: &str) -> Result<Option<PendingAction>, AgentError>;

    /// pending -> executing；返回是否认领成功。同一动作只有一个调用方能认领
    async fn claim(&self, session_id: &str, action_id: &str) -> Result<bool, AgentError>;

    /// executing -> pending，用于执行失败后退回
    async fn release(&self, session_id: &str, action_id: &str) -> Result<bool, AgentError>;

    /// pending/executing -> executed；返回是否发生了状态变化
    async fn mark_executed(
        &self,
        session_id: &str,
        action_id: &str,
        executed_at: DateTime<Utc>,
    ) -> Result<bool, AgentError>;

    /// 会话中仍待审批的动作，按创建时间排序
    async fn list_pending(&self, session_id: &str) -> Result<Vec<PendingAction>, AgentError>;
}

/// 内存待审批存储：key 为 (session_id, action_id)
#[derive(Debug, Default)]
pub struct InMemoryActionStore {
    actions: RwLock<HashMap<(String, String), PendingAction>>,
}

impl InMemoryActionStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn transition(
        &self,
        session_id: &str,
        action_id: &str,
        from: ActionStatus,
        to: ActionStatus,
    ) -> bool {
        let key = (session_id.to_string(), action_id.to_string());
        match self.actions.write().await.get_mut(&key) {
            Some(action) if action.status == from => {
                action.status = to;
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl ActionStore for InMemoryActionStore {
    async fn create(&self, session_id: &str, step: &PlanStep) -> Result<PendingAction, AgentError> {
        let action = PendingAction::new(session_id, step);
        self.actions.write().await.insert(
            (action.session_id.clone(), action.action_id.clone()),
            action.clone(),
        );
        Ok(action)
    }

    async fn get(&self, session_id: &str, action_id: &str) -> Result<Option<PendingAction>, AgentError> {
        let key = (session_id.to_string(), action_id.to_string());
        Ok(self.actions.read().await.get(&key).cloned())
    }

    async fn claim(&self, session_id: &str, action_id: &str) -> Result<bool, AgentError> {
        Ok(self
            .transition(session_id, action_id, ActionStatus::Pending, ActionStatus::Executing)
            .await)
    }

    async fn release(&self, session_id: &str, action_id: &str) -> Result<bool, AgentError> {
        Ok(self
            .transition(session_id, action_id, ActionStatus::Executing, ActionStatus::Pending)
            .await)
    }

    async fn mark_executed(
        &self,
        session_id: &str,
        action_id: &str,
        executed_at: DateTime<Utc>,
    ) -> Result<bool, AgentError> {
        let key = (session_id.to_string(), action_id.to_string());
        let mut actions = self.actions.write().await;
        match actions.get_mut(&key) {
            Some(action) if action.status != ActionStatus::Executed => {
                action.status = ActionStatus::Executed;
                action.executed_at = Some(executed_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_pending(&self, session_id: &str) -> Result<Vec<PendingAction>, AgentError> {
        let actions = self.actions.read().await;
        let mut pending: Vec<PendingAction> = actions
            .values()
            .filter(|a| a.session_id == session_id && a.status == ActionStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by_key(|a| a.created_at);
        Ok(pending)
    }
}
