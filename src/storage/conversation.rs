//! 对话存储：消息、会话与统一接口
//!
//! ConversationStore 有两个实现：SQLite 持久化（跨进程）与内存（进程内）。
//! 会话在第一条消息写入时隐式创建；同一会话内消息按写入顺序全序，get_history 不跨角色重排。

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::core::AgentError;

/// 消息角色
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单条消息，写入后不可变
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
            metadata: Map::new(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// 会话元数据
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub last_activity: DateTime<Utc>,
    pub message_count: u64,
}

/// 对话存储接口
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// 追加单条消息，并更新会话的 last_activity / message_count
    async fn add_message(&self, session_id: &str, message: Message) -> Result<(), AgentError> {
        self.add_exchange(session_id, vec![message]).await
    }

    /// 原子地追加多条消息（一轮 user + assistant）
    async fn add_exchange(&self, session_id: &str, messages: Vec<Message>) -> Result<(), AgentError>;

    /// 最近 limit 条消息，按时间正序
    async fn get_history(&self, session_id: &str, limit: usize) -> Result<Vec<Message>, AgentError>;

    async fn session(&self, session_id: &str) -> Result<Option<Session>, AgentError>;
}

#[derive(Debug, Default)]
struct SessionLog {
    messages: Vec<Message>,
    last_activity: Option<DateTime<Utc>>,
}

/// 内存对话存储：仅在进程生命周期内有效
#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    sessions: RwLock<HashMap<String, SessionLog>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        tracing::info!("Using in-memory conversation store");
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn add_exchange(&self, session_id: &str, messages: Vec<Message>) -> Result<(), AgentError> {
        if messages.is_empty() {
            return Ok(());
        }
        let mut sessions = self.sessions.write().await;
        let log = sessions.entry(session_id.to_string()).or_default();
        log.messages.extend(messages);
        log.last_activity = Some(Utc::now());
        Ok(())
    }

    async fn get_history(&self, session_id: &str, limit: usize) -> Result<Vec<Message>, AgentError> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(session_id)
            .map(|log| {
                let start = log.messages.len().saturating_sub(limit);
                log.messages[start..].to_vec()
            })
            .unwrap_or_default())
    }

    async fn session(&self, session_id: &str) -> Result<Option<Session>, AgentError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(session_id).and_then(|log| {
            log.last_activity.map(|last_activity| Session {
                session_id: session_id.to_string(),
                last_activity,
                message_count: log.messages.len() as u64,
            })
        }))
    }
}
