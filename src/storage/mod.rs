//! 存储层：对话历史与待审批动作
//!
//! storage.backend = "sqlite" 使用持久化存储；"memory" 仅用于本地调试与测试。

pub mod actions;
pub mod conversation;
pub mod sqlite;

use std::sync::Arc;

pub use actions::{new_action_id, ActionStatus, ActionStore, InMemoryActionStore, PendingAction};
pub use conversation::{ConversationStore, InMemoryConversationStore, Message, Role, Session};
pub use sqlite::SqliteStore;

use crate::config::StorageSection;
use crate::core::AgentError;

/// 编排器使用的一组存储
#[derive(Clone)]
pub struct Stores {
    pub conversations: Arc<dyn ConversationStore>,
    pub actions: Arc<dyn ActionStore>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            conversations: Arc::new(InMemoryConversationStore::new()),
            actions: Arc::new(InMemoryActionStore::new()),
        }
    }
}

/// 按配置创建存储；SQLite 打不开时直接报错，不静默退回内存
pub async fn create_stores(cfg: &StorageSection) -> Result<Stores, AgentError> {
    match cfg.backend.as_str() {
        "sqlite" => {
            let store = Arc::new(SqliteStore::connect(cfg).await?);
            Ok(Stores {
                conversations: store.clone(),
                actions: store,
            })
        }
        "memory" => Ok(Stores::in_memory()),
        other => Err(AgentError::Config(format!(
            "unknown storage backend {:?} (expected sqlite or memory)",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_unknown_backend() {
        let cfg = StorageSection {
            backend: "dynamo".into(),
            ..StorageSection::default()
        };
        assert!(matches!(create_stores(&cfg).await, Err(AgentError::Config(_))));
    }
}
