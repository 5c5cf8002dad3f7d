//! SQLite 持久化存储（sqlx）
//!
//! 三张表：对话消息、会话元数据、待审批动作。表在首次连接时按需创建；
//! 表名来自配置，已在 AppConfig::validate 中校验为合法标识符。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use crate::config::StorageSection;
use crate::core::AgentError;
use crate::reasoning::PlanStep;
use crate::storage::actions::{ActionStatus, ActionStore, PendingAction};
use crate::storage::conversation::{ConversationStore, Message, Role, Session};

/// 同时实现 ConversationStore 与 ActionStore
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    conversations_table: String,
    sessions_table: String,
    actions_table: String,
}

impl SqliteStore {
    pub async fn connect(cfg: &StorageSection) -> Result<Self, AgentError> {
        if let Some(parent) = cfg.database_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    AgentError::Storage(format!("create {}: {}", parent.display(), e))
                })?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&format!("sqlite:{}?mode=rwc", cfg.database_path.display()))
            .await?;

        let store = Self {
            pool,
            conversations_table: cfg.conversations_table.clone(),
            sessions_table: cfg.sessions_table.clone(),
            actions_table: cfg.actions_table.clone(),
        };
        store.init_schema().await?;
        tracing::info!(path = %cfg.database_path.display(), "SQLite store ready");
        Ok(store)
    }

    async fn transition(
        &self,
        session_id: &str,
        action_id: &str,
        from: ActionStatus,
        to: ActionStatus,
    ) -> Result<bool, AgentError> {
        let result = sqlx::query(&format!(
            "UPDATE {} SET status = ? WHERE session_id = ? AND action_id = ? AND status = ?",
            self.actions_table
        ))
        .bind(to.as_str())
        .bind(session_id)
        .bind(action_id)
        .bind(from.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn init_schema(&self) -> Result<(), AgentError> {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                metadata TEXT NOT NULL DEFAULT '{{}}',
                timestamp TEXT NOT NULL
            )
            "#,
            self.conversations_table
        ))
        .execute(&self.pool)
        .await?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{0}_session ON {0}(session_id, id)",
            self.conversations_table
        ))
        .execute(&self.pool)
        .await?;

        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                session_id TEXT PRIMARY KEY,
                last_activity TEXT NOT NULL,
                message_count INTEGER NOT NULL DEFAULT 0
            )
            "#,
            self.sessions_table
        ))
        .execute(&self.pool)
        .await?;

        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                session_id TEXT NOT NULL,
                action_id TEXT NOT NULL,
                action TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                executed_at TEXT,
                PRIMARY KEY (session_id, action_id)
            )
            "#,
            self.actions_table
        ))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>, AgentError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| AgentError::Storage(format!("bad timestamp {:?}: {}", raw, e)))
}

fn row_to_action(row: &sqlx::sqlite::SqliteRow) -> Result<PendingAction, AgentError> {
    let action: String = row.try_get("action")?;
    let status: String = row.try_get("status")?;
    let created_at: String = row.try_get("created_at")?;
    let executed_at: Option<String> = row.try_get("executed_at")?;
    Ok(PendingAction {
        session_id: row.try_get("session_id")?,
        action_id: row.try_get("action_id")?,
        action: serde_json::from_str::<PlanStep>(&action)?,
        status: ActionStatus::parse(&status)
            .ok_or_else(|| AgentError::Storage(format!("unknown action status {:?}", status)))?,
        created_at: parse_time(&created_at)?,
        executed_at: executed_at.as_deref().map(parse_time).transpose()?,
    })
}

#[async_trait]
impl ConversationStore for SqliteStore {
    async fn add_exchange(&self, session_id: &str, messages: Vec<Message>) -> Result<(), AgentError> {
        if messages.is_empty() {
            return Ok(());
        }
        let count = messages.len() as i64;
        let mut tx = self.pool.begin().await?;

        for msg in &messages {
            let metadata = serde_json::to_string(&msg.metadata)?;
            sqlx::query(&format!(
                "INSERT INTO {} (session_id, role, content, metadata, timestamp) VALUES (?, ?, ?, ?, ?)",
                self.conversations_table
            ))
            .bind(session_id)
            .bind(msg.role.as_str())
            .bind(&msg.content)
            .bind(metadata)
            .bind(msg.timestamp.to_rfc3339())
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(&format!(
            r#"
            INSERT INTO {} (session_id, last_activity, message_count) VALUES (?, ?, ?)
            ON CONFLICT(session_id) DO UPDATE SET
                last_activity = excluded.last_activity,
                message_count = message_count + excluded.message_count
            "#,
            self.sessions_table
        ))
        .bind(session_id)
        .bind(Utc::now().to_rfc3339())
        .bind(count)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::debug!(session_id, count, "Persisted messages");
        Ok(())
    }

    async fn get_history(&self, session_id: &str, limit: usize) -> Result<Vec<Message>, AgentError> {
        let rows = sqlx::query(&format!(
            "SELECT role, content, metadata, timestamp FROM {} WHERE session_id = ? ORDER BY id DESC LIMIT ?",
            self.conversations_table
        ))
        .bind(session_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in rows.iter().rev() {
            let role: String = row.try_get("role")?;
            let metadata: String = row.try_get("metadata")?;
            let timestamp: String = row.try_get("timestamp")?;
            messages.push(Message {
                role: Role::parse(&role)
                    .ok_or_else(|| AgentError::Storage(format!("unknown role {:?}", role)))?,
                content: row.try_get("content")?,
                timestamp: parse_time(&timestamp)?,
                metadata: serde_json::from_str::<Map<String, Value>>(&metadata)?,
            });
        }
        Ok(messages)
    }

    async fn session(&self, session_id: &str) -> Result<Option<Session>, AgentError> {
        let row = sqlx::query(&format!(
            "SELECT last_activity, message_count FROM {} WHERE session_id = ?",
            self.sessions_table
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let last_activity: String = row.try_get("last_activity")?;
                let message_count: i64 = row.try_get("message_count")?;
                Ok(Some(Session {
                    session_id: session_id.to_string(),
                    last_activity: parse_time(&last_activity)?,
                    message_count: message_count.max(0) as u64,
                }))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ActionStore for SqliteStore {
    async fn create(&self, session_id: &str, step: &PlanStep) -> Result<PendingAction, AgentError> {
        let action = PendingAction::new(session_id, step);
        sqlx::query(&format!(
            "INSERT INTO {} (session_id, action_id, action, status, created_at, executed_at) VALUES (?, ?, ?, ?, ?, NULL)",
            self.actions_table
        ))
        .bind(&action.session_id)
        .bind(&action.action_id)
        .bind(serde_json::to_string(&action.action)?)
        .bind(action.status.as_str())
        .bind(action.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(action)
    }

    async fn get(&self, session_id: &str, action_id: &str) -> Result<Option<PendingAction>, AgentError> {
        let row = sqlx::query(&format!(
            "SELECT * FROM {} WHERE session_id = ? AND action_id = ?",
            self.actions_table
        ))
        .bind(session_id)
        .bind(action_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_action).transpose()
    }

    async fn claim(&self, session_id: &str, action_id: &str) -> Result<bool, AgentError> {
        self.transition(session_id, action_id, ActionStatus::Pending, ActionStatus::Executing)
            .await
    }

    async fn release(&self, session_id: &str, action_id: &str) -> Result<bool, AgentError> {
        self.transition(session_id, action_id, ActionStatus::Executing, ActionStatus::Pending)
            .await
    }

    async fn mark_executed(
        &self,
        session_id: &str,
        action_id: &str,
        executed_at: DateTime<Utc>,
    ) -> Result<bool, AgentError> {
        let result = sqlx::query(&format!(
            "UPDATE {} SET status = ?, executed_at = ? WHERE session_id = ? AND action_id = ? AND status != ?",
            self.actions_table
        ))
        .bind(ActionStatus::Executed.as_str())
        .bind(executed_at.to_rfc3339())
        .bind(session_id)
        .bind(action_id)
        .bind(ActionStatus::Executed.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn list_pending(&self, session_id: &str) -> Result<Vec<PendingAction>, AgentError> {
        let rows = sqlx::query(&format!(
            "SELECT * FROM {} WHERE session_id = ? AND status = ? ORDER BY rowid ASC",
            self.actions_table
        ))
        .bind(session_id)
        .bind(ActionStatus::Pending.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_action).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn storage_config(dir: &TempDir) -> StorageSection {
        StorageSection {
            database_path: dir.path().join("agent.db"),
            ..StorageSection::default()
        }
    }

    #[tokio::test]
    async fn history_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let cfg = storage_config(&dir);

        {
            let store = SqliteStore::connect(&cfg).await.unwrap();
            let mut meta = Map::new();
            meta.insert("requires_approval".into(), json!(false));
            store
                .add_exchange(
                    "s1",
                    vec![
                        Message::user("list my instances"),
                        Message::assistant("You have one instance.").with_metadata(meta),
                    ],
                )
                .await
                .unwrap();
        }

        let store = SqliteStore::connect(&cfg).await.unwrap();
        let history = store.get_history("s1", 50).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[1].content, "You have one instance.");
        assert_eq!(history[1].metadata["requires_approval"], json!(false));

        let session = store.session("s1").await.unwrap().unwrap();
        assert_eq!(session.message_count, 2);
    }

    #[tokio::test]
    async fn history_limit_keeps_most_recent() {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::connect(&storage_config(&dir)).await.unwrap();
        for i in 0..5 {
            store.add_message("s1", Message::user(format!("m{i}"))).await.unwrap();
        }
        let history = store.get_history("s1", 2).await.unwrap();
        let contents: Vec<_> = history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m3", "m4"]);
        assert_eq!(store.session("s1").await.unwrap().unwrap().message_count, 5);
    }

    #[tokio::test]
    async fn pending_action_lifecycle() {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::connect(&storage_config(&dir)).await.unwrap();
        let step = PlanStep {
            step: 2,
            tool: "code_execution".into(),
            input: json!({"code": "rm -rf /tmp/x", "language": "bash"}),
            rationale: "cleanup".into(),
            requires_approval: true,
        };

        let action = store.create("s1", &step).await.unwrap();
        let fetched = store.get("s1", &action.action_id).await.unwrap().unwrap();
        assert_eq!(fetched.action, step);
        assert_eq!(fetched.status, ActionStatus::Pending);
        assert_eq!(store.list_pending("s1").await.unwrap().len(), 1);

        assert!(store.claim("s1", &action.action_id).await.unwrap());
        assert!(!store.claim("s1", &action.action_id).await.unwrap());
        let fetched = store.get("s1", &action.action_id).await.unwrap().unwrap();
        assert_eq!(fetched.status, ActionStatus::Executing);
        assert!(store.list_pending("s1").await.unwrap().is_empty());

        assert!(store.release("s1", &action.action_id).await.unwrap());
        assert_eq!(store.list_pending("s1").await.unwrap().len(), 1);

        assert!(store.claim("s1", &action.action_id).await.unwrap());
        assert!(store.mark_executed("s1", &action.action_id, Utc::now()).await.unwrap());
        assert!(!store.mark_executed("s1", &action.action_id, Utc::now()).await.unwrap());
        assert!(!store.claim("s1", &action.action_id).await.unwrap());

        let fetched = store.get("s1", &action.action_id).await.unwrap().unwrap();
        assert_eq!(fetched.status, ActionStatus::Executed);
        assert!(fetched.executed_at.is_some());
        assert!(store.list_pending("s1").await.unwrap().is_empty());
        assert!(store.get("s2", &action.action_id).await.unwrap().is_none());
    }
}
