//! 工具注册表
//!
//! 所有工具实现 Tool trait（name / description / parameters_schema / execute），由 ToolRegistry 按名注册与查找。
//! 注册只发生在启动阶段；之后注册表移交给 ToolExecutor，只读共享。

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::AgentError;

/// 工具 trait：名称、描述（供 LLM 理解）、参数 schema、异步执行（args 与结果均为 JSON）
#[async_trait]
pub trait Tool: Send + Sync {
    /// 工具名称（对应计划步骤中的 "tool" 字段）
    fn name(&self) -> &str;

    /// 工具描述（供 LLM 理解功能）
    fn description(&self) -> &str;

    /// 参数 JSON Schema
    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    /// 该输入是否属于破坏性操作；开启 require_approval_for_destructive 时强制审批
    fn is_destructive(&self, _args: &Value) -> bool {
        false
    }

    /// 执行工具；Err 为工具自身报告的失败
    async fn execute(&self, args: Value) -> Result<Value, String>;
}

/// 工具定义：写入规划 prompt，也由 GET /tools 返回
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// 工具注册表：按名称存储 Arc<dyn Tool>，同名后注册者覆盖先注册者；按名称排序以保证 prompt 稳定
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: impl Tool + 'static) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), Arc::new(tool)).is_some() {
            tracing::warn!(tool = %name, "tool registered twice, keeping the last one");
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub async fn execute(&self, name: &str, args: Value) -> Result<Value, AgentError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| AgentError::ToolNotFound(name.to_string()))?;
        tool.execute(args)
            .await
            .map_err(AgentError::ToolExecutionFailed)
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|(name, tool)| ToolDefinition {
                name: name.clone(),
                description: tool.description().to_string(),
                parameters: tool.parameters_schema(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        name: &'static str,
        reply: &'static str,
    }

    #[async_trait]
    impl Tool for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "fixed reply"
        }

        async fn execute(&self, _args: Value) -> Result<Value, String> {
            Ok(Value::String(self.reply.to_string()))
        }
    }

    #[tokio::test]
    async fn last_registration_wins() {
        let mut registry = ToolRegistry::new();
        registry.register(Fixed { name: "a", reply: "first" });
        registry.register(Fixed { name: "a", reply: "second" });

        assert_eq!(registry.len(), 1);
        let out = registry.execute("a", Value::Null).await.unwrap();
        assert_eq!(out, Value::String("second".into()));
    }

    #[tokio::test]
    async fn unknown_tool_is_not_found() {
        let registry = ToolRegistry::new();
        let err = registry.execute("missing", Value::Null).await.unwrap_err();
        assert!(matches!(err, AgentError::ToolNotFound(ref n) if n == "missing"));
        assert_eq!(err.to_string(), "Tool missing not found");
    }

    #[test]
    fn definitions_are_sorted_by_name() {
        let mut registry = ToolRegistry::new();
        registry.register(Fixed { name: "zeta", reply: "" });
        registry.register(Fixed { name: "alpha", reply: "" });
        let names: Vec<_> = registry.definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }
}
