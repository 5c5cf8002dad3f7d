//! Agent 构建器：统一的初始化逻辑
//!
//! 服务端与集成测试共用：按配置创建 LLM、存储、云资源清单与工具注册表，
//! 任何组件都可以在 build 之前替换（测试中注入 Mock）。

use std::sync::Arc;

use crate::config::AppConfig;
use crate::core::{AgentError, ApprovalPolicy, DevOpsAgent};
use crate::llm::{create_llm_from_config, LlmClient};
use crate::reasoning::{Reasoner, ReasoningEngine, SYSTEM_PROMPT};
use crate::storage::{create_stores, Stores};
use crate::tools::{default_registry, CloudInventory, StaticInventory, ToolExecutor, ToolRegistry};

pub struct AgentBuilder {
    config: AppConfig,
    llm: Option<Arc<dyn LlmClient>>,
    reasoner: Option<Arc<dyn Reasoner>>,
    stores: Option<Stores>,
    inventory: Option<Arc<dyn CloudInventory>>,
    registry: Option<ToolRegistry>,
    system_prompt: Option<String>,
}

impl AgentBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            llm: None,
            reasoner: None,
            stores: None,
            inventory: None,
            registry: None,
            system_prompt: None,
        }
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// 替换规划器（默认是基于 LLM 的 ReasoningEngine）
    pub fn with_reasoner(mut self, reasoner: Arc<dyn Reasoner>) -> Self {
        self.reasoner = Some(reasoner);
        self
    }

    pub fn with_stores(mut self, stores: Stores) -> Self {
        self.stores = Some(stores);
        self
    }

    pub fn with_inventory(mut self, inventory: Arc<dyn CloudInventory>) -> Self {
        self.inventory = Some(inventory);
        self
    }

    /// 替换整个工具注册表（默认注册全部内置工具）
    pub fn with_registry(mut self, registry: ToolRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.system_prompt = Some(prompt.to_string());
        self
    }

    /// 从 config/prompts/system.md 加载规划 system prompt，找不到则用内置版本
    /// 已通过 with_system_prompt 设置的 prompt 不会被缺失的文件清掉
    pub fn with_system_prompt_from_file(mut self) -> Self {
        if let Some(prompt) = ["config/prompts/system.md", "../config/prompts/system.md"]
            .into_iter()
            .filter_map(|p| std::fs::read_to_string(p).ok())
            .find(|s| !s.trim().is_empty())
        {
            self.system_prompt = Some(prompt);
        }
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub async fn build(self) -> Result<DevOpsAgent, AgentError> {
        let cfg = self.config;

        let llm = match self.llm {
            Some(llm) => llm,
            None => create_llm_from_config(&cfg.model)?,
        };

        let stores = match self.stores {
            Some(stores) => stores,
            None => create_stores(&cfg.storage).await?,
        };

        let registry = match self.registry {
            Some(registry) => registry,
            None => {
                let inventory = match self.inventory {
                    Some(inventory) => inventory,
                    None => Arc::new(StaticInventory::load(cfg.cloud.inventory_path.as_deref())?),
                };
                default_registry(&cfg.features, inventory)
            }
        };
        let executor = Arc::new(ToolExecutor::new(registry, cfg.tools.tool_timeout_secs));

        let reasoner: Arc<dyn Reasoner> = match self.reasoner {
            Some(reasoner) => reasoner,
            None => {
                let prompt = self.system_prompt.as_deref().unwrap_or(SYSTEM_PROMPT);
                Arc::new(ReasoningEngine::new(llm.clone()).with_system_prompt(prompt))
            }
        };

        tracing::info!(
            model = llm.model_id(),
            tools = executor.tool_names().len(),
            backend = %cfg.storage.backend,
            "Agent ready"
        );

        Ok(DevOpsAgent::new(llm, reasoner, executor, stores, ApprovalPolicy::from(&cfg.features))
            .with_history_limit(cfg.storage.history_limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;

    #[tokio::test]
    async fn builds_with_memory_backend_and_builtin_tools() {
        let mut cfg = AppConfig::default();
        cfg.storage.backend = "memory".into();
        cfg.storage.history_limit = 10;

        let agent = AgentBuilder::new(cfg)
            .with_llm(Arc::new(MockLlmClient::new()))
            .build()
            .await
            .unwrap();
        assert_eq!(agent.tool_definitions().len(), 6);
        assert_eq!(agent.history_limit(), 10);
        assert_eq!(agent.model_id(), "mock");
    }

    #[tokio::test]
    async fn explicit_system_prompt_survives_missing_prompt_file() {
        let mut cfg = AppConfig::default();
        cfg.storage.backend = "memory".into();
        let llm = Arc::new(MockLlmClient::new());

        let agent = AgentBuilder::new(cfg)
            .with_llm(llm.clone())
            .with_system_prompt("You are the on-call assistant.")
            .with_system_prompt_from_file()
            .build()
            .await
            .unwrap();
        agent.process_message("s1", "hello", None).await;

        let requests = llm.requests();
        assert_eq!(requests[0].system.as_deref(), Some("You are the on-call assistant."));
    }

    #[tokio::test]
    async fn missing_inventory_file_is_a_config_error() {
        let mut cfg = AppConfig::default();
        cfg.storage.backend = "memory".into();
        cfg.cloud.inventory_path = Some("/nonexistent/inventory.json".into());

        let result = AgentBuilder::new(cfg)
            .with_llm(Arc::new(MockLlmClient::new()))
            .build()
            .await;
        assert!(matches!(result, Err(AgentError::Config(_))));
    }
}
